use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

const INDEXES: [&str; 5] = [
    "CREATE INDEX IF NOT EXISTS idx_slots_owner_id ON slots(owner_id)",
    "CREATE INDEX IF NOT EXISTS idx_slots_date ON slots(date, start_time)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_slot_id ON appointments(slot_id)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_student_id ON appointments(student_id)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status)",
];

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create slots table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS slots (
            id UUID PRIMARY KEY,
            owner_id UUID NOT NULL,
            location VARCHAR(255) NOT NULL,
            date DATE NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            capacity INTEGER NOT NULL DEFAULT 1,
            booked_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_time_range CHECK (end_time > start_time),
            CONSTRAINT positive_capacity CHECK (capacity >= 1),
            CONSTRAINT booked_within_capacity CHECK (booked_count >= 0 AND booked_count <= capacity)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create appointments table. slot_id is a plain reference: appointments
    // are kept after their (fully released) slot is deleted.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY,
            slot_id UUID NOT NULL,
            student_id UUID NOT NULL,
            title VARCHAR(255) NOT NULL,
            description TEXT NOT NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'pending',
            reason TEXT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_status CHECK (status IN ('pending', 'approved', 'cancelled', 'rejected'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // One active appointment per student and slot
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_active_student
        ON appointments(slot_id, student_id)
        WHERE status IN ('pending', 'approved');
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    for statement in INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
