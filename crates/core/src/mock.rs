use async_trait::async_trait;
use mockall::mock;
use uuid::Uuid;

use crate::models::{
    appointment::{Appointment, AppointmentFilter, AppointmentStatus},
    slot::{Slot, SlotFilter},
};
use crate::notify::{NotificationEvent, Notifier};
use crate::store::{
    BookingStore, Relocation, Reservation, SlotRemoval, SlotUpdate, StatusChange, Transition,
};

// Mock collaborators for testing
mock! {
    pub Store {}

    #[async_trait]
    impl BookingStore for Store {
        async fn insert_slot(&self, slot: &Slot) -> eyre::Result<Slot>;
        async fn get_slot(&self, id: Uuid) -> eyre::Result<Option<Slot>>;
        async fn list_slots(&self, filter: &SlotFilter) -> eyre::Result<Vec<Slot>>;
        async fn update_slot(&self, slot: &Slot) -> eyre::Result<SlotUpdate>;
        async fn delete_slot(&self, id: Uuid) -> eyre::Result<SlotRemoval>;
        async fn reserve(&self, appointment: &Appointment) -> eyre::Result<Reservation>;
        async fn transition(&self, change: &StatusChange) -> eyre::Result<Transition>;
        async fn relocate(
            &self,
            id: Uuid,
            from: &[AppointmentStatus],
            replacement: &Appointment,
        ) -> eyre::Result<Relocation>;
        async fn get_appointment(&self, id: Uuid) -> eyre::Result<Option<Appointment>>;
        async fn find_appointments(
            &self,
            filter: &AppointmentFilter,
        ) -> eyre::Result<Vec<Appointment>>;
    }
}

mock! {
    pub EventNotifier {}

    #[async_trait]
    impl Notifier for EventNotifier {
        async fn notify(
            &self,
            event: NotificationEvent,
            appointment: &Appointment,
        ) -> eyre::Result<()>;
    }
}
