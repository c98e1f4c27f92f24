#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use slotbook_core::{
    booking::BookingEngine,
    models::{
        appointment::BookAppointmentRequest,
        principal::Principal,
        slot::{CreateSlotRequest, Slot},
    },
    notify::{LogNotifier, Notifier},
    query::AppointmentQueries,
    registry::SlotRegistry,
    store::{BookingStore, StoreHandle, memory::MemoryStore},
};
use uuid::Uuid;

pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry, engine and queries wired to one shared store.
pub struct Harness {
    pub store: MemoryStore,
    pub registry: SlotRegistry,
    pub engine: BookingEngine,
    pub queries: AppointmentQueries,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_notifier(Arc::new(LogNotifier))
    }

    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        let store = MemoryStore::new();
        let handle = StoreHandle::new(Arc::new(store.clone()), STORE_TIMEOUT);
        Self {
            registry: SlotRegistry::new(handle.clone()),
            engine: BookingEngine::new(handle.clone(), notifier),
            queries: AppointmentQueries::new(handle),
            store,
        }
    }

    pub async fn slot(&self, owner: &Principal, capacity: u32) -> Slot {
        self.slot_on(owner, "2025-03-10", "09:00", capacity).await
    }

    pub async fn slot_on(&self, owner: &Principal, date: &str, start: &str, capacity: u32) -> Slot {
        let mut request = slot_request(capacity);
        request.date = date.to_string();
        request.start_time = start.to_string();
        request.end_time = "17:00".to_string();
        self.registry.create_slot(owner, request).await.unwrap()
    }

    pub async fn booked_count(&self, slot_id: Uuid) -> u32 {
        self.store.get_slot(slot_id).await.unwrap().unwrap().booked_count
    }
}

pub fn handle_for(store: Arc<dyn BookingStore>) -> StoreHandle {
    StoreHandle::new(store, STORE_TIMEOUT)
}

pub fn lecturer() -> Principal {
    Principal::lecturer(Uuid::new_v4())
}

pub fn student() -> Principal {
    Principal::student(Uuid::new_v4())
}

pub fn slot_request(capacity: u32) -> CreateSlotRequest {
    CreateSlotRequest {
        location: "Room 4.12".to_string(),
        date: "2025-03-10".to_string(),
        start_time: "09:00".to_string(),
        end_time: "09:30".to_string(),
        capacity: Some(capacity),
    }
}

pub fn booking(slot_id: Uuid) -> BookAppointmentRequest {
    BookAppointmentRequest {
        slot_id,
        title: "Thesis draft".to_string(),
        description: "Feedback on chapter two".to_string(),
    }
}
