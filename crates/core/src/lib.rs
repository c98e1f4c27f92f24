//! # SlotBook Core
//!
//! Domain model and business rules for booking lecturer time slots.
//!
//! - [`registry::SlotRegistry`] owns slot creation, edits and deletion.
//! - [`booking::BookingEngine`] is the only writer of appointments and of a
//!   slot's booked count.
//! - [`query::AppointmentQueries`] provides read-only projections.
//!
//! All three talk to persistence through the [`store::BookingStore`] port, whose
//! implementations must make every counter change a single atomic conditional
//! update. The engine itself holds no locks.

pub mod booking;
pub mod errors;
pub mod mock;
pub mod models;
pub mod notify;
pub mod query;
pub mod registry;
pub mod store;
