pub mod appointment;
pub mod principal;
pub mod report;
pub mod slot;
