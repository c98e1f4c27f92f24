/// Principal extraction from gateway identity headers
pub mod auth;
/// Mapping of domain errors to HTTP responses
pub mod error_handling;
/// JSON body extraction with domain validation errors
pub mod validation;
