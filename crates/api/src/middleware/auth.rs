//! # Identity Module
//!
//! Authentication happens upstream: the gateway in front of this service
//! verifies the caller and forwards who they are in two headers. This module
//! turns those headers into a [`Principal`]; it never checks credentials.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use slotbook_core::{
    errors::BookingError,
    models::principal::{Principal, Role},
};
use tracing::debug;
use uuid::Uuid;

use super::error_handling::AppError;

pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";

/// Extractor for the authenticated caller.
///
/// ```ignore
/// async fn handler(Caller(principal): Caller) -> Result<Json<Slot>, AppError> { ... }
/// ```
///
/// Rejects with 401 when either header is missing or malformed.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Principal);

fn header<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| {
            debug!(header = name, "Missing identity header");
            BookingError::Authentication(format!("missing {} header", name))
        })?
        .to_str()
        .map_err(|_| BookingError::Authentication(format!("{} header is not valid text", name)).into())
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = Uuid::parse_str(header(parts, PRINCIPAL_ID_HEADER)?.trim()).map_err(|_| {
            BookingError::Authentication(format!("{} header is not a UUID", PRINCIPAL_ID_HEADER))
        })?;
        let role: Role = header(parts, PRINCIPAL_ROLE_HEADER)?
            .parse()
            .map_err(BookingError::Authentication)?;

        Ok(Caller(Principal { id, role }))
    }
}
