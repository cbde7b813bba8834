//! API layer
//!
//! Typed access to the remote REST API:
//! - `dto`: response records
//! - `endpoints`: route catalogue (path, envelope key, auth requirement)
//! - `client`: request issuing and envelope decoding

mod client;
mod dto;
mod endpoints;

pub use client::{ApiClient, decode};
pub use dto::*;
pub use endpoints::{Access, Endpoint};
