//! Shared types for the POS coordination core
//!
//! Common types used across the workspace crates: order models, the event
//! vocabulary carried on the bus, the unified error type and small utilities.

pub mod error;
pub mod message;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Event bus re-exports (for convenient access)
pub use message::{BusEvent, EventType, Payload};
