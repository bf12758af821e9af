//! Shared record types, protocol definitions, and errors for the `sanvia` crates.

pub mod error;
pub mod protocol;
pub mod record;

pub use error::ServiceError;
pub use record::{CanonicalRecord, RecordExtra, RecordKind};
