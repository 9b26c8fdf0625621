//! Scheduler domain entities.

mod request;

pub use request::{AnchorRequest, BatchOutcome, RequestStatus};
