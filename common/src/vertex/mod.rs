// Vertex AI schedules and notebook execution jobs

pub mod client;
pub mod endpoints;
pub mod format;

pub use client::{Operation, OperationOutcome, ScheduleClient};
pub use endpoints::Endpoints;
