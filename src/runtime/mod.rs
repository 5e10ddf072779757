//! Runtime adapters and the transport-agnostic control surface.

pub mod api;
pub mod tokio_spawner;

pub use api::{ApiError, ControlResponse, Health, ScheduleRequest, ScheduleResponse, TaskListing};
pub use tokio_spawner::TokioSpawner;
