//! Application services for generation jobs.

mod coordinator;
mod error;
mod handler;

pub use coordinator::GenerationCoordinator;
pub use error::{GenerationError, GenerationServiceResult};
pub use handler::GenerationJobHandler;
