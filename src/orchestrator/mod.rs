//! Multi-step orchestration.

mod generate;
mod step;
mod stream;
pub mod types;

pub use generate::generate;
pub use stream::{StreamOrchestration, stream_generate};
pub use types::{GenerateError, GenerateOptions, GenerateResult, StepObserver, StepResult};
