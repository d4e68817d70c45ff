//! Pipeline module.
//!
//! [`CleaningSession`] keeps the state of an interactive session;
//! [`CleaningPipeline`] drives one full pass from source to sinks.

mod runner;
mod session;

pub use runner::{CleaningPipeline, PipelineRun};
pub use session::CleaningSession;
