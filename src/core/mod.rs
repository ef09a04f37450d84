//! Core business logic: inspection engine, decision pipeline, fan-out, seed
//! data, and the domain types. No adapter code lives here; I/O goes through
//! the ports.

pub mod engine;
pub mod fanout;
pub mod pipeline;
pub mod seed;
pub mod types;

pub use fanout::LogFanout;
pub use pipeline::{Decision, InboundRequest, LogRecorder, PipelineError, RequestPipeline};
