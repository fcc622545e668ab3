//! Core monitoring engine.
//!
//! Owns the engine state machine, phased resource startup with rollback,
//! the command/event loop, and the frame timer that keeps the output
//! video signal alive regardless of poll state.

mod error;
mod orchestrator;
mod source;
mod state;

pub use error::EngineError;
pub use orchestrator::Engine;
pub use source::{FrameSource, SourceFrame};
pub use state::{
    default_api_factory, default_backend_factory, ApiFactory, BackendFactory,
    InitializedResources, ResourceManager,
};
