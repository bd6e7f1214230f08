//! Checking-engine extension points.
//!
//! Rules delegate their actual assertions to engines registered per system
//! URI (most commonly OVAL). The policy layer never interprets check
//! content itself; it only routes requests and folds the returned results.

pub mod registry;
pub mod traits;

pub use registry::EngineRegistry;
pub use traits::{
    CheckEngine, CheckRequest, OutputHook, StartHook, START_CALLBACK_URN, OUTPUT_CALLBACK_URN,
};
