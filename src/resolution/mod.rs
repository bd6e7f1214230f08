//! Profile resolution against the benchmark tree.
//!
//! Selection propagation runs once at policy construction; value bindings
//! are rebuilt transiently every time a check is dispatched.

pub mod bindings;
pub mod selection;

pub use bindings::{build_value_bindings, ValueBinding};
pub use selection::{SelectionEntry, SelectionMap};
