//! Error types for the policy layer.
//!
//! Binding failures are downgraded to `Unknown` rule results by the rule
//! runner; a dispatch to a system with no registered engine is raised by
//! the registry and downgraded to `NotChecked`; applicability content
//! failures downgrade to "not applicable from this source". Only hook
//! aborts and caller mistakes (unknown profile, unknown scoring system)
//! surface out of an evaluation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Value \"{0}\" does not exist in benchmark")]
    ValueMissing(String),

    #[error("Attempt to get non-existent selector {selector:?} from variable \"{value_id}\"")]
    ValueInstanceMissing {
        value_id: String,
        selector: Option<String>,
    },

    #[error("No checking engine registered for system \"{0}\"")]
    UnknownEngine(String),

    #[error("Can't load check content \"{0}\" for applicability checking")]
    ContentUnloadable(String),

    #[error("Scoring system \"{0}\" is not supported")]
    UnknownScoringSystem(String),

    #[error("Evaluation aborted by callback (code {0})")]
    HookAbort(i32),

    #[error("No policy exists for profile {0:?}")]
    ProfileMissing(Option<String>),

    #[error("Duplicate item id \"{0}\" in benchmark")]
    DuplicateItem(String),

    #[error("Item \"{0}\" cannot contain child items")]
    InvalidParent(String),

    #[error("Internal invariant violated: {0}")]
    Internal(String),
}
