//! Check-content sessions for applicability decisions.
//!
//! Deciding whether a CPE item applies may require evaluating a definition
//! inside external content (typically OVAL). Content is loaded once per
//! prefixed href through a caller-supplied loader; the resulting session is
//! cached for the lifetime of the policy model and torn down by `Drop`.

use crate::error::PolicyError;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Live evaluation session over one piece of check content.
pub trait CheckContentSession {
    /// Evaluate the named definition against the target.
    fn evaluate(&mut self, name: &str) -> Result<bool, PolicyError>;
}

/// Loader turning an href into a session. Supplied by the caller, because
/// content import is an external collaborator's job.
pub trait CheckContentLoader {
    fn load(&self, href: &str) -> Result<Box<dyn CheckContentSession>, PolicyError>;
}

/// Session cache keyed by prefixed href.
#[derive(Default)]
pub struct SessionCache {
    sessions: HashMap<String, Box<dyn CheckContentSession>>,
}

impl SessionCache {
    pub fn new() -> Self {
        SessionCache::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Evaluate `name` inside `href`, loading the content on first use and
    /// reusing the cached session afterwards.
    pub fn evaluate(
        &mut self,
        loader: &dyn CheckContentLoader,
        href: &str,
        name: &str,
    ) -> Result<bool, PolicyError> {
        if !self.sessions.contains_key(href) {
            debug!(href, "loading check content for applicability");
            let session = loader.load(href)?;
            self.sessions.insert(href.to_string(), session);
        }
        match self.sessions.get_mut(href) {
            Some(session) => session.evaluate(name),
            None => Err(PolicyError::Internal(format!(
                "session for \"{href}\" vanished from cache"
            ))),
        }
    }

    /// Best-effort variant used by the applicability walk: load or
    /// evaluation failures degrade to "not applicable from this source".
    pub fn evaluate_or_false(
        &mut self,
        loader: Option<&dyn CheckContentLoader>,
        href: &str,
        name: &str,
    ) -> bool {
        let Some(loader) = loader else {
            warn!(href, "no content loader configured, platform check skipped");
            return false;
        };
        match self.evaluate(loader, href, name) {
            Ok(applicable) => applicable,
            Err(err) => {
                warn!(href, name, %err, "applicability check content failed");
                false
            }
        }
    }
}
