//! Registry of checking engines keyed by system URI.
//!
//! Several engines may serve the same system; dispatch tries them in
//! registration order until one returns something other than `NotChecked`.

use super::traits::{CheckEngine, CheckRequest};
use crate::error::PolicyError;
use crate::types::check::CheckImport;
use crate::types::common::ResultKind;

struct RegisteredEngine {
    system: String,
    engine: Box<dyn CheckEngine>,
}

#[derive(Default)]
pub struct EngineRegistry {
    engines: Vec<RegisteredEngine>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        EngineRegistry {
            engines: Vec::new(),
        }
    }

    pub fn register(&mut self, system: impl Into<String>, engine: Box<dyn CheckEngine>) {
        self.engines.push(RegisteredEngine {
            system: system.into(),
            engine,
        });
    }

    pub fn is_registered(&self, system: &str) -> bool {
        self.engines.iter().any(|e| e.system == system)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Dispatch one content reference through every engine registered for
    /// `system`, in registration order, until one of them claims it.
    /// All engines declining yields `NotChecked`; a system with no engine
    /// at all is [`PolicyError::UnknownEngine`], which callers downgrade
    /// to `NotChecked` after reporting it.
    pub fn dispatch(
        &mut self,
        system: &str,
        request: &CheckRequest<'_>,
        imports: &mut [CheckImport],
    ) -> Result<ResultKind, PolicyError> {
        let mut dispatched = false;
        for entry in self.engines.iter_mut().filter(|e| e.system == system) {
            dispatched = true;
            let result = entry.engine.evaluate(request, imports);
            if result != ResultKind::NotChecked {
                return Ok(result);
            }
        }
        if !dispatched {
            return Err(PolicyError::UnknownEngine(system.to_string()));
        }
        Ok(ResultKind::NotChecked)
    }

    /// Ask the engines for `system` which definition names live inside
    /// `href`. The first engine that can answer wins; `None` means the
    /// query is unsupported by every registered engine.
    pub fn names_for_href(&mut self, system: &str, href: &str) -> Option<Vec<String>> {
        self.engines
            .iter_mut()
            .filter(|e| e.system == system)
            .find_map(|e| e.engine.names_for_href(href))
    }
}
