//! Scripted engines and fixtures shared across the unit tests.

use crate::engines::traits::{CheckEngine, CheckRequest};
use crate::types::check::CheckImport;
use crate::types::common::ResultKind;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Record of (href, content name) pairs an engine was asked to evaluate.
pub(crate) type CallLog = Rc<RefCell<Vec<(String, Option<String>)>>>;

/// Engine whose answers are scripted per (href, name) pair.
#[derive(Default)]
pub(crate) struct ScriptedEngine {
    default: Option<ResultKind>,
    responses: Vec<(String, Option<String>, ResultKind)>,
    names: HashMap<String, Vec<String>>,
    calls: Option<CallLog>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        ScriptedEngine::default()
    }

    /// Engine answering every request with `kind`.
    pub fn returning(kind: ResultKind) -> Self {
        ScriptedEngine {
            default: Some(kind),
            ..ScriptedEngine::default()
        }
    }

    pub fn with_response(mut self, href: &str, name: Option<&str>, kind: ResultKind) -> Self {
        self.responses
            .push((href.to_string(), name.map(str::to_string), kind));
        self
    }

    /// Answer `names_for_href(href)` with the given definition names.
    pub fn with_names(mut self, href: &str, names: Vec<String>) -> Self {
        self.names.insert(href.to_string(), names);
        self
    }

    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.calls = Some(log);
        self
    }
}

impl CheckEngine for ScriptedEngine {
    fn evaluate(&mut self, request: &CheckRequest<'_>, _imports: &mut [CheckImport]) -> ResultKind {
        let href = request.href.unwrap_or_default().to_string();
        let name = request.content_name.map(str::to_string);
        if let Some(log) = &self.calls {
            log.borrow_mut().push((href.clone(), name.clone()));
        }
        for (scripted_href, scripted_name, kind) in &self.responses {
            if *scripted_href == href && scripted_name.as_deref() == name.as_deref() {
                return *kind;
            }
        }
        self.default.unwrap_or(ResultKind::NotChecked)
    }

    fn names_for_href(&mut self, href: &str) -> Option<Vec<String>> {
        self.names.get(href).cloned()
    }
}
