//! Check elements attached to rules.
//!
//! A check is either simple (a list of content references handed to a
//! checking engine) or complex (a boolean tree of child checks). The
//! originals inside the benchmark are immutable; evaluation always works on
//! clones, which is where content-ref pinning and import filling happen.

use super::common::BoolOperator;
use serde::{Deserialize, Serialize};

/// Reference into external checking-engine content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckContentRef {
    pub href: String,
    /// Definition name inside the referenced content. A simple check with a
    /// nameless ref and `multicheck` set fans out to one result per name the
    /// engine reports.
    pub name: Option<String>,
}

/// Named slot a checking engine may fill with its own output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckImport {
    pub import_name: String,
    pub content: Option<String>,
}

/// Export of a benchmark Value to an engine-visible variable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckExport {
    pub value_id: String,
    pub export_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CheckBody {
    /// Leaf check: content refs are alternatives tried in declaration order.
    Simple { content_refs: Vec<CheckContentRef> },
    /// Boolean tree joined by `operator`.
    Complex {
        operator: BoolOperator,
        children: Vec<Check>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    /// Checking-engine system URI. Empty for complex checks.
    pub system: String,
    pub selector: Option<String>,
    pub negate: bool,
    pub multicheck: bool,
    pub body: CheckBody,
    pub imports: Vec<CheckImport>,
    pub exports: Vec<CheckExport>,
}

impl Check {
    pub fn simple(system: impl Into<String>) -> Self {
        Check {
            system: system.into(),
            selector: None,
            negate: false,
            multicheck: false,
            body: CheckBody::Simple {
                content_refs: Vec::new(),
            },
            imports: Vec::new(),
            exports: Vec::new(),
        }
    }

    pub fn complex(operator: BoolOperator) -> Self {
        Check {
            system: String::new(),
            selector: None,
            negate: false,
            multicheck: false,
            body: CheckBody::Complex {
                operator,
                children: Vec::new(),
            },
            imports: Vec::new(),
            exports: Vec::new(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    pub fn with_multicheck(mut self, multicheck: bool) -> Self {
        self.multicheck = multicheck;
        self
    }

    pub fn with_content_ref(mut self, href: impl Into<String>, name: Option<&str>) -> Self {
        if let CheckBody::Simple { content_refs } = &mut self.body {
            content_refs.push(CheckContentRef {
                href: href.into(),
                name: name.map(str::to_string),
            });
        }
        self
    }

    pub fn with_child(mut self, child: Check) -> Self {
        if let CheckBody::Complex { children, .. } = &mut self.body {
            children.push(child);
        }
        self
    }

    pub fn with_import(mut self, import_name: impl Into<String>) -> Self {
        self.imports.push(CheckImport {
            import_name: import_name.into(),
            content: None,
        });
        self
    }

    pub fn with_export(
        mut self,
        value_id: impl Into<String>,
        export_name: impl Into<String>,
    ) -> Self {
        self.exports.push(CheckExport {
            value_id: value_id.into(),
            export_name: export_name.into(),
        });
        self
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.body, CheckBody::Complex { .. })
    }

    pub fn content_refs(&self) -> &[CheckContentRef] {
        match &self.body {
            CheckBody::Simple { content_refs } => content_refs,
            CheckBody::Complex { .. } => &[],
        }
    }

    pub fn children(&self) -> &[Check] {
        match &self.body {
            CheckBody::Simple { .. } => &[],
            CheckBody::Complex { children, .. } => children,
        }
    }

    /// Replace the content-ref list with the single reference that was
    /// actually evaluated, optionally overriding its definition name.
    /// Used on check clones attached to rule results.
    pub fn pin_content_ref(&mut self, content: &CheckContentRef, name: Option<&str>) {
        if let CheckBody::Simple { content_refs } = &mut self.body {
            let mut pinned = content.clone();
            if let Some(name) = name {
                pinned.name = Some(name.to_string());
            }
            content_refs.clear();
            content_refs.push(pinned);
        }
    }
}
