//! Activity description templates.
//!
//! A template is plain text with `{field}` placeholders drawn from a closed
//! set of request fields. Nothing is evaluated; unknown placeholders and
//! unbalanced braces are copied through verbatim.

use std::collections::BTreeMap;

/// Fields a description template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateField {
    Subject,
    UserId,
    Method,
    Path,
    Operation,
    Outcome,
}

impl TemplateField {
    pub const ALL: [TemplateField; 6] = [
        Self::Subject,
        Self::UserId,
        Self::Method,
        Self::Path,
        Self::Operation,
        Self::Outcome,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::UserId => "user_id",
            Self::Method => "method",
            Self::Path => "path",
            Self::Operation => "operation",
            Self::Outcome => "outcome",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Values available to a template. Fields never set render as empty text.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues {
    values: BTreeMap<TemplateField, String>,
}

impl TemplateValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: TemplateField, value: impl ToString) -> Self {
        self.values.insert(field, value.to_string());
        self
    }

    pub fn get(&self, field: TemplateField) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }
}

/// Render `template` against `values`.
pub fn render(template: &str, values: &TemplateValues) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match TemplateField::from_name(name) {
                    Some(field) => out.push_str(values.get(field)),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
