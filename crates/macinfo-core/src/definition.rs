//! Macro definitions parsed from macro-info payloads

use crate::types::{MacinfoKind, MacroRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn definition_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z_$][A-Za-z0-9_$]*)(\(([^)]*)\))?(?:[ \t](.*))?$")
            .expect("macro definition pattern is valid")
    })
}

/// A macro definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDefinition {
    pub name: String,
    /// Parameter names of a function-like macro
    pub params: Option<Vec<String>>,
    /// Replacement text; `None` for an undefined macro
    pub value: Option<String>,
}

impl MacroDefinition {
    /// Create a macro with a specific value
    pub fn with_value(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            params: None,
            value: Some(value.to_string()),
        }
    }

    /// Create an undefined macro (for -U flag)
    pub fn undefined(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: None,
            value: None,
        }
    }

    /// Parse a `#define` payload such as `NAME`, `NAME VALUE` or `NAME(a, b) BODY`
    pub fn parse_define(text: &str) -> Option<Self> {
        let caps = definition_pattern().captures(text.trim_end_matches(['\r', '\n']))?;
        let name = caps.get(1)?.as_str().to_string();
        let params = caps.get(3).map(|p| {
            p.as_str()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        });
        let value = caps
            .get(4)
            .map(|v| v.as_str().trim().to_string())
            .unwrap_or_default();

        Some(Self {
            name,
            params,
            value: Some(value),
        })
    }

    /// Build a definition from a define/undef record
    pub fn from_record(record: &MacroRecord) -> Option<Self> {
        match record.kind {
            MacinfoKind::Define => Self::parse_define(&record.text),
            MacinfoKind::Undef => {
                let name = record.text.split_whitespace().next()?;
                Some(Self::undefined(name))
            }
            _ => None,
        }
    }

    /// Whether the macro takes parameters
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    /// Convert to a single compiler -D/-U argument, without shell quoting
    pub fn to_compiler_arg(&self) -> String {
        let head = match &self.params {
            Some(params) => format!("{}({})", self.name, params.join(",")),
            None => self.name.clone(),
        };
        match &self.value {
            Some(v) if v.is_empty() && self.params.is_none() => format!("-D{}=", head),
            Some(v) => format!("-D{}={}", head, v),
            None => format!("-U{}", self.name),
        }
    }
}
