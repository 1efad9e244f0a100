//! Named value types used to check option and argument values.

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::net::Ipv6Addr;
use thiserror::Error;

/// Name of the type every argument gets when none is declared.
pub const DEFAULT_TYPE: &str = "string";

/// Errors that can occur when registering a type.
#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid pattern for type '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// How a value is checked against a type.
#[derive(Clone)]
enum Matcher {
    /// Whole-value regular expression.
    Pattern(Regex),
    /// Check that a regex can't express reasonably.
    Check(fn(&str) -> bool),
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Matcher::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Matcher::Check(_) => f.write_str("Check(..)"),
        }
    }
}

impl Matcher {
    fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(value),
            Matcher::Check(check) => check(value),
        }
    }
}

#[derive(Debug, Clone)]
struct ValueType {
    matcher: Matcher,
    description: String,
}

/// Table of named value types.
///
/// A registry is owned by whoever builds a [`Parser`](crate::Parser); callers
/// that need extra types clone or extend their own copy before parsing.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, ValueType>,
}

const BUILTIN_PATTERNS: &[(&str, &str, &str)] = &[
    ("string", r".*", "string"),
    ("char", r".", "single character"),
    ("digit", r"[0-9]", "single digit"),
    ("integer", r"[-+]?[0-9]+", "integer number"),
    (
        "float",
        r"[-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?",
        "floating point number",
    ),
    (
        "date",
        r"[0-9]{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01])",
        "date (YYYY-MM-DD)",
    ),
    (
        "time",
        r"(?:[01][0-9]|2[0-3]):[0-5][0-9](?::[0-5][0-9])?",
        "time (HH:MM[:SS])",
    ),
    (
        "datetime",
        r"[0-9]{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01])[T ](?:[01][0-9]|2[0-3]):[0-5][0-9](?::[0-5][0-9])?",
        "date and time (YYYY-MM-DD HH:MM[:SS])",
    ),
    (
        "bool",
        r"(?i:true|false|yes|no|on|off|1|0)",
        "boolean (true/false, yes/no, on/off, 1/0)",
    ),
    (
        "ipv4",
        r"(?:(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])",
        "IPv4 address",
    ),
];

/// Anchor a pattern so it has to match the whole value.
///
/// `.` also matches line breaks, so multi-line values are checked as a whole.
fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!("^(?:{})$", pattern))
        .dot_matches_new_line(true)
        .build()
}

fn is_ipv6(value: &str) -> bool {
    value.parse::<Ipv6Addr>().is_ok()
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TypeRegistry {
    /// Create an empty registry with no types at all.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in types.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (name, pattern, description) in BUILTIN_PATTERNS {
            // Built-in patterns are constants; a failure here is a programming error.
            let re = compile(pattern).expect("built-in type pattern must compile");
            registry.insert(name, Matcher::Pattern(re), description);
        }
        registry.insert("ipv6", Matcher::Check(is_ipv6), "IPv6 address");
        registry
    }

    fn insert(&mut self, name: &str, matcher: Matcher, description: &str) {
        self.types.insert(
            name.to_string(),
            ValueType {
                matcher,
                description: description.to_string(),
            },
        );
    }

    /// Add a type, or replace an existing one with the same name.
    ///
    /// The pattern is a regular expression that must match the entire value.
    pub fn register(
        &mut self,
        name: &str,
        pattern: &str,
        description: &str,
    ) -> Result<(), TypeError> {
        let re = compile(pattern).map_err(|source| TypeError::InvalidPattern {
            name: name.to_string(),
            source,
        })?;
        tracing::debug!(name, pattern, "registered value type");
        self.insert(name, Matcher::Pattern(re), description);
        Ok(())
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_type(
        mut self,
        name: &str,
        pattern: &str,
        description: &str,
    ) -> Result<Self, TypeError> {
        self.register(name, pattern, description)?;
        Ok(self)
    }

    /// Whether a type with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Check a value against the named type.
    ///
    /// Unknown type names accept everything. Empty values are rejected by
    /// every type except `string`.
    pub fn validate(&self, value: &str, name: &str) -> bool {
        let Some(value_type) = self.types.get(name) else {
            return true;
        };
        if value.is_empty() {
            return name == DEFAULT_TYPE;
        }
        value_type.matcher.matches(value)
    }

    /// Human readable description of a type, or the raw name if unknown.
    pub fn describe<'a>(&'a self, name: &'a str) -> &'a str {
        self.types
            .get(name)
            .map(|t| t.description.as_str())
            .unwrap_or(name)
    }

    /// All type names with their descriptions, sorted by name.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .types
            .iter()
            .map(|(name, t)| (name.as_str(), t.description.as_str()))
            .collect();
        entries.sort();
        entries
    }
}
