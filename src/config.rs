//! Command declarations: arguments, options and command metadata.
//!
//! A command can be declared three ways:
//!
//! - with the typed builders on [`CommandSpec`], [`ArgumentSpec`] and [`OptionSpec`]
//! - from JSON, where each argument/option entry is an object
//! - from JSON, where each entry is a compact pipe-delimited string
//!
//! The compact forms are `name|description|required|type` for arguments and
//! `long|short|description|value_name|type` for options. Trailing fields may
//! be left out. A literal `|` or `\` inside a field is written `\|` or `\\`;
//! any other backslash is taken as is.

use crate::types::{TypeRegistry, DEFAULT_TYPE};
use crate::validate::{
    validate_arguments, validate_options, DefinitionError, SpecFault, MAX_ARGUMENT_FIELDS,
    MAX_OPTION_FIELDS,
};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Prefix used for exported shell variables when none is configured.
pub const DEFAULT_PREFIX: &str = "ARGSPEC_";

/// Name shown in usage text when a command has no name.
const FALLBACK_NAME: &str = "command";

/// Marker for a required argument in the compact form.
const REQUIRED_MARKER: &str = "required";
/// Marker for an optional argument in the compact form.
const OPTIONAL_MARKER: &str = "optional";

/// Split a compact entry into trimmed fields on unescaped `|`.
fn split_fields(text: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next @ ('|' | '\\')) => field.push(next),
                Some(next) => {
                    field.push('\\');
                    field.push(next);
                }
                None => field.push('\\'),
            },
            '|' => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields.iter().map(|f| f.trim().to_string()).collect()
}

/// Escape a field so `split_fields` reads it back unchanged.
fn escape_field(field: &str) -> String {
    field.replace('\\', r"\\").replace('|', r"\|")
}

fn default_required() -> bool {
    true
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

/// A positional argument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgumentSpec {
    /// Name the bound value is stored under
    pub name: String,
    /// Help text
    #[serde(default)]
    pub description: String,
    /// Whether the argument has to be supplied (default: true)
    #[serde(default = "default_required")]
    pub required: bool,
    /// Value type checked against the type registry (default: "string")
    #[serde(rename = "type", default = "default_type")]
    pub value_type: String,
}

impl ArgumentSpec {
    /// A required string argument.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: true,
            value_type: default_type(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the argument as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = value_type.into();
        self
    }
}

impl FromStr for ArgumentSpec {
    type Err = SpecFault;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let fields = split_fields(text);
        if fields.len() > MAX_ARGUMENT_FIELDS {
            return Err(SpecFault::TooManyFields {
                max: MAX_ARGUMENT_FIELDS,
                found: fields.len(),
            });
        }
        let field = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");

        let required = match field(2) {
            "" | REQUIRED_MARKER => true,
            OPTIONAL_MARKER => false,
            other => return Err(SpecFault::InvalidRequirement(other.to_string())),
        };
        let value_type = match field(3) {
            "" => default_type(),
            t => t.to_string(),
        };

        Ok(Self {
            name: field(0).to_string(),
            description: field(1).to_string(),
            required,
            value_type,
        })
    }
}

impl fmt::Display for ArgumentSpec {
    /// Renders the compact form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.required {
            REQUIRED_MARKER
        } else {
            OPTIONAL_MARKER
        };
        write!(
            f,
            "{}|{}|{}|{}",
            escape_field(&self.name),
            escape_field(&self.description),
            marker,
            escape_field(&self.value_type)
        )
    }
}

/// A named option, either a flag or an option taking a value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionSpec {
    /// Long name (e.g., "verbose" for --verbose), also the result key
    pub long: String,
    /// Short option character (e.g., 'v' for -v)
    #[serde(default)]
    pub short: Option<char>,
    /// Help text
    #[serde(default)]
    pub description: String,
    /// Placeholder shown in help; its presence makes the option take a value
    #[serde(default)]
    pub value_name: Option<String>,
    /// Value type, only allowed together with `value_name`
    #[serde(rename = "type", default)]
    pub value_type: Option<String>,
}

impl OptionSpec {
    /// An option without a value.
    pub fn flag(long: impl Into<String>) -> Self {
        Self {
            long: long.into(),
            short: None,
            description: String::new(),
            value_name: None,
            value_type: None,
        }
    }

    /// An option taking a value, shown as `<value_name>` in help.
    pub fn value(long: impl Into<String>, value_name: impl Into<String>) -> Self {
        Self {
            value_name: Some(value_name.into()),
            ..Self::flag(long)
        }
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    /// Whether the option consumes a value.
    pub fn takes_value(&self) -> bool {
        self.value_name.is_some()
    }

    /// Declared type of the value, if the option takes one.
    pub fn effective_type(&self) -> Option<&str> {
        if !self.takes_value() {
            return None;
        }
        Some(self.value_type.as_deref().unwrap_or(DEFAULT_TYPE))
    }
}

impl FromStr for OptionSpec {
    type Err = SpecFault;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let fields = split_fields(text);
        if fields.len() > MAX_OPTION_FIELDS {
            return Err(SpecFault::TooManyFields {
                max: MAX_OPTION_FIELDS,
                found: fields.len(),
            });
        }
        let field = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");
        let non_empty = |i: usize| Some(field(i)).filter(|s| !s.is_empty()).map(String::from);

        let short = match field(1) {
            "" => None,
            s => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => return Err(SpecFault::InvalidShortName(s.to_string())),
                }
            }
        };

        Ok(Self {
            long: field(0).to_string(),
            short,
            description: field(2).to_string(),
            value_name: non_empty(3),
            value_type: non_empty(4),
        })
    }
}

impl fmt::Display for OptionSpec {
    /// Renders the compact form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            escape_field(&self.long),
            escape_field(&self.short.map(String::from).unwrap_or_default()),
            escape_field(&self.description),
            escape_field(self.value_name.as_deref().unwrap_or("")),
            escape_field(self.value_type.as_deref().unwrap_or(""))
        )
    }
}

/// A complete command declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Name of the command (may be overridden by the host)
    pub name: String,
    pub version: Option<String>,
    pub author: Option<String>,
    /// One line description
    pub about: Option<String>,
    /// Longer description shown after `about` in full help
    pub long_about: Option<String>,
    /// Example invocations shown in full help
    pub examples: Vec<String>,
    /// Where the command is defined (file path or similar)
    pub source: Option<String>,
    /// Shell variable prefix for exported results
    pub prefix: Option<String>,
    /// Positional arguments, in binding order
    pub arguments: Vec<ArgumentSpec>,
    pub options: Vec<OptionSpec>,
}

/// An argument or option entry as written in JSON.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry<T> {
    Compact(String),
    Table(T),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCommandSpec {
    #[serde(default)]
    name: String,
    version: Option<String>,
    author: Option<String>,
    about: Option<String>,
    long_about: Option<String>,
    #[serde(default)]
    examples: Vec<String>,
    source: Option<String>,
    prefix: Option<String>,
    #[serde(default)]
    arguments: Vec<Entry<ArgumentSpec>>,
    #[serde(default)]
    options: Vec<Entry<OptionSpec>>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON declaration.
    ///
    /// Malformed JSON and malformed compact entries are definition errors;
    /// the remaining checks happen in [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<CommandSpec, DefinitionError> {
        let raw: RawCommandSpec =
            serde_json::from_str(json).map_err(|e| DefinitionError::Json(e.to_string()))?;

        let arguments = raw
            .arguments
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Entry::Table(spec) => Ok(spec),
                Entry::Compact(text) => text.parse::<ArgumentSpec>().map_err(|reason| {
                    DefinitionError::Argument {
                        index,
                        reason,
                        text,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let options = raw
            .options
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Entry::Table(spec) => Ok(spec),
                Entry::Compact(text) => text.parse::<OptionSpec>().map_err(|reason| {
                    DefinitionError::Option {
                        index,
                        reason,
                        text,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CommandSpec {
            name: raw.name,
            version: raw.version,
            author: raw.author,
            about: raw.about,
            long_about: raw.long_about,
            examples: raw.examples,
            source: raw.source,
            prefix: raw.prefix,
            arguments,
            options,
        })
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn long_about(mut self, long_about: impl Into<String>) -> Self {
        self.long_about = Some(long_about.into());
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn argument(mut self, argument: ArgumentSpec) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    /// Check the declared arguments and options for consistency.
    pub fn validate(&self, types: &TypeRegistry) -> Result<(), DefinitionError> {
        validate_arguments(&self.arguments, types)?;
        validate_options(&self.options, types)
    }

    /// Name to show in usage and messages.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            FALLBACK_NAME
        } else {
            &self.name
        }
    }

    /// Get the effective prefix, using the default if none is set.
    pub fn effective_prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    /// Whether an option with this long name is declared.
    pub fn has_option(&self, long: &str) -> bool {
        self.options.iter().any(|o| o.long == long)
    }

    pub fn find_long(&self, long: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.long == long)
    }
}
