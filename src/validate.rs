//! Consistency checks for declared arguments and options.
//!
//! Validation runs before any user input is looked at and stops at the
//! first problem found.

use crate::config::{ArgumentSpec, OptionSpec};
use crate::types::TypeRegistry;
use std::collections::HashSet;
use thiserror::Error;

/// Fields in the compact argument form: name, description, marker, type.
pub const MAX_ARGUMENT_FIELDS: usize = 4;
/// Fields in the compact option form: long, short, description, value name, type.
pub const MAX_OPTION_FIELDS: usize = 5;

/// What is wrong with a single declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecFault {
    #[error("too many fields (at most {max}, got {found})")]
    TooManyFields { max: usize, found: usize },

    #[error("name is empty")]
    EmptyName,

    #[error("'{0}' is not a valid identifier")]
    InvalidName(String),

    #[error("duplicate name '{0}'")]
    DuplicateName(String),

    #[error("invalid marker '{0}': expected 'required' or 'optional'")]
    InvalidRequirement(String),

    #[error("required argument '{0}' declared after an optional one")]
    RequiredAfterOptional(String),

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("invalid short name '{0}': must be a single alphanumeric character")]
    InvalidShortName(String),

    #[error("duplicate short name '{0}'")]
    DuplicateShortName(char),

    #[error("type '{0}' declared on an option that takes no value")]
    TypeWithoutValue(String),

    #[error("shell variable {variable} is also used by '{other}'")]
    VariableClash { variable: String, other: String },
}

/// A broken command declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("invalid argument spec #{index} '{text}': {reason}")]
    Argument {
        index: usize,
        reason: SpecFault,
        text: String,
    },

    #[error("invalid option spec #{index} '{text}': {reason}")]
    Option {
        index: usize,
        reason: SpecFault,
        text: String,
    },

    #[error("failed to parse command spec JSON: {0}")]
    Json(String),
}

/// Whether a name is usable as an argument name or long option name.
///
/// Identifiers start with a letter or underscore, followed by letters,
/// digits, underscores or hyphens.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn check_name(name: &str, seen: &mut HashSet<String>) -> Result<(), SpecFault> {
    if name.is_empty() {
        return Err(SpecFault::EmptyName);
    }
    if !is_identifier(name) {
        return Err(SpecFault::InvalidName(name.to_string()));
    }
    if !seen.insert(name.to_string()) {
        return Err(SpecFault::DuplicateName(name.to_string()));
    }
    Ok(())
}

/// Validate positional argument declarations.
pub fn validate_arguments(
    specs: &[ArgumentSpec],
    types: &TypeRegistry,
) -> Result<(), DefinitionError> {
    let mut seen = HashSet::new();
    let mut optional_seen = false;

    for (index, spec) in specs.iter().enumerate() {
        check_argument(spec, types, &mut seen, optional_seen).map_err(|reason| {
            DefinitionError::Argument {
                index,
                reason,
                text: spec.to_string(),
            }
        })?;
        optional_seen |= !spec.required;
    }

    tracing::trace!(count = specs.len(), "argument specs valid");
    Ok(())
}

fn check_argument(
    spec: &ArgumentSpec,
    types: &TypeRegistry,
    seen: &mut HashSet<String>,
    optional_seen: bool,
) -> Result<(), SpecFault> {
    check_name(&spec.name, seen)?;
    if !types.contains(&spec.value_type) {
        return Err(SpecFault::UnknownType(spec.value_type.clone()));
    }
    if spec.required && optional_seen {
        return Err(SpecFault::RequiredAfterOptional(spec.name.clone()));
    }
    Ok(())
}

/// Validate option declarations.
pub fn validate_options(specs: &[OptionSpec], types: &TypeRegistry) -> Result<(), DefinitionError> {
    let mut seen = HashSet::new();
    let mut shorts = HashSet::new();

    for (index, spec) in specs.iter().enumerate() {
        check_option(spec, types, &mut seen, &mut shorts).map_err(|reason| {
            DefinitionError::Option {
                index,
                reason,
                text: spec.to_string(),
            }
        })?;
    }

    tracing::trace!(count = specs.len(), "option specs valid");
    Ok(())
}

fn check_option(
    spec: &OptionSpec,
    types: &TypeRegistry,
    seen: &mut HashSet<String>,
    shorts: &mut HashSet<char>,
) -> Result<(), SpecFault> {
    check_name(&spec.long, seen)?;

    if let Some(short) = spec.short {
        if !short.is_ascii_alphanumeric() {
            return Err(SpecFault::InvalidShortName(short.to_string()));
        }
        if !shorts.insert(short) {
            return Err(SpecFault::DuplicateShortName(short));
        }
    }

    if let Some(ref value_type) = spec.value_type {
        // Flags carry no value, so they cannot be typed
        if !spec.takes_value() {
            return Err(SpecFault::TypeWithoutValue(value_type.clone()));
        }
        if !types.contains(value_type) {
            return Err(SpecFault::UnknownType(value_type.clone()));
        }
    }

    Ok(())
}
