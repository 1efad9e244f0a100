//! Sourceable shell files describing a parse outcome.
//!
//! A shell function hands its arguments to the binary, sources the file it
//! gets back and finds its options and arguments exported as variables:
//!
//! ```sh
//! . "$(argspec parse --config "$spec" -- "$@")" || return
//! ```

use crate::config::CommandSpec;
use crate::parser::{OptionValue, ParseOutcome, ParseResult};
use crate::validate::{DefinitionError, SpecFault};
use anyhow::Result;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Value exported for a flag that was given.
const FLAG_VALUE: &str = "true";

/// Quote a string as a single shell word.
///
/// Everything between single quotes is literal in both bash and zsh, so the
/// only character that needs care is the single quote itself.
fn quote_shell_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Convert an option or argument name to a valid shell variable name.
///
/// Converts to uppercase and replaces hyphens with underscores.
fn to_shell_var_name(name: &str) -> String {
    name.to_uppercase().replace('-', "_")
}

fn option_var(prefix: &str, long: &str) -> String {
    format!("{}OPT_{}", prefix, to_shell_var_name(long))
}

fn argument_var(prefix: &str, name: &str) -> String {
    format!("{}ARG_{}", prefix, to_shell_var_name(name))
}

/// Check that no two declared names end up in the same shell variable.
///
/// `dry-run` and `dry_run` are distinct names but both map to `OPT_DRY_RUN`.
pub fn check_variable_names(spec: &CommandSpec) -> Result<(), DefinitionError> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for (index, option) in spec.options.iter().enumerate() {
        let variable = option_var("", &option.long);
        if let Some(other) = seen.insert(variable.clone(), &option.long) {
            return Err(DefinitionError::Option {
                index,
                reason: SpecFault::VariableClash {
                    variable,
                    other: other.to_string(),
                },
                text: option.to_string(),
            });
        }
    }

    seen.clear();
    for (index, argument) in spec.arguments.iter().enumerate() {
        let variable = argument_var("", &argument.name);
        if let Some(other) = seen.insert(variable.clone(), &argument.name) {
            return Err(DefinitionError::Argument {
                index,
                reason: SpecFault::VariableClash {
                    variable,
                    other: other.to_string(),
                },
                text: argument.to_string(),
            });
        }
    }

    Ok(())
}

fn push_export(output: &mut String, var: &str, value: &str) {
    output.push_str(&format!("export {}={}\n", var, quote_shell_value(value)));
}

fn push_unset(output: &mut String, var: &str) {
    output.push_str(&format!("unset {}\n", var));
}

/// One line per declared option and argument, in declaration order.
///
/// Anything not present in `result` is unset so values from an earlier
/// call never leak into this one.
fn push_variables(output: &mut String, spec: &CommandSpec, result: Option<&ParseResult>, prefix: &str) {
    for option in &spec.options {
        let var = option_var(prefix, &option.long);
        match result.and_then(|r| r.options.get(&option.long)) {
            Some(OptionValue::Present) => push_export(output, &var, FLAG_VALUE),
            Some(OptionValue::Value(value)) => push_export(output, &var, value),
            None => push_unset(output, &var),
        }
    }
    for argument in &spec.arguments {
        let var = argument_var(prefix, &argument.name);
        match result.and_then(|r| r.argument(&argument.name)) {
            Some(value) => push_export(output, &var, value),
            None => push_unset(output, &var),
        }
    }
}

/// Generate the output content as a string.
///
/// `diagnostics` is the text the parse printed (help, version or error
/// plus short usage); it is replayed on stderr when the file is sourced.
pub fn generate_output_string(
    spec: &CommandSpec,
    outcome: &ParseOutcome,
    diagnostics: &str,
    prefix: &str,
) -> String {
    let mut output = String::new();
    push_export(&mut output, &format!("{}OUTCOME", prefix), outcome.label());

    let result = match outcome {
        ParseOutcome::Success(result) => Some(result),
        _ => None,
    };
    push_variables(&mut output, spec, result, prefix);

    if result.is_some() {
        return output;
    }

    // Diagnostics echo user input, so they are quoted like any other value
    if !diagnostics.is_empty() {
        output.push_str(&format!(
            "printf '%s' {} >&2\n",
            quote_shell_value(diagnostics)
        ));
    }
    output.push_str(&format!("return {}\n", outcome.exit_status().code()));
    output
}

/// Generate a temporary file for a parse outcome.
///
/// Returns the path to the temporary file. The file will persist
/// until it's manually deleted.
pub fn generate_output(
    spec: &CommandSpec,
    outcome: &ParseOutcome,
    diagnostics: &str,
    prefix: &str,
) -> Result<PathBuf> {
    let content = generate_output_string(spec, outcome, diagnostics, prefix);
    write_temp_file(&content)
}

/// Write content to a temporary file and return its path.
fn write_temp_file(content: &str) -> Result<PathBuf> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    let path = file.into_temp_path().keep()?;
    tracing::debug!(path = %path.display(), "wrote output file");
    Ok(path)
}
