//! Usage line, full help, short usage hint and version text.

use crate::config::{ArgumentSpec, CommandSpec, OptionSpec};
use crate::parser::HELP_OPTION;
use crate::types::{TypeRegistry, DEFAULT_TYPE};

/// Gap between the term column and the description column.
const COLUMN_GAP: usize = 2;
/// Indentation of section entries.
const INDENT: &str = "  ";

/// The `Usage:` line, without a trailing newline.
///
/// Required arguments are shown as `<name>`, optional ones as `[name]`.
pub fn usage_line(spec: &CommandSpec) -> String {
    let mut line = format!("Usage: {}", spec.display_name());
    if !spec.options.is_empty() {
        line.push_str(" [options]");
    }
    for arg in &spec.arguments {
        if arg.required {
            line.push_str(&format!(" <{}>", arg.name));
        } else {
            line.push_str(&format!(" [{}]", arg.name));
        }
    }
    line
}

fn type_suffix(types: &TypeRegistry, value_type: &str) -> Option<String> {
    if value_type == DEFAULT_TYPE {
        None
    } else {
        Some(format!("({})", types.describe(value_type)))
    }
}

fn argument_row(arg: &ArgumentSpec, types: &TypeRegistry) -> (String, String) {
    let mut parts = Vec::new();
    if !arg.description.is_empty() {
        parts.push(arg.description.clone());
    }
    if arg.required {
        parts.push("(required)".to_string());
    }
    parts.extend(type_suffix(types, &arg.value_type));
    (arg.name.clone(), parts.join(" "))
}

/// The left column for an option: `-s, --long <ARG>` or `    --long <ARG>`.
fn option_term(opt: &OptionSpec) -> String {
    let mut term = match opt.short {
        Some(short) => format!("-{}, --{}", short, opt.long),
        None => format!("    --{}", opt.long),
    };
    if let Some(ref value_name) = opt.value_name {
        term.push_str(&format!(" <{}>", value_name));
    }
    term
}

fn option_row(opt: &OptionSpec, types: &TypeRegistry) -> (String, String) {
    let mut parts = Vec::new();
    if !opt.description.is_empty() {
        parts.push(opt.description.clone());
    }
    if let Some(value_type) = opt.effective_type() {
        parts.extend(type_suffix(types, value_type));
    }
    (option_term(opt), parts.join(" "))
}

/// Render rows as an aligned two column table.
fn push_table(out: &mut String, title: &str, rows: &[(String, String)]) {
    let width = rows.iter().map(|(term, _)| term.len()).max().unwrap_or(0) + COLUMN_GAP;
    out.push_str(title);
    out.push_str(":\n");
    for (term, description) in rows {
        let line = format!("{}{:<width$}{}", INDENT, term, description, width = width);
        out.push_str(line.trim_end());
        out.push('\n');
    }
}

/// Generate the full help text for a command.
pub fn generate_help(spec: &CommandSpec, types: &TypeRegistry) -> String {
    let mut sections = vec![usage_line(spec) + "\n"];

    if let Some(ref about) = spec.about {
        sections.push(format!("{}\n", about));
    }
    if let Some(ref long_about) = spec.long_about {
        sections.push(format!("{}\n", long_about.trim_end()));
    }

    if !spec.arguments.is_empty() {
        let rows: Vec<_> = spec
            .arguments
            .iter()
            .map(|a| argument_row(a, types))
            .collect();
        let mut section = String::new();
        push_table(&mut section, "Arguments", &rows);
        sections.push(section);
    }

    if !spec.options.is_empty() {
        let rows: Vec<_> = spec.options.iter().map(|o| option_row(o, types)).collect();
        let mut section = String::new();
        push_table(&mut section, "Options", &rows);
        sections.push(section);
    }

    if !spec.examples.is_empty() {
        let mut section = String::from("Examples:\n");
        for example in &spec.examples {
            section.push_str(INDENT);
            section.push_str(example);
            section.push('\n');
        }
        sections.push(section);
    }

    sections.push(footer(spec));
    sections.join("\n")
}

fn footer(spec: &CommandSpec) -> String {
    let mut footer = spec.display_name().to_string();
    if let Some(ref version) = spec.version {
        footer.push(' ');
        footer.push_str(version);
    }
    if let Some(ref author) = spec.author {
        footer.push_str(" by ");
        footer.push_str(author);
    }
    footer.push('\n');
    if let Some(ref source) = spec.source {
        footer.push_str(&format!("Defined in {}\n", source));
    }
    footer
}

/// Generate the short usage hint shown after a user error.
pub fn short_usage(spec: &CommandSpec) -> String {
    let mut out = String::new();
    if !spec.arguments.is_empty() || !spec.options.is_empty() {
        out.push_str(&usage_line(spec));
        out.push('\n');
    }
    if spec.has_option(HELP_OPTION) {
        out.push_str(&format!(
            "Try '{} --{}' for more information.\n",
            spec.display_name(),
            HELP_OPTION
        ));
    } else if let Some(ref source) = spec.source {
        out.push_str(&format!("See {} for the command definition.\n", source));
    }
    out
}

/// Generate version string.
pub fn generate_version(spec: &CommandSpec) -> String {
    let mut version = spec.display_name().to_string();
    if let Some(ref v) = spec.version {
        version.push(' ');
        version.push_str(v);
    }
    version.push('\n');
    version
}
