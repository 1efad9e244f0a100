//! argspec - declarative argument parsing and validation for shell commands.
//!
//! A command describes its positional arguments, options, value types and
//! help text as data. [`Parser`] checks that declaration, parses one
//! invocation against it and returns a [`ParseOutcome`]: the type-checked
//! values, a help or version request, or an error that says whether the
//! declaration or the invocation is at fault.

pub mod config;
pub mod help;
pub mod output;
pub mod parser;
pub mod report;
pub mod tokenizer;
pub mod types;
pub mod validate;

pub use config::{ArgumentSpec, CommandSpec, OptionSpec};
pub use help::{generate_help, generate_version, short_usage, usage_line};
pub use output::{check_variable_names, generate_output, generate_output_string};
pub use parser::{
    parse_args, ExitStatus, OptionValue, ParseOutcome, ParseResult, Parser, UsageError,
};
pub use report::Reporter;
pub use types::{TypeError, TypeRegistry};
pub use validate::{DefinitionError, SpecFault};
