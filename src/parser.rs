//! Argument parsing for declared commands.
//!
//! A parse runs in fixed stages: spec validation, token normalization,
//! option resolution, reserved option handling, option type checks and
//! finally positional binding. The first failure ends the parse.

use crate::config::{ArgumentSpec, CommandSpec, OptionSpec};
use crate::help::{generate_help, generate_version, short_usage};
use crate::report::Reporter;
use crate::tokenizer::{normalize, Token};
use crate::types::TypeRegistry;
use crate::validate::DefinitionError;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use thiserror::Error;

/// Long name of the reserved help option.
pub const HELP_OPTION: &str = "help";
/// Long name of the reserved version option.
pub const VERSION_OPTION: &str = "version";

/// Accepted number of positional arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentRange {
    pub min: usize,
    pub max: usize,
}

impl fmt::Display for ArgumentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (0, 0) => f.write_str("no arguments"),
            (1, 1) => f.write_str("exactly 1 argument"),
            (min, max) if min == max => write!(f, "exactly {} arguments", min),
            (min, max) => write!(f, "{} to {} arguments", min, max),
        }
    }
}

/// Errors caused by the invocation, given a valid declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("does not accept any options (got '{0}')")]
    OptionsNotAccepted(String),

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("missing value for option: {0}")]
    MissingValue(String),

    #[error("option {option} does not take a value (got '{value}')")]
    UnexpectedValue { option: String, value: String },

    #[error("option {0} given more than once")]
    DuplicateOption(String),

    #[error("invalid value '{value}' for option {option}: expected {expected}")]
    InvalidOptionValue {
        option: String,
        value: String,
        expected: String,
    },

    #[error("invalid value '{value}' for argument <{argument}>: expected {expected}")]
    InvalidArgumentValue {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("accepts no arguments, got {0}")]
    NoArgumentsAccepted(usize),

    #[error("missing required argument: <{0}>")]
    MissingArgument(String),

    #[error("expected {range}, got {got}")]
    ArgumentCount { range: ArgumentRange, got: usize },
}

/// What a resolved option carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// A flag was given
    Present,
    /// A value option was given with this value
    Value(String),
}

impl OptionValue {
    /// The value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Present => None,
            OptionValue::Value(v) => Some(v),
        }
    }
}

/// Successfully parsed options and arguments, keyed by declared name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    /// Given options, keyed by long name whatever spelling was used
    pub options: HashMap<String, OptionValue>,
    /// Bound positional arguments, keyed by argument name
    pub arguments: HashMap<String, String>,
}

impl ParseResult {
    /// Whether an option was given.
    pub fn is_set(&self, long: &str) -> bool {
        self.options.contains_key(long)
    }

    /// Value of a value option, if given.
    pub fn value(&self, long: &str) -> Option<&str> {
        self.options.get(long).and_then(OptionValue::as_str)
    }

    /// Value bound to a positional argument, if supplied.
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }
}

/// Outcome of parsing one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Success(ParseResult),
    /// The reserved help option was given; full help has been printed.
    HelpRequested,
    /// The reserved version option was given; the version line has been printed.
    VersionRequested,
    DefinitionError(DefinitionError),
    UserError(UsageError),
}

/// Process status a CLI-shaped host should report for an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Success, help or version
    Clean,
    /// The invocation was wrong
    Usage,
    /// The declaration itself is broken
    Definition,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Clean => 0,
            ExitStatus::Usage => 2,
            // EX_SOFTWARE from sysexits.h
            ExitStatus::Definition => 70,
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}

impl ParseOutcome {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            ParseOutcome::Success(_)
            | ParseOutcome::HelpRequested
            | ParseOutcome::VersionRequested => ExitStatus::Clean,
            ParseOutcome::UserError(_) => ExitStatus::Usage,
            ParseOutcome::DefinitionError(_) => ExitStatus::Definition,
        }
    }

    /// Short machine readable name of the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            ParseOutcome::Success(_) => "success",
            ParseOutcome::HelpRequested => "help",
            ParseOutcome::VersionRequested => "version",
            ParseOutcome::DefinitionError(_) => "definition-error",
            ParseOutcome::UserError(_) => "user-error",
        }
    }
}

/// Why a parse stopped early.
#[derive(Debug)]
enum Failure {
    Definition(DefinitionError),
    Usage(UsageError),
}

impl From<DefinitionError> for Failure {
    fn from(err: DefinitionError) -> Self {
        Failure::Definition(err)
    }
}

impl From<UsageError> for Failure {
    fn from(err: UsageError) -> Self {
        Failure::Usage(err)
    }
}

/// Where a parse ended up when nothing failed.
#[derive(Debug)]
enum Stage {
    Help,
    Version,
    Done(ParseResult),
}

/// Options resolved to their long names, plus the remaining positionals.
#[derive(Debug, Default)]
struct Resolved {
    options: HashMap<String, OptionValue>,
    positionals: Vec<String>,
}

/// Parses invocations of one declared command.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    spec: &'a CommandSpec,
    types: Cow<'a, TypeRegistry>,
}

impl<'a> Parser<'a> {
    /// Parser using the built-in value types.
    pub fn new(spec: &'a CommandSpec) -> Self {
        Self {
            spec,
            types: Cow::Owned(TypeRegistry::builtin()),
        }
    }

    /// Parser using a caller-provided type registry.
    pub fn with_types(spec: &'a CommandSpec, types: &'a TypeRegistry) -> Self {
        Self {
            spec,
            types: Cow::Borrowed(types),
        }
    }

    pub fn spec(&self) -> &CommandSpec {
        self.spec
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Parse arguments, printing diagnostics to stderr.
    pub fn parse(&self, args: &[String]) -> ParseOutcome {
        self.parse_with(args, &mut Reporter::stderr())
    }

    /// Parse arguments, printing help, usage and errors to `reporter`.
    pub fn parse_with<W: Write>(&self, args: &[String], reporter: &mut Reporter<W>) -> ParseOutcome {
        let name = self.spec.display_name();

        // Diagnostic write failures are ignored: they must not change the outcome
        match self.run(args) {
            Ok(Stage::Done(result)) => ParseOutcome::Success(result),
            Ok(Stage::Help) => {
                let _ = reporter.text(&generate_help(self.spec, &self.types));
                ParseOutcome::HelpRequested
            }
            Ok(Stage::Version) => {
                let _ = reporter.text(&generate_version(self.spec));
                ParseOutcome::VersionRequested
            }
            Err(Failure::Definition(err)) => {
                tracing::debug!(command = name, error = %err, "definition error");
                let _ = reporter.error(&format!("{}: {}", name, err));
                let _ = reporter.text(&short_usage(self.spec));
                ParseOutcome::DefinitionError(err)
            }
            Err(Failure::Usage(err)) => {
                tracing::debug!(command = name, error = %err, "user error");
                let _ = reporter.error(&format!("{}: {}", name, err));
                let _ = reporter.text(&short_usage(self.spec));
                ParseOutcome::UserError(err)
            }
        }
    }

    fn run(&self, args: &[String]) -> Result<Stage, Failure> {
        self.spec.validate(&self.types)?;

        let tokens = normalize(args, &self.spec.options)?;
        tracing::trace!(tokens = ?tokens, "normalized arguments");

        let resolved = resolve_options(&tokens, &self.spec.options)?;
        tracing::debug!(
            options = resolved.options.len(),
            positionals = resolved.positionals.len(),
            "resolved options"
        );

        // Help wins over everything that is still unchecked
        if resolved.options.contains_key(HELP_OPTION) {
            return Ok(Stage::Help);
        }
        if resolved.options.contains_key(VERSION_OPTION) {
            return Ok(Stage::Version);
        }

        self.check_option_types(&resolved.options)?;
        let arguments = self.bind_arguments(&resolved.positionals)?;

        Ok(Stage::Done(ParseResult {
            options: resolved.options,
            arguments,
        }))
    }

    fn check_option_types(&self, options: &HashMap<String, OptionValue>) -> Result<(), UsageError> {
        for spec in &self.spec.options {
            let Some(value_type) = spec.effective_type() else {
                continue;
            };
            let Some(OptionValue::Value(value)) = options.get(&spec.long) else {
                continue;
            };
            if !self.types.validate(value, value_type) {
                return Err(UsageError::InvalidOptionValue {
                    option: format!("--{}", spec.long),
                    value: value.clone(),
                    expected: self.types.describe(value_type).to_string(),
                });
            }
        }
        Ok(())
    }

    fn bind_arguments(&self, values: &[String]) -> Result<HashMap<String, String>, UsageError> {
        let specs = &self.spec.arguments;
        let range = ArgumentRange {
            min: specs.iter().filter(|a| a.required).count(),
            max: specs.len(),
        };
        let got = values.len();
        tracing::trace!(min = range.min, max = range.max, got, "binding arguments");

        if range.max == 0 && got > 0 {
            return Err(UsageError::NoArgumentsAccepted(got));
        }
        if got < range.min {
            if range.min == 1 && got == 0 {
                if let Some(missing) = specs.iter().find(|a| a.required) {
                    return Err(UsageError::MissingArgument(missing.name.clone()));
                }
            }
            return Err(UsageError::ArgumentCount { range, got });
        }
        if got > range.max {
            return Err(UsageError::ArgumentCount { range, got });
        }

        let mut bound = HashMap::with_capacity(got);
        for (spec, value) in specs.iter().zip(values) {
            self.check_argument_type(spec, value)?;
            bound.insert(spec.name.clone(), value.clone());
        }
        Ok(bound)
    }

    fn check_argument_type(&self, spec: &ArgumentSpec, value: &str) -> Result<(), UsageError> {
        if self.types.validate(value, &spec.value_type) {
            return Ok(());
        }
        Err(UsageError::InvalidArgumentValue {
            argument: spec.name.clone(),
            value: value.to_string(),
            expected: self.types.describe(&spec.value_type).to_string(),
        })
    }
}

/// Map normalized option tokens to declared options.
///
/// Short spellings are translated to the long name. Everything that is not
/// an option ends up in the positional list, in input order, with the `--`
/// marker dropped.
fn resolve_options(tokens: &[Token], options: &[OptionSpec]) -> Result<Resolved, UsageError> {
    let mut resolved = Resolved::default();
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        let spec = match token {
            Token::EndOfOptions => continue,
            Token::Positional(v) | Token::Value(v) => {
                resolved.positionals.push(v.clone());
                continue;
            }
            Token::Long(name) => options
                .iter()
                .find(|o| o.long == *name)
                .ok_or_else(|| UsageError::UnknownOption(token.to_string()))?,
            Token::Short(c) => options
                .iter()
                .find(|o| o.short == Some(*c))
                .ok_or_else(|| UsageError::UnknownOption(token.to_string()))?,
        };

        let attached = iter.next_if(|t| matches!(t, Token::Value(_)));
        let value = match (spec.takes_value(), attached) {
            (true, Some(Token::Value(v))) => OptionValue::Value(v.clone()),
            (true, _) => return Err(UsageError::MissingValue(token.to_string())),
            (false, Some(Token::Value(v))) => {
                return Err(UsageError::UnexpectedValue {
                    option: token.to_string(),
                    value: v.clone(),
                })
            }
            (false, _) => OptionValue::Present,
        };

        if resolved.options.insert(spec.long.clone(), value).is_some() {
            return Err(UsageError::DuplicateOption(format!("--{}", spec.long)));
        }
    }

    Ok(resolved)
}

/// Parse arguments for a command using the built-in value types.
///
/// Diagnostics go to stderr.
pub fn parse_args(spec: &CommandSpec, args: &[String]) -> ParseOutcome {
    Parser::new(spec).parse(args)
}
