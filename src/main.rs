//! argspec - declarative argument parsing for shell functions.

use anyhow::{bail, Context, Result};
use argspec::{
    check_variable_names, generate_help, generate_output, generate_version, short_usage,
    CommandSpec, DefinitionError, ExitStatus, ParseOutcome, Reporter, TypeRegistry,
};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "ARGSPEC_LOG";
/// Log filter used when `ARGSPEC_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn";

/// Declarative argument parsing for shell functions.
#[derive(Parser, Debug)]
#[command(name = "argspec", version, about, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

// Where the command declaration comes from
#[derive(Args, Debug)]
struct SpecSource {
    /// JSON declaration of the target command
    #[arg(
        long,
        conflicts_with = "config_file",
        required_unless_present = "config_file"
    )]
    config: Option<String>,

    /// File holding the JSON declaration
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Command name (overrides the declaration)
    #[arg(long)]
    name: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse arguments and write a sourceable file with the results
    Parse {
        #[command(flatten)]
        source: SpecSource,

        /// Environment variable prefix (overrides the declaration)
        #[arg(long, env = "ARGSPEC_PREFIX")]
        prefix: Option<String>,

        /// Arguments to parse for the target command
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Print full help for the target command
    Help {
        #[command(flatten)]
        source: SpecSource,
    },

    /// Print the short usage hint for the target command
    Usage {
        #[command(flatten)]
        source: SpecSource,
    },

    /// Print the version line of the target command
    Version {
        #[command(flatten)]
        source: SpecSource,
    },

    /// Check a declaration without parsing anything
    Check {
        #[command(flatten)]
        source: SpecSource,
    },

    /// List the built-in value types
    Types,
}

impl SpecSource {
    fn read_json(&self) -> Result<String> {
        match (&self.config, &self.config_file) {
            (Some(json), _) => Ok(json.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display())),
            (None, None) => bail!("no command declaration given"),
        }
    }

    /// Apply command line overrides to a declaration.
    fn apply(&self, mut spec: CommandSpec) -> CommandSpec {
        if let Some(ref name) = self.name {
            spec.name = name.clone();
        }
        if spec.source.is_none() {
            if let Some(ref path) = self.config_file {
                spec.source = Some(path.display().to_string());
            }
        }
        spec
    }

    /// Read and decode the declaration. I/O failures are errors; a broken
    /// declaration is returned as the inner error.
    fn load(&self) -> Result<Result<CommandSpec, DefinitionError>> {
        let json = self.read_json()?;
        Ok(CommandSpec::from_json(&json).map(|spec| self.apply(spec)))
    }

    /// Declaration to report against when the real one cannot be decoded.
    fn placeholder(&self) -> CommandSpec {
        self.apply(CommandSpec::default())
    }
}

fn report_broken(spec: &CommandSpec, err: &DefinitionError) -> Result<Option<CommandSpec>> {
    Reporter::stderr().error(&format!("{}: {}", spec.display_name(), err))?;
    Ok(None)
}

/// Load a declaration and validate it, reporting a broken one on stderr.
///
/// Returns `None` if the declaration is broken.
fn load_checked(source: &SpecSource, types: &TypeRegistry) -> Result<Option<CommandSpec>> {
    let spec = match source.load()? {
        Ok(spec) => spec,
        Err(err) => return report_broken(&source.placeholder(), &err),
    };
    match spec.validate(types) {
        Ok(()) => Ok(Some(spec)),
        Err(err) => report_broken(&spec, &err),
    }
}

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn parse_command(source: &SpecSource, prefix: Option<&str>, args: &[String]) -> Result<ExitStatus> {
    let types = TypeRegistry::builtin();
    // Diagnostics are captured and replayed by the sourced file
    let mut reporter = Reporter::new(Vec::new());

    let loaded = source.load()?;
    let (spec, broken) = match loaded {
        Ok(spec) => {
            // Names the parser accepts may still share a shell variable
            let clash = check_variable_names(&spec).err();
            (spec, clash)
        }
        Err(err) => (source.placeholder(), Some(err)),
    };

    let outcome = match broken {
        Some(err) => {
            reporter.error(&format!("{}: {}", spec.display_name(), err))?;
            reporter.text(&short_usage(&spec))?;
            ParseOutcome::DefinitionError(err)
        }
        None => argspec::Parser::with_types(&spec, &types).parse_with(args, &mut reporter),
    };
    tracing::debug!(outcome = outcome.label(), "parsed arguments");

    let diagnostics = String::from_utf8_lossy(&reporter.into_inner()).into_owned();
    let prefix = prefix.unwrap_or_else(|| spec.effective_prefix());
    let path = generate_output(&spec, &outcome, &diagnostics, prefix)
        .context("failed to generate output file")?;

    println!("{}", path.display());
    Ok(outcome.exit_status())
}

fn run(cli: Cli) -> Result<ExitStatus> {
    let types = TypeRegistry::builtin();

    match cli.command {
        Commands::Parse {
            source,
            prefix,
            args,
        } => parse_command(&source, prefix.as_deref(), &args),
        Commands::Help { source } => {
            let Some(spec) = load_checked(&source, &types)? else {
                return Ok(ExitStatus::Definition);
            };
            print_stdout(&generate_help(&spec, &types))?;
            Ok(ExitStatus::Clean)
        }
        Commands::Usage { source } => {
            let Some(spec) = load_checked(&source, &types)? else {
                return Ok(ExitStatus::Definition);
            };
            print_stdout(&short_usage(&spec))?;
            Ok(ExitStatus::Clean)
        }
        Commands::Version { source } => {
            let Some(spec) = load_checked(&source, &types)? else {
                return Ok(ExitStatus::Definition);
            };
            print_stdout(&generate_version(&spec))?;
            Ok(ExitStatus::Clean)
        }
        Commands::Check { source } => {
            let Some(spec) = load_checked(&source, &types)? else {
                return Ok(ExitStatus::Definition);
            };
            if let Err(err) = check_variable_names(&spec) {
                report_broken(&spec, &err)?;
                return Ok(ExitStatus::Definition);
            }
            let mut reporter = Reporter::stderr();
            if !spec.has_option(argspec::parser::HELP_OPTION) {
                reporter.warn(&format!(
                    "{}: no --{} option declared",
                    spec.display_name(),
                    argspec::parser::HELP_OPTION
                ))?;
            }
            reporter.info(&format!(
                "{}: {} argument(s), {} option(s), declaration is valid",
                spec.display_name(),
                spec.arguments.len(),
                spec.options.len()
            ))?;
            Ok(ExitStatus::Clean)
        }
        Commands::Types => {
            let entries = types.entries();
            let width = entries.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            let mut listing = String::new();
            for (name, description) in entries {
                listing.push_str(&format!("{:<width$}  {}\n", name, description, width = width));
            }
            print_stdout(&listing)?;
            Ok(ExitStatus::Clean)
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(status) => status.into(),
        Err(err) => {
            let _ = Reporter::stderr().error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
