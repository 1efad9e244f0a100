//! Rewrites raw invocation arguments into a canonical token stream.
//!
//! After normalization every option is a lone [`Token::Long`] or
//! [`Token::Short`], followed by a [`Token::Value`] when a value was given.
//! Grouped short flags (`-abc`), attached short values (`-cvalue`,
//! `-c=value`) and attached long values (`--name=value`) are all split up
//! here so the resolver only ever sees "name [value]".

use crate::config::OptionSpec;
use crate::parser::UsageError;
use std::fmt;

/// A normalized invocation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `--name`
    Long(String),
    /// `-c`
    Short(char),
    /// Value belonging to the option token right before it
    Value(String),
    /// Anything that is not an option
    Positional(String),
    /// The `--` marker; only positionals follow it
    EndOfOptions,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Long(name) => write!(f, "--{}", name),
            Token::Short(c) => write!(f, "-{}", c),
            Token::Value(v) | Token::Positional(v) => f.write_str(v),
            Token::EndOfOptions => f.write_str("--"),
        }
    }
}

/// Whether the text after a `-` reads as a number (`-5`, `-0.25`).
fn is_negative_number(body: &str) -> bool {
    let mut digits = 0;
    let mut dots = 0;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

fn find_short(options: &[OptionSpec], c: char) -> Option<&OptionSpec> {
    options.iter().find(|o| o.short == Some(c))
}

/// Whether a raw argument should be treated as an option.
///
/// A lone `-` is positional. So is a negative number, unless its first
/// digit is itself a declared short option.
fn looks_like_option(arg: &str, options: &[OptionSpec]) -> bool {
    let Some(body) = arg.strip_prefix('-') else {
        return false;
    };
    if body.is_empty() {
        return false;
    }
    if body.starts_with('-') {
        return true;
    }
    if is_negative_number(body) {
        return body
            .chars()
            .next()
            .is_some_and(|c| find_short(options, c).is_some());
    }
    true
}

/// Normalize raw arguments against the declared options.
///
/// Fails on an unknown short option, or on any option at all when the
/// command declares none. Unknown long options are passed through for the
/// resolver to reject.
pub fn normalize(args: &[String], options: &[OptionSpec]) -> Result<Vec<Token>, UsageError> {
    let mut tokens = Vec::with_capacity(args.len());
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "--" {
            tokens.push(Token::EndOfOptions);
            tokens.extend(iter.by_ref().map(|a| Token::Positional(a.clone())));
            break;
        }

        if !looks_like_option(arg, options) {
            tokens.push(Token::Positional(arg.clone()));
            continue;
        }

        if options.is_empty() {
            return Err(UsageError::OptionsNotAccepted(arg.clone()));
        }

        if let Some(body) = arg.strip_prefix("--") {
            split_long(body, options, &mut iter, &mut tokens);
        } else {
            expand_short_cluster(&arg[1..], options, &mut iter, &mut tokens)?;
        }
    }

    Ok(tokens)
}

fn split_long<'a>(
    body: &str,
    options: &[OptionSpec],
    rest: &mut impl Iterator<Item = &'a String>,
    tokens: &mut Vec<Token>,
) {
    if let Some((name, value)) = body.split_once('=') {
        tokens.push(Token::Long(name.to_string()));
        tokens.push(Token::Value(value.to_string()));
        return;
    }

    tokens.push(Token::Long(body.to_string()));
    let takes_value = options
        .iter()
        .any(|o| o.long == body && o.takes_value());
    if takes_value {
        // The next argument is the value, whatever it looks like
        if let Some(value) = rest.next() {
            tokens.push(Token::Value(value.clone()));
        }
    }
}

fn expand_short_cluster<'a>(
    cluster: &str,
    options: &[OptionSpec],
    rest: &mut impl Iterator<Item = &'a String>,
    tokens: &mut Vec<Token>,
) -> Result<(), UsageError> {
    for (i, c) in cluster.char_indices() {
        let spec =
            find_short(options, c).ok_or_else(|| UsageError::UnknownOption(format!("-{}", c)))?;
        tokens.push(Token::Short(c));

        let remaining = &cluster[i + c.len_utf8()..];
        if spec.takes_value() {
            // -c=value, -cvalue, or -c value
            let value = match remaining.strip_prefix('=') {
                Some(v) => Some(v.to_string()),
                None if !remaining.is_empty() => Some(remaining.to_string()),
                None => rest.next().cloned(),
            };
            if let Some(value) = value {
                tokens.push(Token::Value(value));
            }
            return Ok(());
        }

        // A value attached to a flag is kept so the resolver can reject it
        if let Some(v) = remaining.strip_prefix('=') {
            tokens.push(Token::Value(v.to_string()));
            return Ok(());
        }
    }

    Ok(())
}
