//! End-to-end tests driving the built `argspec` binary.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::NamedTempFile;

const SPEC: &str = r#"{
    "name": "greet",
    "version": "1.2.0",
    "about": "Greet somebody",
    "arguments": ["who|Who to greet", "times|Repeat count|optional|integer"],
    "options": [
        "help|h|Show this help",
        "version|V|Show version",
        "loud|l|Shout",
        {"long": "greeting", "short": "g", "value_name": "TEXT"}
    ]
}"#;

fn argspec(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_argspec"))
        .args(args)
        .env_remove("ARGSPEC_PREFIX")
        .env_remove("ARGSPEC_LOG")
        .output()
        .expect("failed to run argspec")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Run `parse` against `spec` and return the exit code and the generated file.
fn parse_to_file(spec: &str, args: &[&str]) -> (i32, PathBuf) {
    let mut full = vec!["parse", "--config", spec, "--"];
    full.extend_from_slice(args);
    let output = argspec(&full);

    let path = PathBuf::from(stdout(&output).trim());
    assert!(path.exists(), "output file missing: {}", stderr(&output));
    (output.status.code().unwrap(), path)
}

/// Run `parse` and return the exit code and the generated file's contents.
fn parse(args: &[&str]) -> (i32, String) {
    let (code, path) = parse_to_file(SPEC, args);
    let contents = std::fs::read_to_string(&path).expect("output file missing");
    std::fs::remove_file(&path).unwrap();
    (code, contents)
}

/// Source a generated file in bash, then run `script` in the same shell.
fn source_in_bash(path: &Path, dir: &Path, script: &str) -> Output {
    let output = Command::new("bash")
        .arg("-c")
        .arg(format!(". \"$1\"; {}", script))
        .arg("bash")
        .arg(path)
        .current_dir(dir)
        .output()
        .expect("failed to run bash");
    std::fs::remove_file(path).unwrap();
    output
}

#[test]
fn test_parse_success_writes_exports() {
    let (code, contents) = parse(&["-l", "--greeting", "Hi there", "world", "3"]);
    assert_eq!(code, 0);
    assert!(contents.contains("export ARGSPEC_OUTCOME='success'\n"));
    assert!(contents.contains("export ARGSPEC_OPT_LOUD='true'\n"));
    assert!(contents.contains("export ARGSPEC_OPT_GREETING='Hi there'\n"));
    assert!(contents.contains("export ARGSPEC_ARG_WHO='world'\n"));
    assert!(contents.contains("export ARGSPEC_ARG_TIMES='3'\n"));
    assert!(contents.contains("unset ARGSPEC_OPT_HELP\n"));
}

#[test]
fn test_parse_user_error() {
    let (code, contents) = parse(&["world", "many"]);
    assert_eq!(code, 2);
    assert!(contents.contains("export ARGSPEC_OUTCOME='user-error'\n"));
    assert!(contents.ends_with("return 2\n"));
}

#[test]
fn test_sourced_user_error_prints_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let (_, path) = parse_to_file(SPEC, &["world", "many"]);
    let output = source_in_bash(&path, dir.path(), "echo \"status=$? outcome=$ARGSPEC_OUTCOME\"");

    assert_eq!(stdout(&output), "status=2 outcome=user-error\n");
    assert_eq!(
        stderr(&output),
        "error: greet: invalid value 'many' for argument <times>: expected integer number\n\
         Usage: greet [options] <who> [times]\n\
         Try 'greet --help' for more information.\n"
    );
}

#[test]
fn test_sourced_values_round_trip() {
    let spec = r#"{
        "name": "note",
        "arguments": ["msg"],
        "options": [{"long": "title", "value_name": "TEXT"}, "dry-run"]
    }"#;
    let msg = "hi!\tthere\nnext";
    let title = "it's $HOME `id` \"q\" \\n \r!! end\n";
    let dir = tempfile::tempdir().unwrap();

    let (code, path) = parse_to_file(spec, &["--title", title, "--dry-run", msg]);
    assert_eq!(code, 0);
    let output = source_in_bash(
        &path,
        dir.path(),
        r#"printf '%s\0%s\0%s' "$ARGSPEC_ARG_MSG" "$ARGSPEC_OPT_TITLE" "$ARGSPEC_OPT_DRY_RUN""#,
    );

    assert!(output.status.success(), "{}", stderr(&output));
    let printed = stdout(&output);
    let values: Vec<&str> = printed.split('\0').collect();
    assert_eq!(values, vec![msg, title, "true"]);
}

#[test]
fn test_sourced_diagnostics_cannot_run_commands() {
    let spec = r#"{"name": "count", "arguments": ["n|Count|required|integer"]}"#;
    let inputs = [
        "1\nARGSPEC_MESSAGE\ntouch PWNED\ncat <<'X'",
        "'; touch PWNED; '",
        "$(touch PWNED)`touch PWNED`",
    ];

    for input in inputs {
        let dir = tempfile::tempdir().unwrap();
        let (code, path) = parse_to_file(spec, &[input]);
        assert_eq!(code, 2);

        let output = source_in_bash(&path, dir.path(), "echo \"status=$?\"");
        assert_eq!(stdout(&output), "status=2\n", "input {:?}", input);
        assert!(!dir.path().join("PWNED").exists(), "input {:?} ran a command", input);
        assert!(
            stderr(&output).starts_with(&format!("error: count: invalid value '{}'", input)),
            "{}",
            stderr(&output)
        );
    }
}

#[test]
fn test_parse_rejects_clashing_variable_names() {
    let spec = r#"{"name": "t", "options": ["dry-run", "dry_run"]}"#;
    let dir = tempfile::tempdir().unwrap();

    let (code, path) = parse_to_file(spec, &["--dry-run"]);
    assert_eq!(code, 70);
    let output = source_in_bash(&path, dir.path(), "echo \"$ARGSPEC_OUTCOME\"");
    assert_eq!(stdout(&output), "definition-error\n");
    assert!(stderr(&output)
        .contains("invalid option spec #1 'dry_run||||': shell variable OPT_DRY_RUN is also used by 'dry-run'"));

    let output = argspec(&["check", "--config", spec]);
    assert_eq!(output.status.code(), Some(70));
    assert!(stderr(&output).contains("is also used by 'dry-run'"));
}

#[test]
fn test_parse_help_request() {
    let (code, contents) = parse(&["--help"]);
    assert_eq!(code, 0);
    assert!(contents.contains("export ARGSPEC_OUTCOME='help'\n"));
    assert!(contents.contains("Usage: greet [options] <who> [times]\n"));
    assert!(contents.ends_with("return 0\n"));
}

#[test]
fn test_parse_broken_declaration() {
    let output = argspec(&["parse", "--config", "{\"name\": 5}", "--", "x"]);
    assert_eq!(output.status.code(), Some(70));

    let path = stdout(&output).trim().to_string();
    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(contents.contains("export ARGSPEC_OUTCOME='definition-error'\n"));
    assert!(contents.ends_with("return 70\n"));
}

#[test]
fn test_parse_prefix_from_flag_and_env() {
    let output = argspec(&["parse", "--config", SPEC, "--prefix", "G_", "--", "you"]);
    let path = stdout(&output).trim().to_string();
    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(contents.contains("export G_ARG_WHO='you'\n"));

    let output = Command::new(env!("CARGO_BIN_EXE_argspec"))
        .args(["parse", "--config", SPEC, "--", "you"])
        .env("ARGSPEC_PREFIX", "ENV_")
        .output()
        .unwrap();
    let path = stdout(&output).trim().to_string();
    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(contents.contains("export ENV_ARG_WHO='you'\n"));
}

#[test]
fn test_help_subcommand_prints_to_stdout() {
    let output = argspec(&["help", "--config", SPEC]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("Usage: greet [options] <who> [times]\n\nGreet somebody\n"));
    assert!(text.contains("  times  Repeat count (integer number)\n"));
}

#[test]
fn test_usage_and_version_subcommands() {
    let output = argspec(&["usage", "--config", SPEC]);
    assert_eq!(
        stdout(&output),
        "Usage: greet [options] <who> [times]\nTry 'greet --help' for more information.\n"
    );

    let output = argspec(&["version", "--config", SPEC, "--name", "hello"]);
    assert_eq!(stdout(&output), "hello 1.2.0\n");
}

#[test]
fn test_check_subcommand() {
    let output = argspec(&["check", "--config", SPEC]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("greet: 2 argument(s), 4 option(s), declaration is valid"));

    let output = argspec(&[
        "check",
        "--config",
        r#"{"name":"bad","arguments":["a|||nosuchtype"]}"#,
    ]);
    assert_eq!(output.status.code(), Some(70));
    assert!(stderr(&output).contains(
        "error: bad: invalid argument spec #0 'a||required|nosuchtype': unknown type 'nosuchtype'"
    ));
}

#[test]
fn test_check_warns_without_help_option() {
    let output = argspec(&["check", "--config", r#"{"name":"quiet"}"#]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("warning: quiet: no --help option declared"));
}

#[test]
fn test_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SPEC.as_bytes()).unwrap();
    let path = file.path().to_str().unwrap();

    let output = argspec(&["help", "--config-file", path]);
    assert!(output.status.success());
    assert!(stdout(&output).ends_with(&format!("Defined in {}\n", path)));
}

#[test]
fn test_missing_config_file() {
    let output = argspec(&["help", "--config-file", "/nonexistent/argspec.json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("failed to read /nonexistent/argspec.json"));
}

#[test]
fn test_types_subcommand() {
    let output = argspec(&["types"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("integer"));
    assert!(text.contains("integer number"));
    assert!(text.contains("ipv4"));
}
