//! `cpw` - change a principal's password through an interactive admin tool.
//!
//! Exit status: the tool's own exit code if it exited, 1 for any validation
//! error, OS error, or if the tool was killed by a signal.

use std::collections::HashSet;
use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::error::ErrorKind;
use clap::Parser;
use cpw::{guard_core_dumps, EnvPolicy, PasswordChange, SignalPolicy, DEFAULT_PROGRAM, SECRET_MAX_LEN};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

/// Change a Kerberos principal's password by scripting kadmin's prompts.
#[derive(Parser)]
#[command(name = "cpw", version)]
struct Cli {
    /// Principal whose password is changed.
    user: String,

    /// New password. Visible in the process list; prefer --password-stdin.
    #[arg(required_unless_present = "password_stdin")]
    password: Option<String>,

    /// Read the new password from the first line of stdin.
    #[arg(long, conflicts_with = "password")]
    password_stdin: bool,

    /// Absolute path of the admin tool.
    #[arg(long, env = "CPW_PROGRAM", default_value = DEFAULT_PROGRAM)]
    program: PathBuf,

    /// Argument for the admin tool, passed through verbatim; repeat for
    /// several. Without any, CPW_PROGRAM_ARGS is split on commas instead.
    #[arg(long = "program-arg", allow_hyphen_values = true)]
    program_args: Vec<String>,

    /// Accept only usernames starting with this prefix; repeat for several.
    #[arg(long = "user-prefix", env = "CPW_USER_PREFIXES", value_delimiter = ',')]
    user_prefixes: Vec<String>,

    /// Forward this variable from our environment to the tool; repeat for several.
    #[arg(long = "pass-env")]
    pass_env: Vec<String>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, env = "CPW_LOG", default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("cpw: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn run(mut cli: Cli) -> anyhow::Result<i32> {
    let signals = SignalPolicy::install().context("installing signal handlers")?;
    let guard = guard_core_dumps();
    debug!(?guard, "process hardened");

    let password = match cli.password.take() {
        Some(p) => Zeroizing::new(p),
        None => read_password_line()?,
    };

    let env = if cli.pass_env.is_empty() {
        EnvPolicy::Empty
    } else {
        EnvPolicy::Inherit(cli.pass_env.iter().cloned().collect::<HashSet<_>>())
    };

    let program_args = program_args(
        std::mem::take(&mut cli.program_args),
        std::env::var("CPW_PROGRAM_ARGS").ok(),
    );

    let change = PasswordChange::new(&cli.program)
        .args(program_args)
        .env_policy(env)
        .user_prefixes(cli.user_prefixes.iter().cloned());

    let code = change.run(&cli.user, &password, &signals)?;
    Ok(code)
}

/// Arguments from the command line, or else from the comma-separated
/// environment list. Command-line values are never split.
fn program_args(from_cli: Vec<String>, from_env: Option<String>) -> Vec<String> {
    if !from_cli.is_empty() {
        return from_cli;
    }
    match from_env {
        Some(list) if !list.is_empty() => list.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

/// Read one line from stdin into a zero-on-drop string, without the newline.
fn read_password_line() -> anyhow::Result<Zeroizing<String>> {
    // Sized so a valid password never makes the buffer reallocate
    let mut line = Zeroizing::new(String::with_capacity(SECRET_MAX_LEN + 2));
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    if read == 0 {
        bail!("no password on stdin");
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}
