//! Tests for the `cpw` binary: exit status and what reaches stderr.

use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Run `cpw` against `/bin/sh -c <script> sh <extra...>` with a clean environment.
fn cpw(script: &str, extra: &[&str], user: &str, password: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cpw"));
    cmd.env_clear()
        .stdin(Stdio::null())
        .args(["--program", "/bin/sh", "--program-arg=-c", "--program-arg", script])
        .args(["--program-arg", "sh"]);
    for arg in extra {
        cmd.args(["--program-arg", arg]);
    }
    cmd.args([user, password]).output().unwrap()
}

fn stderr_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_success_exits_zero() {
    let output = cpw("/bin/cat >/dev/null", &[], "s_alice", "Secr3t+");
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stderr.is_empty());
}

#[test]
fn test_tool_exit_code_is_passed_through() {
    let output = cpw("/bin/cat >/dev/null; exit 3", &[], "s_alice", "Secr3t+");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_signal_death_exits_one_with_one_diagnostic_line() {
    let output = cpw("/bin/cat >/dev/null; kill -TERM $$", &[], "s_alice", "Secr3t+");
    assert_eq!(output.status.code(), Some(1));

    let lines = stderr_lines(&output);
    assert_eq!(lines.len(), 1, "stderr: {lines:?}");
    assert!(lines[0].starts_with("cpw: child process "), "stderr: {lines:?}");
    assert!(lines[0].ends_with("exited on signal 15"), "stderr: {lines:?}");
    assert!(!lines[0].contains('\x1b'));
}

#[test]
fn test_validation_error_exits_one_without_spawning() {
    let tmp = TempDir::new().unwrap();
    let marker = tmp.path().join("ran");
    let marker = marker.to_str().unwrap();

    let output = cpw(r#"touch "$1""#, &[marker], "s_ali!ce", "Secr3t+");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stderr_lines(&output),
        vec!["cpw: illegal character in username at byte 5"]
    );
    assert!(!tmp.path().join("ran").exists());
}

#[test]
fn test_password_never_reaches_stderr() {
    let output = cpw("/bin/cat >/dev/null; kill -KILL $$", &[], "s_alice", "Hunter2+");
    assert_eq!(output.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&output.stderr).contains("Hunter2"));
}

#[test]
fn test_program_arg_with_comma_stays_one_argument() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("args.txt");
    let out = out.to_str().unwrap();

    let output = cpw(
        r#"/bin/cat >/dev/null; printf '%s|' "$2" > "$1""#,
        &[out, "x,y"],
        "s_alice",
        "Secr3t+",
    );
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(std::fs::read_to_string(out).unwrap(), "x,y|");
}

#[test]
fn test_program_args_from_environment() {
    let output = Command::new(env!("CARGO_BIN_EXE_cpw"))
        .env_clear()
        .env("CPW_PROGRAM", "/bin/sh")
        .env("CPW_PROGRAM_ARGS", "-c,/bin/cat >/dev/null; exit 4")
        .stdin(Stdio::null())
        .args(["s_alice", "Secr3t+"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_password_from_stdin() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("stdin.txt");

    let mut child = Command::new(env!("CARGO_BIN_EXE_cpw"))
        .env_clear()
        .args(["--program", "/bin/sh", "--program-arg=-c"])
        .args(["--program-arg", r#"exec /bin/cat > "$1""#, "--program-arg", "sh"])
        .args(["--program-arg", out.to_str().unwrap()])
        .args(["--password-stdin", "s_alice"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    {
        use std::io::Write;
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"Secr3t+\n").unwrap();
    }
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "cpw s_alice\nSecr3t+\nSecr3t+\n"
    );
}

#[test]
fn test_usage_error_exits_one() {
    let output = Command::new(env!("CARGO_BIN_EXE_cpw"))
        .env_clear()
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}
