//! Adversarial tests for cpw.
//!
//! These tests feed hostile principals, passwords, paths and environments
//! through the public API. Every one must be rejected before a line is built.

use cpw::{
    validate, EnvPolicy, Field, PasswordChange, ScriptLine, ScriptedCommand, ValidationPolicy,
    Violation,
};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Test Helpers
// =============================================================================

fn change() -> PasswordChange {
    PasswordChange::new("/bin/cat")
}

fn assert_illegal(result: Result<(), Violation>, field: Field) {
    match result {
        Err(Violation::IllegalCharacter { field: f, .. }) => assert_eq!(f, field),
        other => panic!("expected IllegalCharacter for {field}, got {other:?}"),
    }
}

// =============================================================================
// COMMAND INJECTION THROUGH THE PRINCIPAL
// =============================================================================

#[test]
fn test_newline_in_user_cannot_add_a_command() {
    // Attack: second kadmin command smuggled into the cpw line
    assert_illegal(change().check("alice\ndelprinc admin", "pw"), Field::Identity);
}

#[test]
fn test_carriage_return_in_user() {
    assert_illegal(change().check("alice\rdelprinc", "pw"), Field::Identity);
}

#[test]
fn test_space_in_user_cannot_add_options() {
    // Attack: extra cpw options like "-randkey"
    assert_illegal(change().check("alice -randkey", "pw"), Field::Identity);
}

#[test]
fn test_shell_metacharacters_in_user() {
    for user in ["a;b", "a|b", "a&b", "$(id)", "`id`", "a'b", "a\"b", "a*b", "a!b"] {
        assert_illegal(change().check(user, "pw"), Field::Identity);
    }
}

#[test]
fn test_nul_in_user() {
    assert_illegal(change().check("alice\0admin", "pw"), Field::Identity);
}

#[test]
fn test_unicode_lookalike_in_user() {
    // Cyrillic 'а' (U+0430) instead of Latin 'a'
    assert_illegal(change().check("\u{0430}lice", "pw"), Field::Identity);
}

#[test]
fn test_oversized_user() {
    let user = "a".repeat(513);
    assert!(matches!(
        change().check(&user, "pw"),
        Err(Violation::TooLong { field: Field::Identity, .. })
    ));
}

// =============================================================================
// INJECTION THROUGH THE PASSWORD
// =============================================================================

#[test]
fn test_newline_in_password_cannot_answer_next_prompt() {
    // Attack: first password line differs from the confirmation line
    assert_illegal(change().check("alice", "pw1\npw2"), Field::Secret);
}

#[test]
fn test_escape_sequences_in_password() {
    assert_illegal(change().check("alice", "\x1b[2J"), Field::Secret);
    assert_illegal(change().check("alice", "pw\x7f"), Field::Secret);
    assert_illegal(change().check("alice", "pw\x08\x08"), Field::Secret);
}

#[test]
fn test_password_punctuation_outside_allow_list() {
    for pw in ["a b", "a!b", "a#b", "a$b", "a%b", "a^b", "a&b", "a(b", "a=b", "a,b", "a<b"] {
        assert_illegal(change().check("alice", pw), Field::Secret);
    }
}

#[test]
fn test_password_one_over_limit() {
    let pw = "x".repeat(513);
    assert_eq!(
        change().check("alice", &pw),
        Err(Violation::TooLong {
            field: Field::Secret,
            max: 512,
            len: 513
        })
    );
}

#[test]
fn test_multibyte_password_counted_in_bytes() {
    // 257 two-byte characters: 514 bytes, over the limit
    let pw = "é".repeat(257);
    assert!(matches!(
        ValidationPolicy::SECRET.validate(&pw),
        Err(Violation::TooLong { len: 514, .. })
    ));
}

// =============================================================================
// ALLOW-LIST CANNOT RE-ADMIT CONTROL CHARACTERS
// =============================================================================

#[test]
fn test_allow_list_with_newline_still_rejects_newline() {
    assert!(matches!(
        validate("a\nb", "\n", 10),
        Err(Violation::IllegalCharacter { position: 1, .. })
    ));
}

#[test]
fn test_allow_list_with_nul_still_rejects_nul() {
    assert!(matches!(
        validate("\0", "\0", 10),
        Err(Violation::IllegalCharacter { position: 0, .. })
    ));
}

// =============================================================================
// RAW SCRIPT LINES
// =============================================================================

#[test]
fn test_script_line_rejects_embedded_newline() {
    assert_eq!(
        ScriptLine::plain("cpw alice\ndelprinc admin").unwrap_err(),
        Violation::LineContainsNewline
    );
    assert_eq!(
        ScriptLine::secret("pw\npw").unwrap_err(),
        Violation::LineContainsNewline
    );
}

#[test]
fn test_script_line_rejects_nul() {
    assert!(matches!(
        ScriptLine::plain("cpw\0alice"),
        Err(Violation::NulByte { .. })
    ));
}

// =============================================================================
// BINARY PATH ATTACKS
// =============================================================================

#[test]
fn test_relative_program_rejected() {
    // PATH hijacking: "kadmin" would be looked up by a shell
    let result = ScriptedCommand::new("kadmin")
        .line(ScriptLine::plain("cpw alice").unwrap())
        .prepare();
    assert!(matches!(result, Err(Violation::BinNotAbsolute { .. })));
}

#[test]
fn test_null_byte_in_program_path() {
    let result = ScriptedCommand::new("/bin/cat\0/bin/sh")
        .line(ScriptLine::plain("x").unwrap())
        .prepare();
    assert!(result.is_err());
}

#[test]
fn test_directory_as_program() {
    let result = ScriptedCommand::new("/tmp")
        .line(ScriptLine::plain("x").unwrap())
        .prepare();
    assert!(matches!(result, Err(Violation::BinIsDirectory { .. })));
}

#[test]
fn test_nul_in_program_argument() {
    let result = ScriptedCommand::new("/bin/cat")
        .with_args(["-u\0-v"])
        .line(ScriptLine::plain("x").unwrap())
        .prepare();
    assert!(matches!(result, Err(Violation::NulByte { what: "argument" })));
}

// =============================================================================
// ENVIRONMENT ATTACKS
// =============================================================================

#[test]
fn test_loader_injection_stripped_from_fixed_env() {
    let env = HashMap::from([
        ("LD_PRELOAD".to_string(), "/tmp/evil.so".to_string()),
        ("LD_LIBRARY_PATH".to_string(), "/tmp".to_string()),
        ("LANG".to_string(), "C".to_string()),
    ]);
    let result = EnvPolicy::Fixed(env).apply_from(Vec::new());
    assert_eq!(result.len(), 1);
    assert!(result.contains_key("LANG"));
}

#[test]
fn test_kerberos_config_override_stripped_from_inherited_env() {
    let keys: HashSet<String> = ["KRB5_CONFIG", "KRB5CCNAME", "TZ"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let parent = vec![
        ("KRB5_CONFIG".to_string(), "/tmp/evil.conf".to_string()),
        ("KRB5CCNAME".to_string(), "FILE:/tmp/stolen".to_string()),
        ("TZ".to_string(), "UTC".to_string()),
    ];
    let result = EnvPolicy::Inherit(keys).apply_from(parent);
    assert_eq!(result.keys().collect::<Vec<_>>(), vec!["TZ"]);
}

#[test]
fn test_nul_in_environment_value() {
    let env = HashMap::from([("LANG".to_string(), "C\0LD_PRELOAD=/x".to_string())]);
    let result = ScriptedCommand::new("/bin/cat")
        .with_env(EnvPolicy::Fixed(env))
        .line(ScriptLine::plain("x").unwrap())
        .prepare();
    assert!(matches!(result, Err(Violation::NulByte { .. })));
}

// =============================================================================
// LEAKAGE
// =============================================================================

#[test]
fn test_errors_never_echo_the_password() {
    let err = change().check("alice", "hunter2 with spaces").unwrap_err();
    assert!(!err.to_string().contains("hunter2"));
}

#[test]
fn test_debug_output_never_shows_secret_lines() {
    let cmd = change().script("alice", "hunter2").unwrap();
    let printed = format!("{cmd:?}");
    assert!(printed.contains("cpw alice"));
    assert!(!printed.contains("hunter2"));
}
