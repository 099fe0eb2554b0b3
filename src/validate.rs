//! Allow-list validation for untrusted input strings.
//!
//! Every byte of a validated string must be an ASCII letter, an ASCII digit,
//! or a member of the policy's extra allow-list. Control characters (below
//! `0x20` or above `0x7E`, which includes every non-ASCII byte) are rejected
//! before the allow-list is consulted, so they can never be allowed.

use crate::error::{Field, Violation};

/// Characters besides letters and digits allowed in a principal name.
pub const IDENTITY_CHARS: &str = "@_.-/";

/// Characters besides letters and digits allowed in a password.
pub const SECRET_CHARS: &str = "~@*_.-+:?/{}[]";

/// Maximum principal name length in bytes.
pub const IDENTITY_MAX_LEN: usize = 512;

/// Maximum password length in bytes.
pub const SECRET_MAX_LEN: usize = 512;

/// Validation rules for one category of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Which field this policy guards; used in error reports.
    pub field: Field,

    /// Allowed non-alphanumeric characters.
    pub allowed_extra: &'static str,

    /// Maximum length in bytes.
    pub max_len: usize,
}

impl ValidationPolicy {
    /// Policy for principal / user names.
    pub const IDENTITY: ValidationPolicy = ValidationPolicy {
        field: Field::Identity,
        allowed_extra: IDENTITY_CHARS,
        max_len: IDENTITY_MAX_LEN,
    };

    /// Policy for passwords.
    pub const SECRET: ValidationPolicy = ValidationPolicy {
        field: Field::Secret,
        allowed_extra: SECRET_CHARS,
        max_len: SECRET_MAX_LEN,
    };

    /// Validate `s` against this policy.
    ///
    /// # Errors
    ///
    /// - `TooLong` if `s` is longer than `max_len` bytes
    /// - `IllegalCharacter` for the first byte that is a control character or
    ///   neither alphanumeric nor allow-listed
    pub fn validate(&self, s: &str) -> Result<(), Violation> {
        validate(s, self.allowed_extra, self.max_len).map_err(|e| match e {
            Violation::TooLong { max, len, .. } => Violation::TooLong {
                field: self.field,
                max,
                len,
            },
            Violation::IllegalCharacter { position, .. } => Violation::IllegalCharacter {
                field: self.field,
                position,
            },
            other => other,
        })
    }
}

/// Check a string against a length limit and an allow-list of extra characters.
///
/// Errors are reported against [`Field::Identity`]; use
/// [`ValidationPolicy::validate`] to get the right field.
pub fn validate(s: &str, allowed_extra: &str, max_len: usize) -> Result<(), Violation> {
    if s.len() > max_len {
        return Err(Violation::TooLong {
            field: Field::Identity,
            max: max_len,
            len: s.len(),
        });
    }

    if let Some(position) = s.bytes().position(|b| !is_legal(b, allowed_extra)) {
        return Err(Violation::IllegalCharacter {
            field: Field::Identity,
            position,
        });
    }

    Ok(())
}

/// True for bytes below `0x20` or above `0x7E`.
pub fn is_control(b: u8) -> bool {
    !(0x20..=0x7e).contains(&b)
}

fn is_legal(b: u8, allowed_extra: &str) -> bool {
    if b.is_ascii_alphanumeric() {
        return true;
    }
    // Checked first: the allow-list cannot re-admit control characters
    if is_control(b) {
        return false;
    }
    allowed_extra.as_bytes().contains(&b)
}
