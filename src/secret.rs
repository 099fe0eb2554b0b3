//! Zero-on-drop byte buffer for secret-bearing lines.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Owned byte buffer that is overwritten with zeros before it is released.
///
/// - **No `Clone`**: a secret exists in exactly one buffer
/// - **Redacted `Debug`**: prints `[REDACTED SecretBuffer]`
/// - **Automatic zeroization**: the whole allocation, spare capacity included,
///   is zeroed on drop, so early returns and `?` erase it too
///
/// Build it with [`SecretBuffer::with_capacity`] and the `push_*` methods so
/// the buffer never reallocates and leaves an unzeroed copy behind.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretBuffer {
    bytes: Vec<u8>,
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED SecretBuffer]")
    }
}

impl SecretBuffer {
    /// Empty buffer that can hold `capacity` bytes without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Append bytes.
    ///
    /// If this would outgrow the current allocation, the old contents are
    /// copied into a fresh allocation and the old one is zeroed first.
    pub fn push_bytes(&mut self, data: &[u8]) {
        let needed = self.bytes.len() + data.len();
        if needed > self.bytes.capacity() {
            let mut grown = Vec::with_capacity(needed);
            grown.extend_from_slice(&self.bytes);
            self.bytes.zeroize();
            self.bytes = grown;
        }
        self.bytes.extend_from_slice(data);
    }

    /// Append a string.
    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    /// Borrow the contents.
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Zero and clear the buffer now instead of waiting for drop.
    ///
    /// Safe to call more than once.
    pub fn erase(&mut self) {
        self.bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let mut secret = SecretBuffer::with_capacity(8);
        secret.push_str("hunter2");
        let printed = format!("{secret:?}");
        assert_eq!(printed, "[REDACTED SecretBuffer]");
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_push_and_expose() {
        let mut secret = SecretBuffer::with_capacity(8);
        secret.push_str("Secr3t!");
        secret.push_bytes(b"\n");
        assert_eq!(secret.expose(), b"Secr3t!\n");
        assert_eq!(secret.len(), 8);
    }

    #[test]
    fn test_growth_keeps_contents() {
        let mut secret = SecretBuffer::with_capacity(2);
        secret.push_str("ab");
        secret.push_str("cdef");
        assert_eq!(secret.expose(), b"abcdef");
    }

    #[test]
    fn test_erase_zeroes_storage() {
        let mut secret = SecretBuffer::with_capacity(16);
        secret.push_str("Secr3t!\n");
        let ptr = secret.expose().as_ptr();
        let len = secret.len();

        secret.erase();
        assert!(secret.is_empty());

        // The allocation is still owned by `secret`, so it is valid to read.
        let storage = unsafe { std::slice::from_raw_parts(ptr, len) };
        assert!(storage.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_erase_twice_is_harmless() {
        let mut secret = SecretBuffer::with_capacity(4);
        secret.push_str("abc");
        secret.erase();
        secret.erase();
        assert!(secret.is_empty());
    }
}
