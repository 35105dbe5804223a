//! The fixed charset passwords are drawn from
//!
//! Sampling is uniform over table entries, not over character classes:
//! with 26 symbols against 10 digits, a symbol is 2.6 times as likely as a
//! digit.

/// Allowed password characters, in table order
pub const CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Returns true if `byte` appears in [`CHARSET`]
pub fn contains(byte: u8) -> bool {
    CHARSET.contains(&byte)
}

/// Number of entries in the table
pub const fn len() -> usize {
    CHARSET.len()
}
