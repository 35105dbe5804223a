//! Password generation
//!
//! A password is written in place into a fixed-capacity [`PasswordBuffer`].
//! Each position takes `CHARSET[r % CHARSET.len()]` for a fresh random `r`,
//! and a NUL terminator follows the last character.

use crate::charset::CHARSET;
use kernel_api::{KernelError, RandomSource};
use std::fmt;
use zeroize::Zeroize;

/// Number of characters in every generated password
pub const PASSWORD_LEN: usize = 16;

/// Capacity of a password buffer, terminator included
pub const BUFFER_SIZE: usize = 64;

/// Fixed-capacity buffer holding one generated password
#[derive(Clone)]
pub struct PasswordBuffer {
    bytes: [u8; BUFFER_SIZE],
    len: usize,
}

impl PasswordBuffer {
    /// Creates an empty, zeroed buffer
    pub fn new() -> Self {
        Self {
            bytes: [0; BUFFER_SIZE],
            len: 0,
        }
    }

    /// The password characters, without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The password followed by its NUL terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes[..=self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        BUFFER_SIZE
    }

    /// Zeroes the whole buffer and forgets the password length
    pub fn scrub(&mut self) {
        self.zeroize();
    }
}

impl Default for PasswordBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Zeroize for PasswordBuffer {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
        self.len.zeroize();
    }
}

// Never print password contents.
impl fmt::Debug for PasswordBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordBuffer")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Fills `buf` with a fresh `length`-character password
///
/// Overwrites the previous contents in place. Bytes past the terminator keep
/// whatever an earlier, longer password left there.
///
/// # Errors
/// Returns `KernelError::InvalidArgument` unless `0 < length < BUFFER_SIZE`.
pub fn generate(
    buf: &mut PasswordBuffer,
    length: usize,
    rng: &mut dyn RandomSource,
) -> Result<(), KernelError> {
    if length == 0 || length >= BUFFER_SIZE {
        return Err(KernelError::InvalidArgument(format!(
            "password length {} outside 1..{}",
            length, BUFFER_SIZE
        )));
    }

    let table_len = CHARSET.len() as u32;
    for slot in &mut buf.bytes[..length] {
        *slot = CHARSET[rng.random_below(table_len) as usize];
    }
    buf.bytes[length] = 0;
    buf.len = length;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset;
    use sim_kernel::random::SeededRandom;

    /// Source that replays a fixed sequence
    struct Script(Vec<u32>, usize);

    impl RandomSource for Script {
        fn random_u32(&mut self) -> u32 {
            let v = self.0[self.1 % self.0.len()];
            self.1 += 1;
            v
        }
    }

    #[test]
    fn test_generate_fixed_length() {
        let mut rng = SeededRandom::new(1);
        let mut buf = PasswordBuffer::new();
        generate(&mut buf, PASSWORD_LEN, &mut rng).unwrap();

        assert_eq!(buf.len(), PASSWORD_LEN);
        assert!(buf.as_bytes().iter().all(|b| charset::contains(*b)));
        assert_eq!(buf.as_bytes_with_nul()[PASSWORD_LEN], 0);
    }

    #[test]
    fn test_generate_every_valid_length() {
        let mut rng = SeededRandom::new(2);
        let mut buf = PasswordBuffer::new();
        for length in 1..BUFFER_SIZE {
            generate(&mut buf, length, &mut rng).unwrap();
            assert_eq!(buf.len(), length);
            assert!(buf.as_bytes().iter().all(|b| charset::contains(*b)));
            assert_eq!(buf.as_bytes_with_nul()[length], 0);
        }
    }

    #[test]
    fn test_generate_rejects_out_of_range_length() {
        let mut rng = SeededRandom::new(3);
        let mut buf = PasswordBuffer::new();
        assert!(matches!(
            generate(&mut buf, 0, &mut rng),
            Err(KernelError::InvalidArgument(_))
        ));
        assert!(matches!(
            generate(&mut buf, BUFFER_SIZE, &mut rng),
            Err(KernelError::InvalidArgument(_))
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_generate_maps_draws_modulo_table() {
        let table = CHARSET.len() as u32;
        let mut rng = Script(vec![0, 1, table, table + 2, table - 1], 0);
        let mut buf = PasswordBuffer::new();
        generate(&mut buf, 5, &mut rng).unwrap();

        let expected = [
            CHARSET[0],
            CHARSET[1],
            CHARSET[0],
            CHARSET[2],
            CHARSET[CHARSET.len() - 1],
        ];
        assert_eq!(buf.as_bytes(), &expected);
    }

    #[test]
    fn test_generate_overwrites_in_place() {
        let mut rng = SeededRandom::new(4);
        let mut buf = PasswordBuffer::new();
        generate(&mut buf, 20, &mut rng).unwrap();
        let tail = buf.bytes[10..20].to_vec();

        generate(&mut buf, 8, &mut rng).unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.bytes[8], 0);
        // Left over from the longer password.
        assert_eq!(&buf.bytes[10..20], tail.as_slice());
    }

    #[test]
    fn test_scrub_zeroes_everything() {
        let mut rng = SeededRandom::new(5);
        let mut buf = PasswordBuffer::new();
        generate(&mut buf, PASSWORD_LEN, &mut rng).unwrap();

        buf.scrub();
        assert!(buf.is_empty());
        assert!(buf.bytes.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_debug_hides_contents() {
        let mut rng = Script(vec![0], 0);
        let mut buf = PasswordBuffer::new();
        generate(&mut buf, 4, &mut rng).unwrap();
        let debug = format!("{:?}", buf);
        assert_eq!(debug, "PasswordBuffer { len: 4, .. }");
        assert!(!debug.contains("aaaa"));
    }
}
