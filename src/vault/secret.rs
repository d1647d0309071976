//! Strong secret generation
//!
//! Secrets have a fixed shape so they satisfy common password policies:
//! two uppercase, two lowercase, two digits and two symbols, followed by
//! 32 hex characters from 16 random bytes. 40 characters in total.

use crate::error::{GestureVaultError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretString;
use std::fmt::Write as _;
use zeroize::Zeroizing;

pub const SECRET_LEN: usize = 40;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
pub const SYMBOLS: &[u8] = b"!@#$%^&*";

const PER_CLASS: usize = 2;
const HEX_BYTES: usize = 16;

/// Generate a fresh secret from the OS CSPRNG
pub fn generate_secret() -> Result<SecretString> {
    generate_secret_with(&mut OsRng)
}

pub(crate) fn generate_secret_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<SecretString> {
    let mut secret = String::with_capacity(SECRET_LEN);

    for class in [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS] {
        for _ in 0..PER_CLASS {
            secret.push(pick(rng, class)?);
        }
    }

    let mut bytes = Zeroizing::new([0u8; HEX_BYTES]);
    fill(rng, bytes.as_mut())?;
    for b in bytes.iter() {
        // Writing to a String cannot fail
        let _ = write!(secret, "{:02x}", b);
    }

    Ok(SecretString::from(secret))
}

fn fill<R: RngCore + ?Sized>(rng: &mut R, buf: &mut [u8]) -> Result<()> {
    rng.try_fill_bytes(buf)
        .map_err(|e| GestureVaultError::GenerationError(e.to_string()))
}

/// Uniform pick from a character class by rejection sampling
fn pick<R: RngCore + ?Sized>(rng: &mut R, class: &[u8]) -> Result<char> {
    let limit = 256 - (256 % class.len());
    let mut byte = [0u8; 1];
    loop {
        fill(rng, &mut byte)?;
        let value = byte[0] as usize;
        if value < limit {
            return Ok(class[value % class.len()] as char);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::test_support::FailingRng;
    use secrecy::ExposeSecret;

    #[test]
    fn test_shape_and_character_classes() {
        for _ in 0..50 {
            let secret = generate_secret().unwrap();
            let s = secret.expose_secret();
            assert_eq!(s.len(), SECRET_LEN);

            let head: Vec<char> = s.chars().take(8).collect();
            assert!(head[..2].iter().all(|c| c.is_ascii_uppercase()));
            assert!(head[2..4].iter().all(|c| c.is_ascii_lowercase()));
            assert!(head[4..6].iter().all(|c| c.is_ascii_digit()));
            assert!(head[6..8].iter().all(|c| SYMBOLS.contains(&(*c as u8))));

            assert!(s[8..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_secrets_differ() {
        let a = generate_secret().unwrap();
        let b = generate_secret().unwrap();
        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn test_no_entropy_means_generation_error() {
        let err = generate_secret_with(&mut FailingRng).unwrap_err();
        assert!(matches!(err, GestureVaultError::GenerationError(_)));
    }
}
