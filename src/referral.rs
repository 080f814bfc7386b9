//! Deterministic referral codes.
//!
//! A code is the HMAC-SHA256 of a namespaced identifier, rendered in Base62
//! and fitted to a fixed width. The same identifier and secret always give
//! the same code, and without the secret the mapping can be neither inverted
//! nor predicted, so sequential database ids are not exposed.

use std::fmt::Display;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::base62;

pub const DEFAULT_LENGTH: usize = 12;

const NAMESPACE: &str = "ref|";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing referral secret (set REFCODE_SECRET or referral.secret in config)")]
    MissingSecret,
    #[error("referral code length must be at least 1")]
    ZeroLength,
}

pub fn generate_referral_code(
    identifier: impl Display,
    secret: &str,
    length: usize,
) -> Result<String, Error> {
    if secret.is_empty() {
        return Err(Error::MissingSecret);
    }
    if length == 0 {
        return Err(Error::ZeroLength);
    }

    let payload = format!("{NAMESPACE}{identifier}");
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    let digest = mac.finalize().into_bytes();

    Ok(base62::fit(&base62::encode_bytes(&digest), length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_answer() {
        let code = generate_referral_code("user-42", "s1", 12).unwrap();
        assert_eq!(code, "tHA4TstKD7MP");
    }

    #[test]
    fn test_deterministic() {
        let a = generate_referral_code("user-42", "s1", DEFAULT_LENGTH).unwrap();
        let b = generate_referral_code("user-42", "s1", DEFAULT_LENGTH).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identifier_changes_code() {
        let a = generate_referral_code("user-42", "s1", 12).unwrap();
        let b = generate_referral_code("user-43", "s1", 12).unwrap();
        assert_ne!(a, b);
        assert_eq!(b, "7wMs0lgGkRAm");
    }

    #[test]
    fn test_secret_changes_code() {
        let a = generate_referral_code("user-42", "s1", 12).unwrap();
        let b = generate_referral_code("user-42", "s2", 12).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_numeric_identifier_uses_decimal_form() {
        let from_number = generate_referral_code(42, "s1", 20).unwrap();
        let from_string = generate_referral_code("42", "s1", 20).unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number, "aQdqvMLyvsuUOLPE58iv");
    }

    #[test]
    fn test_exact_length_and_alphabet() {
        for length in [1, 8, 12, 22, 43, 64] {
            let code = generate_referral_code("member", "secret", length).unwrap();
            assert_eq!(code.len(), length);
            assert!(code.bytes().all(|b| base62::ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_short_digest_is_left_padded() {
        let full = generate_referral_code("user-42", "s1", 43).unwrap();
        assert_eq!(full, "tHA4TstKD7MPYevFAt7Rj4iIAJnE6MsAniJTln7bHAG");

        let padded = generate_referral_code("user-42", "s1", 50).unwrap();
        assert_eq!(padded, format!("0000000{full}"));
    }

    #[test]
    fn test_missing_secret() {
        let err = generate_referral_code("user-42", "", 12).unwrap_err();
        assert!(matches!(err, Error::MissingSecret));
    }

    #[test]
    fn test_zero_length() {
        let err = generate_referral_code("user-42", "s1", 0).unwrap_err();
        assert!(matches!(err, Error::ZeroLength));
    }
}
