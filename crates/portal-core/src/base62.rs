//! Fixed-radix integer codec used to turn generated ids into short codes.
//!
//! Symbols are ordered digits, then uppercase, then lowercase. Encoding is
//! most-significant symbol first with no padding, so zero is `"0"`.

use thiserror::Error;

pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const RADIX: u64 = ALPHABET.len() as u64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("cannot decode an empty string")]
    Empty,
    #[error("invalid character {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },
    #[error("value does not fit in 64 bits")]
    Overflow,
}

pub fn encode(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    // u64::MAX needs 11 symbols
    let mut symbols = Vec::with_capacity(11);
    while value > 0 {
        symbols.push(ALPHABET[(value % RADIX) as usize] as char);
        value /= RADIX;
    }
    symbols.iter().rev().collect()
}

pub fn decode(input: &str) -> Result<u64, CodecError> {
    if input.is_empty() {
        return Err(CodecError::Empty);
    }

    input
        .chars()
        .enumerate()
        .try_fold(0_u64, |acc, (position, ch)| {
            let digit = digit_value(ch).ok_or(CodecError::InvalidCharacter { ch, position })?;
            acc.checked_mul(RADIX)
                .and_then(|v| v.checked_add(digit))
                .ok_or(CodecError::Overflow)
        })
}

/// Returns true if every character of `input` belongs to the alphabet.
pub fn is_alphabet(input: &str) -> bool {
    input.chars().all(|ch| digit_value(ch).is_some())
}

fn digit_value(ch: char) -> Option<u64> {
    let value = match ch {
        '0'..='9' => ch as u64 - '0' as u64,
        'A'..='Z' => ch as u64 - 'A' as u64 + 10,
        'a'..='z' => ch as u64 - 'a' as u64 + 36,
        _ => return None,
    };
    Some(value)
}
