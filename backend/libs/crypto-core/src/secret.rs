//! Strength checks for the HS256 signing secret
//!
//! A guessable secret lets anyone mint session tokens, so production
//! configuration refuses anything classified as [`SecretStrength::Weak`].

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

const MIN_SECRET_LENGTH: usize = 32;
const RECOMMENDED_SECRET_LENGTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStrength {
    Weak,
    Acceptable,
    Strong,
}

/// Classify a signing secret.
///
/// Weak when shorter than 32 bytes, below 4 bits/byte of Shannon entropy, or
/// containing runs of four repeated or ascending bytes.
pub fn validate_secret_strength(secret: &str) -> SecretStrength {
    let bytes = secret.as_bytes();

    if bytes.len() < MIN_SECRET_LENGTH {
        return SecretStrength::Weak;
    }

    let entropy = shannon_entropy(bytes);
    if entropy < 4.0 || has_obvious_patterns(bytes) {
        return SecretStrength::Weak;
    }

    if bytes.len() >= RECOMMENDED_SECRET_LENGTH && entropy >= 5.0 {
        SecretStrength::Strong
    } else {
        SecretStrength::Acceptable
    }
}

/// Generate a random alphanumeric secret, e.g. for local `.env` files.
pub fn generate_secret(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length.max(MIN_SECRET_LENGTH))
        .map(char::from)
        .collect()
}

fn shannon_entropy(data: &[u8]) -> f64 {
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }

    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn has_obvious_patterns(data: &[u8]) -> bool {
    let mut repeated = 1;
    let mut ascending = 1;

    for pair in data.windows(2) {
        repeated = if pair[0] == pair[1] { repeated + 1 } else { 1 };
        ascending = if pair[1] as i16 - pair[0] as i16 == 1 {
            ascending + 1
        } else {
            1
        };

        if repeated >= 4 || ascending >= 4 {
            return true;
        }
    }

    false
}
