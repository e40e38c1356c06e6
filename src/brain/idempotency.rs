//! Idempotency keys: `think-<YYYYMMDD>-<HHMM>-<random6>`.

use chrono::{DateTime, Utc};
use rand::Rng;

const PREFIX: &str = "think";
const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 6;

/// Generate a fresh key from the current UTC time.
pub fn generate() -> String {
    generate_at(Utc::now(), &mut rand::thread_rng())
}

/// Generate a key for `now` with suffix characters drawn from `rng`.
pub fn generate_at<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .filter_map(|_| {
            let idx = rng.gen_range(0..SUFFIX_ALPHABET.len());
            SUFFIX_ALPHABET.get(idx).copied().map(char::from)
        })
        .collect();
    format!("{PREFIX}-{}-{suffix}", now.format("%Y%m%d-%H%M"))
}

/// Use the caller's key when it is non-blank, otherwise generate one.
pub fn resolve(supplied: Option<&str>) -> String {
    match supplied {
        Some(key) if !key.trim().is_empty() => key.to_owned(),
        _ => generate(),
    }
}
