//! Hub time: 32-bit seconds since the system epoch.
//!
//! Message timestamps and trie key prefixes both derive from this clock. The
//! canonical sync encoding of a timestamp is its 10-digit zero-padded decimal
//! string, which keeps trie keys chronologically ordered digit by digit.

use std::time::{SystemTime, UNIX_EPOCH};

/// Number of decimal digits in the sync encoding of a timestamp.
pub const SYNC_TIMESTAMP_LENGTH: usize = 10;

/// Returns the current hub time.
#[must_use]
pub fn now() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before epoch")
        .as_secs();
    secs as u32
}

/// Encodes a timestamp as its 10-digit zero-padded decimal string.
#[must_use]
pub fn to_sync_timestamp(timestamp: u32) -> String {
    format!("{timestamp:0width$}", width = SYNC_TIMESTAMP_LENGTH)
}

/// Decodes a 10-digit decimal sync timestamp.
///
/// Returns `None` if the input is not exactly ten ASCII digits or does not
/// fit in 32 bits.
#[must_use]
pub fn from_sync_timestamp(encoded: &str) -> Option<u32> {
    if encoded.len() != SYNC_TIMESTAMP_LENGTH || !encoded.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    encoded.parse::<u32>().ok()
}
