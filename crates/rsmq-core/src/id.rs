//! Message id generation.
//!
//! An id is the base-36 encoding of the server time in microseconds followed
//! by a random alphanumeric suffix. Ids from later timestamps compare greater
//! as long as their prefixes have equal length, which holds until the year
//! 2085 (10 base-36 digits).

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 22;

/// Total length of a generated id for present-day timestamps.
pub const ID_LEN: usize = 32;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encode `value` in lower-case base 36.
pub fn base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Generate a new message id for the given server time (microseconds).
pub fn generate(micros: u64) -> String {
    generate_with(&mut rand::thread_rng(), micros)
}

/// Generate a message id using the supplied random source.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, micros: u64) -> String {
    let mut id = base36(micros);
    id.extend(
        rng.sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from),
    );
    id
}

/// Recover the send time in milliseconds from an id prefix.
pub fn sent_at_millis(id: &str) -> Option<u64> {
    let prefix_len = id.len().checked_sub(SUFFIX_LEN)?;
    let prefix = id.get(..prefix_len)?;
    if prefix.is_empty() {
        return None;
    }
    u64::from_str_radix(prefix, 36).ok().map(|micros| micros / 1000)
}
