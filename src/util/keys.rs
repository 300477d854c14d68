//! Byte-string helpers shared by batches, iterators and stores.

/// Stored in place of a value when a put carries none, so that the backend
/// never confuses "no value" with "key absent".
pub const SENTINEL_VALUE: &[u8] = &[0x00];

/// Concatenates `prefix` and `start` into the iterator's inclusive lower bound.
#[inline]
pub fn join_key(prefix: &[u8], start: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + start.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(start);
    key
}

/// The smallest key strictly greater than `key`.
#[inline]
pub fn key_successor(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0x00);
    next
}

/// Exclusive upper bound of all keys starting with `prefix`.
///
/// Returns `None` when the range is unbounded: an empty prefix, or a prefix
/// made only of `0xFF` bytes.
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < 0xFF {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

/// True once `key` sorts after every key carrying `prefix`.
#[inline]
pub fn is_past_prefix(key: &[u8], prefix: &[u8]) -> bool {
    !key.starts_with(prefix) && key > prefix
}

/// Copies `value`, substituting [`SENTINEL_VALUE`] when there is none.
#[inline]
pub fn value_or_sentinel(value: Option<&[u8]>) -> Vec<u8> {
    value.unwrap_or(SENTINEL_VALUE).to_vec()
}
