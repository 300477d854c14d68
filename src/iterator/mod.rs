/// Prefix iterators for RemoteKV
///
/// Both backends expose the same forward-only cursor over the keys that
/// start with a prefix, beginning at `prefix ‖ start`:
///
/// ```text
/// Database::new_iterator(prefix, start)
///     ↓
///     ├─→ RawIterator   (paginated bounded scans, sees concurrent writes)
///     └─→ TxnIterator   (server-side cursor on one transaction snapshot)
/// ```
///
/// ## Positional invariant
///
/// After `next()` returns true, `key()` starts with the prefix and is
/// `>= prefix ‖ start`. Keys are produced in ascending byte order.
///
/// ## Errors
///
/// Backend failures do not panic and do not surface from `next()`. They are
/// kept in the iterator, `next()` returns false from then on, and
/// [`KvIterator::error`] reports them. Running out of keys is not an error.
use crate::util::Status;

/// Forward-only iterator over a key prefix.
///
/// # Lifecycle
///
/// A new iterator is not positioned. Call `next()` until it returns false,
/// then check `error()` and `release()` it:
///
/// ```ignore
/// let mut iter = db.new_iterator(b"user/", b"")?;
/// while iter.next() {
///     println!("{:?}: {:?}", iter.key(), iter.value());
/// }
/// if let Some(err) = iter.error() {
///     return Err(err.clone());
/// }
/// iter.release();
/// ```
pub trait KvIterator: Send {
    /// Moves to the next matching entry. Returns false once the range is
    /// used up, after an error, or after `release`.
    fn next(&mut self) -> bool;

    /// The error that stopped iteration, if any.
    fn error(&self) -> Option<&Status>;

    /// Current key; empty unless the last `next()` returned true.
    fn key(&self) -> &[u8];

    /// Current value; empty unless the last `next()` returned true.
    fn value(&self) -> &[u8];

    /// Frees backend resources. Calling it again is a no-op.
    fn release(&mut self);
}

mod raw_iterator;
mod txn_iterator;

pub use raw_iterator::RawIterator;
pub use txn_iterator::TxnIterator;
