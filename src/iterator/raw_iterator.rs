use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::{
    client::RawKvClient,
    iterator::KvIterator,
    statistics::Statistics,
    util::{
        CallContext, Result, Status,
        keys::{is_past_prefix, join_key, key_successor, prefix_upper_bound},
    },
};

/// Prefix iterator over a raw-access backend.
///
/// Entries are pulled in pages of at most `scan_limit` with bounded range
/// scans over `[page_cursor, prefix_upper_bound(prefix))`. Every page is a
/// fresh read, so concurrent writes may or may not be observed.
///
/// A page may hold fewer than `scan_limit` entries; only an empty page ends
/// the range.
pub struct RawIterator {
    client: Arc<dyn RawKvClient>,
    /// Caller context shared by every page request. Without one each page
    /// gets a fresh context from `call_timeout`.
    ctx: Option<CallContext>,
    call_timeout: Option<Duration>,
    scan_limit: usize,
    statistics: Arc<Statistics>,

    prefix: Vec<u8>,
    lower_bound: Vec<u8>,
    upper_bound: Option<Vec<u8>>,
    /// Inclusive start of the next page request.
    page_cursor: Vec<u8>,

    keys: Vec<Vec<u8>>,
    values: Vec<Vec<u8>>,
    index: Option<usize>,

    positioned: bool,
    exhausted: bool,
    released: bool,
    err: Option<Status>,
}

impl RawIterator {
    pub fn new(
        client: Arc<dyn RawKvClient>,
        prefix: &[u8],
        start: &[u8],
        scan_limit: usize,
        call_timeout: Option<Duration>,
        statistics: Arc<Statistics>,
    ) -> Self {
        let lower_bound = join_key(prefix, start);
        statistics.record_iterator();
        RawIterator {
            client,
            ctx: None,
            call_timeout,
            scan_limit,
            statistics,
            prefix: prefix.to_vec(),
            upper_bound: prefix_upper_bound(prefix),
            page_cursor: lower_bound.clone(),
            lower_bound,
            keys: Vec::new(),
            values: Vec::new(),
            index: None,
            positioned: false,
            exhausted: false,
            released: false,
            err: None,
        }
    }

    /// Runs every page request under `ctx`, so one deadline or cancel
    /// covers the whole iteration.
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Replaces the current page with the next one. Returns false when the
    /// range has no more entries.
    fn fetch_page(&mut self) -> Result<bool> {
        self.keys.clear();
        self.values.clear();
        self.index = None;

        let ctx = match &self.ctx {
            Some(ctx) => ctx.clone(),
            None => CallContext::from_timeout(self.call_timeout),
        };
        let (keys, values) = self.client.scan(
            &ctx,
            &self.page_cursor,
            self.upper_bound.as_deref(),
            self.scan_limit,
        )?;
        if keys.len() != values.len() {
            return Err(Status::corruption(format!(
                "scan returned {} keys and {} values",
                keys.len(),
                values.len()
            )));
        }
        self.statistics.record_page_fetch(keys.len() as u64);
        debug!(
            entries = keys.len(),
            limit = self.scan_limit,
            "fetched scan page"
        );

        let Some(last) = keys.last() else {
            return Ok(false);
        };
        self.page_cursor = key_successor(last);
        self.keys = keys;
        self.values = values;
        Ok(true)
    }

    fn finish(&mut self) -> bool {
        self.positioned = false;
        self.exhausted = true;
        false
    }
}

impl KvIterator for RawIterator {
    fn next(&mut self) -> bool {
        if self.exhausted || self.released || self.err.is_some() {
            self.positioned = false;
            return false;
        }

        loop {
            let mut idx = self.index.map_or(0, |i| i + 1);
            if idx >= self.keys.len() {
                match self.fetch_page() {
                    Ok(true) => idx = 0,
                    Ok(false) => return self.finish(),
                    Err(e) => {
                        self.statistics.record_error();
                        self.err = Some(e);
                        self.positioned = false;
                        return false;
                    },
                }
            }
            self.index = Some(idx);

            let key = &self.keys[idx];
            if key.starts_with(&self.prefix) && *key >= self.lower_bound {
                self.positioned = true;
                return true;
            }
            if is_past_prefix(key, &self.prefix) {
                return self.finish();
            }
        }
    }

    fn error(&self) -> Option<&Status> {
        self.err.as_ref()
    }

    fn key(&self) -> &[u8] {
        match self.index {
            Some(idx) if self.positioned => &self.keys[idx],
            _ => &[],
        }
    }

    fn value(&self) -> &[u8] {
        match self.index {
            Some(idx) if self.positioned => &self.values[idx],
            _ => &[],
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.positioned = false;
        self.index = None;
        self.keys = Vec::new();
        self.values = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FailPoint, MemoryRawClient};

    fn client_with(pairs: &[(&str, &str)]) -> MemoryRawClient {
        let client = MemoryRawClient::new();
        let ctx = CallContext::background();
        for (k, v) in pairs {
            client.put(&ctx, k.as_bytes(), v.as_bytes()).unwrap();
        }
        client
    }

    fn iter(client: &MemoryRawClient, prefix: &str, start: &str, limit: usize) -> RawIterator {
        RawIterator::new(
            Arc::new(client.clone()),
            prefix.as_bytes(),
            start.as_bytes(),
            limit,
            None,
            Arc::new(Statistics::new()),
        )
    }

    fn collect(it: &mut RawIterator) -> Vec<String> {
        let mut out = Vec::new();
        while it.next() {
            out.push(String::from_utf8(it.key().to_vec()).unwrap());
        }
        out
    }

    #[test]
    fn test_prefix_ordering() {
        let client = client_with(&[("b1", "x"), ("a2", "y"), ("b3", "z"), ("a1", "w")]);
        let mut it = iter(&client, "a", "", 128);

        assert!(it.next());
        assert_eq!(it.key(), b"a1");
        assert_eq!(it.value(), b"w");
        assert!(it.next());
        assert_eq!(it.key(), b"a2");
        assert_eq!(it.value(), b"y");
        assert!(!it.next());
        assert!(it.error().is_none());
        assert_eq!(it.key(), b"");
        assert!(!it.next());
    }

    #[test]
    fn test_start_is_inclusive() {
        let client = client_with(&[("a1", "x"), ("a2", "y"), ("b1", "z")]);
        assert_eq!(collect(&mut iter(&client, "a", "2", 128)), vec!["a2"]);
        assert_eq!(collect(&mut iter(&client, "a", "0", 128)), vec!["a1", "a2"]);
        assert!(collect(&mut iter(&client, "a", "3", 128)).is_empty());
    }

    #[test]
    fn test_pagination_is_transparent() {
        let pairs: Vec<(String, String)> = (0..25)
            .map(|i| (format!("p{i:03}"), format!("v{i}")))
            .collect();
        let refs: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let mut all = refs.clone();
        all.push(("o", "before"));
        all.push(("q", "after"));
        let client = client_with(&all);

        let expected: Vec<String> = pairs.iter().map(|(k, _)| k.clone()).collect();
        for limit in [1, 2, 3, 7, 25, 26, 128] {
            assert_eq!(collect(&mut iter(&client, "p", "", limit)), expected, "limit {limit}");
        }
    }

    #[test]
    fn test_empty_prefix_walks_everything() {
        let client = client_with(&[("a", "1"), ("b", "2"), ("c", "3")]);
        assert_eq!(collect(&mut iter(&client, "", "", 2)), vec!["a", "b", "c"]);
        assert_eq!(collect(&mut iter(&client, "", "b", 2)), vec!["b", "c"]);
    }

    #[test]
    fn test_scan_is_bounded_by_prefix() {
        let mut pairs = vec![("a1".to_string(), "x".to_string())];
        for i in 0..100 {
            pairs.push((format!("b{i:03}"), "y".to_string()));
        }
        let refs: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let client = client_with(&refs);

        let mut it = iter(&client, "a", "", 2);
        assert_eq!(collect(&mut it), vec!["a1"]);
        // One page holding a1, then an empty page; the b keys are never read.
        assert_eq!(client.scan_calls(), 2);
    }

    /// Returns at most `cap` entries per scan whatever limit is asked for,
    /// like a remote scan that stops at a region boundary.
    struct CappedScanClient {
        inner: MemoryRawClient,
        cap: usize,
    }

    impl RawKvClient for CappedScanClient {
        fn get(&self, ctx: &CallContext, key: &[u8]) -> Result<Option<Vec<u8>>> {
            self.inner.get(ctx, key)
        }

        fn put(&self, ctx: &CallContext, key: &[u8], value: &[u8]) -> Result<()> {
            self.inner.put(ctx, key, value)
        }

        fn delete(&self, ctx: &CallContext, key: &[u8]) -> Result<()> {
            self.inner.delete(ctx, key)
        }

        fn batch_put(&self, ctx: &CallContext, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
            self.inner.batch_put(ctx, keys, values)
        }

        fn batch_delete(&self, ctx: &CallContext, keys: &[&[u8]]) -> Result<()> {
            self.inner.batch_delete(ctx, keys)
        }

        fn scan(
            &self,
            ctx: &CallContext,
            start: &[u8],
            end: Option<&[u8]>,
            limit: usize,
        ) -> Result<crate::client::ScanPage> {
            self.inner.scan(ctx, start, end, limit.min(self.cap))
        }

        fn close(&self) -> Result<()> {
            self.inner.close()
        }
    }

    #[test]
    fn test_short_pages_do_not_end_iteration() {
        let client = client_with(&[
            ("a1", "x"),
            ("a2", "x"),
            ("a3", "x"),
            ("a4", "x"),
            ("a5", "x"),
            ("b1", "x"),
        ]);
        let capped = CappedScanClient {
            inner: client.clone(),
            cap: 2,
        };
        let mut it = RawIterator::new(
            Arc::new(capped),
            b"a",
            b"",
            3,
            None,
            Arc::new(Statistics::new()),
        );

        assert_eq!(collect(&mut it), vec!["a1", "a2", "a3", "a4", "a5"]);
        assert!(it.error().is_none());
        // Pages of two, two, one, then the empty page.
        assert_eq!(client.scan_calls(), 4);
    }

    #[test]
    fn test_cancel_stops_later_pages() {
        let client = client_with(&[("a1", "x"), ("a2", "y"), ("a3", "z")]);
        let (ctx, cancel) = CallContext::background().cancellable();
        let mut it = iter(&client, "a", "", 1).with_context(ctx);

        assert!(it.next());
        assert_eq!(it.key(), b"a1");

        cancel.cancel();
        assert!(!it.next());
        assert_eq!(it.error().map(Status::code), Some(&crate::util::Code::Aborted));
    }

    #[test]
    fn test_caller_deadline_spans_all_pages() {
        let client = client_with(&[("a1", "x"), ("a2", "y")]);
        let deadline = std::time::Instant::now() + Duration::from_millis(20);
        let mut it = iter(&client, "a", "", 1).with_context(CallContext::with_deadline(deadline));

        assert!(it.next());
        std::thread::sleep(Duration::from_millis(30));
        assert!(!it.next());
        assert!(it.error().is_some_and(Status::is_timed_out));
    }

    #[test]
    fn test_full_page_then_empty_page() {
        let client = client_with(&[("a1", "x"), ("a2", "y")]);
        let mut it = iter(&client, "a", "", 2);
        assert_eq!(collect(&mut it), vec!["a1", "a2"]);
        assert_eq!(client.scan_calls(), 2);
    }

    #[test]
    fn test_scan_error_is_sticky() {
        let client = client_with(&[("a1", "x"), ("a2", "y"), ("a3", "z")]);
        let mut it = iter(&client, "a", "", 2);

        assert!(it.next());
        assert!(it.next());
        client
            .failpoints()
            .arm(FailPoint::Scan, Status::io_error("region unavailable"));
        assert!(!it.next());
        assert_eq!(it.error().and_then(Status::message), Some("region unavailable"));
        assert_eq!(it.key(), b"");

        // The failpoint has fired; the iterator must not retry on its own.
        assert!(!it.next());
        assert!(it.error().is_some());
    }

    #[test]
    fn test_release_is_idempotent() {
        let client = client_with(&[("a1", "x"), ("a2", "y")]);
        let mut it = iter(&client, "a", "", 128);
        assert!(it.next());
        it.release();
        assert_eq!(it.key(), b"");
        assert!(!it.next());
        it.release();
        assert!(it.error().is_none());
    }

    #[test]
    fn test_sees_writes_between_pages() {
        let client = client_with(&[("a1", "x"), ("a2", "y")]);
        let mut it = iter(&client, "a", "", 1);
        assert!(it.next());
        assert_eq!(it.key(), b"a1");

        client
            .put(&CallContext::background(), b"a15", b"new")
            .unwrap();
        assert_eq!(collect(&mut it), vec!["a15", "a2"]);
    }
}
