use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::util::{CallContext, Result, Status};

/// Largest page a raw scan may request.
pub const MAX_SCAN_LIMIT: usize = 10240;

/// How the store talks to the remote service. Chosen once when the
/// [`Database`](crate::Database) is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Direct point and batch calls, no transaction wrapping.
    #[default]
    Raw,
    /// Every read and write runs inside a snapshot-isolated transaction.
    Txn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    pub mode: BackendMode,
    /// Placement-driver endpoints of the remote cluster.
    pub endpoints: Vec<String>,
    /// Name used to tag log events and the statistics report.
    pub namespace: String,
    /// Entries requested per page by the paginated iterator.
    pub scan_limit: usize,
    /// Per-call timeout in milliseconds; unset means no deadline.
    pub call_timeout_ms: Option<u64>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            mode: BackendMode::Raw,
            endpoints: vec!["127.0.0.1:2379".to_string()],
            namespace: String::new(),
            scan_limit: 128,
            call_timeout_ms: None,
        }
    }
}

impl StoreOptions {
    pub fn raw() -> Self {
        StoreOptions::default()
    }

    pub fn txn() -> Self {
        StoreOptions {
            mode: BackendMode::Txn,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: StoreOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Status::io_error(format!(
                "Failed to read options file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan_limit == 0 {
            return Err(Status::invalid_argument("scan_limit must be positive"));
        }
        if self.scan_limit > MAX_SCAN_LIMIT {
            return Err(Status::invalid_argument(format!(
                "scan_limit {} exceeds maximum {MAX_SCAN_LIMIT}",
                self.scan_limit
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Fresh context for one remote call.
    #[inline]
    pub fn call_context(&self) -> CallContext {
        CallContext::from_timeout(self.call_timeout())
    }
}
