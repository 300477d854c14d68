use std::collections::HashMap;

use parking_lot::Mutex;

use crate::util::{Result, Status};

/// Remote operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Get,
    Put,
    Delete,
    BatchPut,
    BatchDelete,
    Scan,
    Begin,
    Commit,
    OpenCursor,
    CursorNext,
}

struct Armed {
    skip: usize,
    status: Status,
}

/// One-shot error injection for the in-memory clients.
#[derive(Default)]
pub struct FailPoints {
    armed: Mutex<HashMap<FailPoint, Armed>>,
}

impl FailPoints {
    pub fn new() -> Self {
        FailPoints::default()
    }

    /// Fails the next call through `point` with `status`.
    pub fn arm(&self, point: FailPoint, status: Status) {
        self.arm_after(point, 0, status);
    }

    /// Lets `skip` calls through `point` succeed, then fails the next one.
    pub fn arm_after(&self, point: FailPoint, skip: usize, status: Status) {
        self.armed.lock().insert(point, Armed { skip, status });
    }

    pub fn disarm(&self, point: FailPoint) {
        self.armed.lock().remove(&point);
    }

    pub fn check(&self, point: FailPoint) -> Result<()> {
        let mut armed = self.armed.lock();
        let Some(entry) = armed.get_mut(&point) else {
            return Ok(());
        };
        if entry.skip > 0 {
            entry.skip -= 1;
            return Ok(());
        }
        let entry = armed.remove(&point);
        match entry {
            Some(entry) => Err(entry.status),
            None => Ok(()),
        }
    }
}
