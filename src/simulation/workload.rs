//! Workload bookkeeping

use crate::error::ClusterError;
use crate::WriteOutcome;

/// Key used for the `index`-th slot of the workload key space
pub fn workload_key(index: usize) -> String {
    format!("key{:04}", index)
}

/// Counters over requests issued by the simulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkloadStats {
    pub writes_committed: usize,
    pub writes_failed: usize,
    pub reads_found: usize,
    pub reads_missed: usize,
}

impl WorkloadStats {
    pub fn record_write(&mut self, result: &Result<WriteOutcome, ClusterError>) {
        match result {
            Ok(_) => self.writes_committed += 1,
            Err(_) => self.writes_failed += 1,
        }
    }

    pub fn record_read(&mut self, result: &Result<String, ClusterError>) {
        match result {
            Ok(_) => self.reads_found += 1,
            Err(_) => self.reads_missed += 1,
        }
    }

    pub fn writes(&self) -> usize {
        self.writes_committed + self.writes_failed
    }

    pub fn reads(&self) -> usize {
        self.reads_found + self.reads_missed
    }

    /// Share of writes that reached quorum, 1.0 when nothing was written
    pub fn commit_rate(&self) -> f64 {
        if self.writes() == 0 {
            return 1.0;
        }
        self.writes_committed as f64 / self.writes() as f64
    }

    /// Counters accumulated since `earlier`
    pub fn since(&self, earlier: &WorkloadStats) -> WorkloadStats {
        WorkloadStats {
            writes_committed: self.writes_committed - earlier.writes_committed,
            writes_failed: self.writes_failed - earlier.writes_failed,
            reads_found: self.reads_found - earlier.reads_found,
            reads_missed: self.reads_missed - earlier.reads_missed,
        }
    }
}
