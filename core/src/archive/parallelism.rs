//! archive/parallelism.rs
//! Worker pool sizing for ingest and extraction.

use crate::constants::MAX_INFLIGHT_FILES;

/// Fraction of available memory the in-flight queue may claim.
pub const DEFAULT_MEM_FRACTION: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelismProfile {
    pub worker_count: usize,
    /// Queue depth between the feeder, the workers and the coordinator.
    pub inflight_files: usize,
}

impl Default for ParallelismProfile {
    fn default() -> Self {
        Self::single_threaded()
    }
}

impl ParallelismProfile {
    pub fn single_threaded() -> Self {
        Self {
            worker_count: 1,
            inflight_files: 1,
        }
    }

    /// Size the pool from the host: one core is left free (at least one
    /// worker), and the queue holds as many chunk buffers as a fraction of
    /// available memory allows, capped at `hard_cap`.
    pub fn dynamic(max_chunk_size: u64, mem_fraction: f64, hard_cap: usize) -> Self {
        let cores = num_cpus::get();
        let worker_count = cores.saturating_sub(1).max(1);

        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        let avail_bytes = sys.available_memory();

        let budget = (avail_bytes as f64 * mem_fraction) as u64;
        let max_files = budget / max_chunk_size.max(1);

        Self {
            worker_count,
            inflight_files: (max_files.min(hard_cap as u64) as usize).max(1),
        }
    }

    /// Host-sized profile with an optional worker override, never wider
    /// than the number of jobs.
    pub fn for_jobs(jobs: usize, chunk_size: usize, workers: Option<usize>) -> Self {
        let mut profile = Self::dynamic(chunk_size as u64, DEFAULT_MEM_FRACTION, MAX_INFLIGHT_FILES);
        if let Some(n) = workers {
            profile.worker_count = n.max(1);
        }
        profile.bounded_by(jobs)
    }

    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    pub fn bounded_by(mut self, jobs: usize) -> Self {
        self.worker_count = self.worker_count.min(jobs.max(1));
        self
    }
}
