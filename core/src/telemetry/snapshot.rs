//! telemetry/snapshot.rs
//! Immutable telemetry returned from save and extract.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub files: u64,
    pub chunks: u64,
    pub bytes_plaintext: u64,
    pub bytes_compressed: u64,
    pub bytes_stored: u64,
    pub bytes_overhead: u64,
    pub codec_usage: BTreeMap<u16, u64>,
    pub embedding_failures: u64,
    /// `bytes_compressed / bytes_plaintext`; 0 when nothing was read.
    pub compression_ratio: f64,
    pub throughput_plaintext_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();

        let compression_ratio = if counters.bytes_plaintext > 0 {
            counters.bytes_compressed as f64 / counters.bytes_plaintext as f64
        } else {
            0.0
        };

        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_plaintext as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            files: counters.files,
            chunks: counters.chunks,
            bytes_plaintext: counters.bytes_plaintext,
            bytes_compressed: counters.bytes_compressed,
            bytes_stored: counters.bytes_stored,
            bytes_overhead: counters.bytes_overhead,
            codec_usage: counters.codec_usage.clone(),
            embedding_failures: counters.embedding_failures,
            compression_ratio,
            throughput_plaintext_bytes_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
        }
    }

    /// Bytes of the container file (chunk blocks plus overhead).
    pub fn output_bytes(&self) -> u64 {
        self.bytes_stored + self.bytes_overhead
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
