//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the streaming byte converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Bytes read, transformed and written per chunk.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// A synthetic data error is injected with probability `1 / failure_one_in`
    /// per chunk. Zero disables fault injection.
    #[serde(default = "default_failure_one_in")]
    pub failure_one_in: u32,

    /// Lower bound of the per-chunk pacing delay.
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the per-chunk pacing delay.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Whether to delete the partial output of a failed or cancelled conversion.
    #[serde(default = "default_remove_partial_output")]
    pub remove_partial_output: bool,
}

fn default_buffer_size() -> usize {
    1024
}

fn default_failure_one_in() -> u32 {
    10_000
}

fn default_min_delay() -> u64 {
    1
}

fn default_max_delay() -> u64 {
    10
}

fn default_remove_partial_output() -> bool {
    true
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            failure_one_in: default_failure_one_in(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            remove_partial_output: default_remove_partial_output(),
        }
    }
}

impl ConverterConfig {
    /// Sets the chunk size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Sets the fault injection rate (0 disables it).
    pub fn with_failure_one_in(mut self, failure_one_in: u32) -> Self {
        self.failure_one_in = failure_one_in;
        self
    }

    /// Disables fault injection.
    pub fn without_fault_injection(self) -> Self {
        self.with_failure_one_in(0)
    }

    /// Sets the pacing delay bounds in milliseconds.
    pub fn with_delay_ms(mut self, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.min_delay_ms = min_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Sets whether partial output is removed on failure or cancel.
    pub fn with_remove_partial_output(mut self, remove: bool) -> Self {
        self.remove_partial_output = remove;
        self
    }

    /// Pacing bounds, or `None` when both bounds are zero.
    pub fn pacing(&self) -> Option<(Duration, Duration)> {
        if self.max_delay_ms == 0 {
            return None;
        }
        let min = self.min_delay_ms.min(self.max_delay_ms);
        Some((
            Duration::from_millis(min),
            Duration::from_millis(self.max_delay_ms),
        ))
    }
}
