//! Mock three-axis sensor for testing
//!
//! Supports a constant reading or a scripted sample sequence (repeated
//! cyclically), plus failure injection after a fixed number of reads.
//! The script queue is a fixed-capacity `heapless::Vec`, so the mock
//! stays usable on-target under the `mock` feature.

use crate::devices::traits::{RawSample, SensorError, ThreeAxisSensor};

/// Maximum scripted samples
const SCRIPT_CAPACITY: usize = 256;

/// Mock sensor implementing [`ThreeAxisSensor`].
#[derive(Debug)]
pub struct MockAxisSensor {
    script: heapless::Vec<RawSample, SCRIPT_CAPACITY>,
    cursor: usize,
    fail_after: Option<usize>,
    reads: usize,
    configured: bool,
    healthy: bool,
}

impl MockAxisSensor {
    /// Mock that returns the same sample on every read.
    pub fn constant(sample: RawSample) -> Self {
        Self::scripted(&[sample])
    }

    /// Mock that cycles through `samples` on successive reads.
    ///
    /// # Panics
    ///
    /// Panics if `samples` is empty or exceeds the script capacity; both
    /// indicate a broken test setup.
    pub fn scripted(samples: &[RawSample]) -> Self {
        assert!(!samples.is_empty(), "mock sensor needs at least one sample");
        let script = heapless::Vec::from_slice(samples).expect("mock script capacity exceeded");

        Self {
            script,
            cursor: 0,
            fail_after: None,
            reads: 0,
            configured: false,
            healthy: true,
        }
    }

    /// Make every read past the first `reads` fail with [`SensorError::Io`].
    pub fn fail_after(mut self, reads: usize) -> Self {
        self.fail_after = Some(reads);
        self
    }

    /// Number of successful reads so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Whether `configure` has been called.
    pub fn was_configured(&self) -> bool {
        self.configured
    }
}

impl ThreeAxisSensor for MockAxisSensor {
    async fn configure(&mut self) -> Result<(), SensorError> {
        self.configured = true;
        Ok(())
    }

    async fn read_axes(&mut self) -> Result<RawSample, SensorError> {
        if let Some(limit) = self.fail_after {
            if self.reads >= limit {
                self.healthy = false;
                return Err(SensorError::Io);
            }
        }

        let sample = self.script[self.cursor];
        self.cursor = (self.cursor + 1) % self.script.len();
        self.reads += 1;
        Ok(sample)
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }
}
