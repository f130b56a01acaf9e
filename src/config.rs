use serde::{Deserialize, Serialize};

/// Tuning knobs for batch classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Allow rayon to spread a batch across worker threads.
    pub parallel: bool,
    /// Minimum batch size before worker threads engage; smaller batches run
    /// on the calling thread.
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 256,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interactive test-bench batches: stay on the calling thread.
    pub fn interactive() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    /// Large offline batches: engage worker threads early.
    pub fn bulk() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 64,
        }
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold.max(1);
        self
    }
}
