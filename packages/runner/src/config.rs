use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    /// Wall-clock limit of a session. Default: 130.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    /// Characters of output (stdout, stderr and echoes) a session may
    /// receive before it is cut off. Default: 100000.
    #[serde(default = "default_output_budget")]
    pub output_budget: usize,
    /// Input lines that may wait for the previous line's echo. Default: 64.
    #[serde(default = "default_input_queue_capacity")]
    pub input_queue_capacity: usize,
}

fn default_session_timeout_secs() -> u64 {
    130
}
fn default_output_budget() -> usize {
    100_000
}
fn default_input_queue_capacity() -> usize {
    64
}

impl RunnerConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: default_session_timeout_secs(),
            output_budget: default_output_budget(),
            input_queue_capacity: default_input_queue_capacity(),
        }
    }
}
