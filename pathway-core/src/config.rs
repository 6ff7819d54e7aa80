use std::time::Duration;

/// Configuration for the generation pipeline.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model identifier passed through to the provider with every request.
    pub model: String,
    /// Unconditional delay inserted between consecutive model calls.
    /// This is pacing against provider rate limits, not a retry mechanism.
    pub pacing: Duration,
    /// How many times a single model call is attempted before its stage gives up.
    pub max_tries: u32,
    /// Delay between attempts of a failed model call.
    pub retry_delay: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            pacing: Duration::from_secs(30),
            max_tries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl GenerationConfig {
    /// A config without pacing or retry delays, for tests.
    pub fn immediate(model: &str) -> Self {
        Self {
            model: model.to_string(),
            pacing: Duration::ZERO,
            max_tries: 1,
            retry_delay: Duration::ZERO,
        }
    }
}
