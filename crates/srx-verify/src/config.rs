//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use srx_core::normalize::{NUMERIC_TOL_ABS, NUMERIC_TOL_REL};
use std::env;
use std::time::Duration;

/// Retry behavior for agent calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub base_delay_ms: u64,
    /// Ceiling on the per-attempt delay.
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay before the retry following attempt `attempt` (1-based), jitter excluded.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let millis = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(millis)
    }
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Configuration for the verification pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Model used for the extraction (driver) agent.
    pub driver_model: String,

    /// Model used for the verifier agent.
    pub verifier_model: String,

    /// Model used for cross-driver adjudication.
    pub adjudicator_model: String,

    /// Decisions per verifier chunk.
    pub chunk_size: usize,

    /// Absolute tolerance for numeric comparison.
    pub abs_tol: f64,

    /// Relative tolerance for numeric comparison.
    pub rel_tol: f64,

    /// Character cap on the condensed document view sent to agents.
    pub max_view_chars: usize,

    /// Whether cross-driver mismatches go to the adjudicator.
    pub adjudication_enabled: bool,

    /// Retry behavior for agent calls.
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    /// Create configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SRX_DRIVER_MODEL`: driver model (default: "gpt-4o")
    /// - `SRX_VERIFIER_MODEL`: verifier model (default: "gpt-4o")
    /// - `SRX_ADJUDICATOR_MODEL`: adjudicator model (default: "gpt-4o")
    /// - `SRX_CHUNK_SIZE`: decisions per verifier chunk (default: 24)
    /// - `SRX_MAX_VIEW_CHARS`: document view cap (default: 60000)
    /// - `SRX_ADJUDICATE`: enable adjudication (default: true)
    #[must_use = "creates config from environment variables"]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let driver_model =
            env::var("SRX_DRIVER_MODEL").unwrap_or(defaults.driver_model);
        let verifier_model =
            env::var("SRX_VERIFIER_MODEL").unwrap_or(defaults.verifier_model);
        let adjudicator_model =
            env::var("SRX_ADJUDICATOR_MODEL").unwrap_or(defaults.adjudicator_model);

        let chunk_size = env::var("SRX_CHUNK_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.chunk_size);

        let max_view_chars = env::var("SRX_MAX_VIEW_CHARS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_view_chars);

        let adjudication_enabled = env::var("SRX_ADJUDICATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.adjudication_enabled);

        Self {
            driver_model,
            verifier_model,
            adjudicator_model,
            chunk_size,
            abs_tol: defaults.abs_tol,
            rel_tol: defaults.rel_tol,
            max_view_chars,
            adjudication_enabled,
            retry: defaults.retry,
        }
    }
}

impl Default for PipelineConfig {
    #[inline]
    fn default() -> Self {
        Self {
            driver_model: "gpt-4o".to_string(),
            verifier_model: "gpt-4o".to_string(),
            adjudicator_model: "gpt-4o".to_string(),
            chunk_size: 24,
            abs_tol: NUMERIC_TOL_ABS,
            rel_tol: NUMERIC_TOL_REL,
            max_view_chars: 60_000,
            adjudication_enabled: true,
            retry: RetryPolicy::default(),
        }
    }
}
