// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Bounded retry for idempotent remote calls
//!
//! Only errors that report themselves as transient are retried. After the
//! last attempt the final error is returned unchanged so callers can still
//! classify it.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RestClientError;

/// Delay between attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum WaitStrategy {
    Fixed {
        delay: Duration,
    },
    Exponential {
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    },
}

/// How many times an operation may run and how long to wait in between
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub wait: WaitStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn exponential(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            wait: WaitStrategy::Exponential {
                initial_delay,
                multiplier: 2.0,
                max_delay: Duration::from_secs(30),
            },
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            wait: WaitStrategy::Fixed { delay },
        }
    }

    /// Single attempt
    pub fn none() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Wait before attempt `attempt + 1`, where `attempt` starts at 1
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match &self.wait {
            WaitStrategy::Fixed { delay } => *delay,
            WaitStrategy::Exponential {
                initial_delay,
                multiplier,
                max_delay,
            } => {
                let exp = attempt.saturating_sub(1).min(32) as i32;
                let secs = initial_delay.as_secs_f64() * multiplier.powi(exp);
                Duration::from_secs_f64(secs.min(max_delay.as_secs_f64()))
            }
        }
    }
}

/// Errors that know whether repeating the call could help
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

impl Retryable for RestClientError {
    fn is_transient(&self) -> bool {
        RestClientError::is_transient(self)
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_transient() {
                    tracing::warn!(operation, attempt, error = %err, "giving up after retries");
                }
                return Err(err);
            }
        }
    }
}
