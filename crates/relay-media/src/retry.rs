//! Bounded retry with a fixed delay and an overall deadline.
//!
//! The first attempt runs immediately; later attempts wait `delay` first.
//! The deadline covers every attempt and every delay: once it passes, the
//! in-flight attempt is dropped (cancelling its I/O) and no further attempt
//! is made, however many remain.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, warn};

/// Attempt budget and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause before every attempt after the first.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// All attempts failed.
    Exhausted { attempts: u32, last: E },
    /// The deadline fired first.
    TimedOut { attempts: u32, last: Option<E> },
}

impl<E> RetryError<E> {
    /// Attempts started before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Run `op` until it succeeds, the attempts run out, or `deadline` passes.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_until<T, E, F, Fut>(
    policy: RetryPolicy,
    deadline: Instant,
    mut op: F,
) -> std::result::Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0u32;
    let mut last: Option<E> = None;

    let run = async {
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                debug!(attempt, max_attempts, "Retrying after delay");
                sleep(policy.delay).await;
            }
            attempts = attempt;

            match op(attempt).await {
                Ok(value) => return Some(value),
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Attempt failed");
                    last = Some(e);
                }
            }
        }
        None
    };

    match timeout_at(deadline, run).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => match last {
            Some(last) => Err(RetryError::Exhausted { attempts, last }),
            // max_attempts >= 1, so a failed run always recorded an error
            None => Err(RetryError::TimedOut {
                attempts,
                last: None,
            }),
        },
        Err(_) => Err(RetryError::TimedOut { attempts, last }),
    }
}
