/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use std::thread;
use std::time::{Duration, Instant};

use cache::CacheError;

/// Pause between two acquisition attempts.
///
/// The pause doubles per failed attempt, starting at `initial` and capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
}

impl Backoff {
    /// Tight polling, attempts follow each other without pausing
    pub const fn none() -> Self {
        Self { initial: Duration::ZERO, max: Duration::ZERO }
    }

    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self { initial, max: max.max(initial) }
    }

    /// Pause after the given (1-based) failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.initial.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(Duration::from_millis(1), Duration::from_millis(10))
    }
}

/// Budget for one acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub backoff: Backoff,
}

/// How an acquisition loop ended
#[derive(Debug)]
pub enum Acquisition {
    Acquired { attempts: u32, elapsed: Duration },
    TimedOut { attempts: u32, elapsed: Duration },
    /// The backend failed; no further attempt was made
    Failed(CacheError),
}

impl Acquisition {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Acquisition::Acquired { .. })
    }
}

/// Repeats `attempt` until it reports success, fails, or `policy.timeout` has elapsed.
///
/// The first attempt always runs. The loop never sleeps past the remaining budget by
/// more than a millisecond, so it returns within the timeout plus one attempt's duration.
pub fn acquire_with_retry<F>(policy: &RetryPolicy, mut attempt: F) -> Acquisition
where
    F: FnMut() -> cache::Result<bool>,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        let elapsed = start.elapsed();
        if elapsed > policy.timeout {
            return Acquisition::TimedOut { attempts, elapsed };
        }

        attempts += 1;
        match attempt() {
            Ok(true) => return Acquisition::Acquired { attempts, elapsed: start.elapsed() },
            Ok(false) => {}
            Err(e) => return Acquisition::Failed(e),
        }

        let remaining = policy.timeout.saturating_sub(start.elapsed());
        let pause = policy.backoff.delay(attempts).min(remaining + Duration::from_millis(1));
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }
}
