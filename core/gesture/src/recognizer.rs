//! Covert tap-sequence recognizer.
//!
//! Taps arrive one at a time from the disguised input surface. The
//! recognizer keeps a short, bounded history and reports whether the most
//! recent taps complete one of the configured unlock sequences. Unrelated
//! taps simply age out, so incidental interaction does not have to be
//! avoided. Repeated non-matching taps lock the recognizer out for the
//! configured window.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{GestureConfig, TapSequence, TapTarget};
use hushvault_common::{Clock, Error, Result, SystemClock};

/// What a single tap led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// The recent taps completed the sequence at `index`.
    Matched { index: usize, name: String },
    /// The recent taps are a proper prefix of a sequence.
    Accumulating { progress: usize, needed: usize },
    /// The taps match nothing.
    NoMatch { failed_attempts: u32 },
    /// The taps match nothing, and stale taps were evicted by this one.
    Expired { failed_attempts: u32 },
    /// Locked out; the tap was ignored.
    RateLimited { retry_after: Duration },
}

impl TapOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    /// Turn a lockout into an error, passing every other outcome through.
    pub fn into_result(self) -> Result<Self> {
        match self {
            Self::RateLimited { retry_after } => Err(Error::RateLimited {
                retry_after_secs: retry_after.as_secs(),
            }),
            other => Ok(other),
        }
    }
}

/// Coarse recognizer state for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerState {
    Idle,
    Accumulating,
    RateLimited,
}

/// Read-only copy of the recognizer's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureSnapshot {
    pub state: RecognizerState,
    pub buffered_taps: usize,
    pub failed_attempts: u32,
    pub retry_after: Option<Duration>,
}

#[derive(Debug)]
struct Tap {
    target: TapTarget,
    at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct TapState {
    buffer: VecDeque<Tap>,
    failed_attempts: u32,
    window_started: Option<DateTime<Utc>>,
    locked_at: Option<DateTime<Utc>>,
}

impl TapState {
    fn clear_failures(&mut self) {
        self.failed_attempts = 0;
        self.window_started = None;
        self.locked_at = None;
    }
}

/// Matches incoming taps against the configured sequences.
///
/// The tap buffer and the failure counter sit behind one mutex, so taps
/// delivered from several threads are evaluated one at a time.
pub struct GestureRecognizer {
    config: GestureConfig,
    timeout: chrono::Duration,
    window: chrono::Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<TapState>,
}

impl GestureRecognizer {
    /// Create a recognizer reading the system clock.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the configuration does not validate.
    pub fn new(config: GestureConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a recognizer with a custom time source.
    pub fn with_clock(config: GestureConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let timeout = chrono::Duration::from_std(config.sequence_timeout)
            .map_err(|_| Error::InvalidInput("sequence_timeout is too large".to_string()))?;
        let window = chrono::Duration::from_std(config.rate_limit_window)
            .map_err(|_| Error::InvalidInput("rate_limit_window is too large".to_string()))?;

        Ok(Self {
            config,
            timeout,
            window,
            clock,
            state: Mutex::new(TapState::default()),
        })
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Feed one tap.
    ///
    /// # Postconditions
    /// - While locked out, nothing is recorded
    /// - The buffer never holds taps older than the sequence timeout, nor
    ///   more than the buffer capacity
    /// - A match clears the buffer and the failure counter
    /// - A tap that neither matches nor extends a sequence prefix counts as
    ///   exactly one failed attempt
    pub fn record_tap(&self, target: impl Into<TapTarget>) -> TapOutcome {
        let target = target.into();
        let now = self.clock.now();
        let mut state = self.state.lock();

        if let Some(locked_at) = state.locked_at {
            let elapsed = now - locked_at;
            if elapsed < self.window {
                let retry_after = (self.window - elapsed).to_std().unwrap_or(Duration::ZERO);
                debug!(retry_after_secs = retry_after.as_secs(), "Tap ignored, rate limited");
                return TapOutcome::RateLimited { retry_after };
            }
            info!("Gesture lockout expired");
            state.clear_failures();
        }

        if let Some(started) = state.window_started {
            if now - started >= self.window {
                state.clear_failures();
            }
        }

        state.buffer.push_back(Tap { target, at: now });

        let before = state.buffer.len();
        while let Some(oldest) = state.buffer.front() {
            if now - oldest.at > self.timeout {
                state.buffer.pop_front();
            } else {
                break;
            }
        }
        let evicted = state.buffer.len() < before;

        while state.buffer.len() > self.config.buffer_capacity {
            state.buffer.pop_front();
        }

        if let Some((index, sequence)) = self.find_match(&state.buffer) {
            state.buffer.clear();
            state.clear_failures();
            info!(sequence = %sequence.name, "Gesture matched");
            return TapOutcome::Matched {
                index,
                name: sequence.name.clone(),
            };
        }

        if let Some((progress, needed)) = self.prefix_progress(&state.buffer) {
            return TapOutcome::Accumulating { progress, needed };
        }

        state.failed_attempts += 1;
        if state.window_started.is_none() {
            state.window_started = Some(now);
        }
        let failed_attempts = state.failed_attempts;

        if failed_attempts >= self.config.max_failed_attempts {
            state.locked_at = Some(now);
            warn!(failed_attempts, "Gesture recognizer locked out");
        } else {
            debug!(failed_attempts, evicted, "Tap did not match");
        }

        if evicted {
            TapOutcome::Expired { failed_attempts }
        } else {
            TapOutcome::NoMatch { failed_attempts }
        }
    }

    pub fn snapshot(&self) -> GestureSnapshot {
        let now = self.clock.now();
        let state = self.state.lock();

        let retry_after = state.locked_at.and_then(|locked_at| {
            let elapsed = now - locked_at;
            (elapsed < self.window)
                .then(|| (self.window - elapsed).to_std().unwrap_or(Duration::ZERO))
        });
        let buffered_taps = state
            .buffer
            .iter()
            .filter(|tap| now - tap.at <= self.timeout)
            .count();

        let recognizer_state = if retry_after.is_some() {
            RecognizerState::RateLimited
        } else if buffered_taps > 0 {
            RecognizerState::Accumulating
        } else {
            RecognizerState::Idle
        };

        GestureSnapshot {
            state: recognizer_state,
            buffered_taps,
            failed_attempts: state.failed_attempts,
            retry_after,
        }
    }

    /// Forget all taps and failures, lifting any lockout.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.buffer.clear();
        state.clear_failures();
        debug!("Gesture recognizer reset");
    }

    fn find_match(&self, buffer: &VecDeque<Tap>) -> Option<(usize, &TapSequence)> {
        self.config
            .sequences
            .iter()
            .enumerate()
            .find(|(_, sequence)| {
                let k = sequence.len();
                if buffer.len() < k {
                    return false;
                }
                let tail = buffer.range(buffer.len() - k..);
                let targets_match = tail
                    .zip(&sequence.targets)
                    .all(|(tap, target)| &tap.target == target);
                if !targets_match {
                    return false;
                }
                let first = &buffer[buffer.len() - k];
                let last = &buffer[buffer.len() - 1];
                last.at - first.at <= self.timeout
            })
    }

    /// Longest proper prefix of any sequence that the buffer currently ends
    /// with, as (taps so far, sequence length).
    fn prefix_progress(&self, buffer: &VecDeque<Tap>) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;

        for sequence in &self.config.sequences {
            let k = sequence.len();
            for j in (1..k).rev() {
                if buffer.len() < j {
                    continue;
                }
                let tail = buffer.range(buffer.len() - j..);
                if tail
                    .zip(&sequence.targets[..j])
                    .all(|(tap, target)| &tap.target == target)
                {
                    if best.map_or(true, |(progress, _)| j > progress) {
                        best = Some((j, k));
                    }
                    break;
                }
            }
        }

        best
    }
}
