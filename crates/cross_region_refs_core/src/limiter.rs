//! Bounded fan-out for independent asynchronous operations.
//!
//! Every call to [`ConcurrencyLimiter::run`] enqueues one operation and hands
//! back a future for its outcome. Nothing starts inside `run`: an operation
//! is admitted when its future is polled, it sits at the front of the queue,
//! and fewer than `limit` operations are running. A finished, failed, or
//! dropped operation frees its slot and wakes the next queued one.
//!
//! Build one limiter per invocation. The queue and counter are shared between
//! clones of the same limiter, never between limiters.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::Notify;

pub const UNBOUNDED_LITERAL: &str = "unbounded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyLimit {
    Bounded(NonZeroUsize),
    Unbounded,
}

impl ConcurrencyLimit {
    pub fn bounded(limit: usize) -> Result<Self, LimiterError> {
        NonZeroUsize::new(limit)
            .map(Self::Bounded)
            .ok_or_else(|| LimiterError::InvalidConfiguration {
                value: limit.to_string(),
            })
    }

    fn admits(self, active: usize) -> bool {
        match self {
            Self::Bounded(limit) => active < limit.get(),
            Self::Unbounded => true,
        }
    }
}

impl FromStr for ConcurrencyLimit {
    type Err = LimiterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case(UNBOUNDED_LITERAL) {
            return Ok(Self::Unbounded);
        }

        trimmed
            .parse::<usize>()
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self::Bounded)
            .ok_or_else(|| LimiterError::InvalidConfiguration {
                value: value.to_string(),
            })
    }
}

impl fmt::Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(limit) => write!(f, "{limit}"),
            Self::Unbounded => f.write_str(UNBOUNDED_LITERAL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimiterError {
    #[error("concurrency limit must be a positive integer or `unbounded`, got `{value}`")]
    InvalidConfiguration { value: String },
    #[error("queued operation was discarded before it started")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    limit: ConcurrencyLimit,
    state: Mutex<QueueState>,
}

#[derive(Debug, Default)]
struct QueueState {
    active: usize,
    next_ticket: u64,
    waiting: VecDeque<Waiter>,
}

#[derive(Debug)]
struct Waiter {
    ticket: u64,
    wake: Arc<Notify>,
}

enum Admission {
    Started,
    Waiting,
    Discarded,
}

/// Place in the queue held by a submitted operation until it starts.
/// Dropping it while still queued removes the operation from the queue.
#[derive(Debug)]
struct QueuedTicket {
    shared: Arc<Shared>,
    ticket: u64,
    wake: Arc<Notify>,
    queued: bool,
}

/// Held while an operation runs. Dropping it releases the slot.
#[derive(Debug)]
struct ActiveSlot {
    shared: Arc<Shared>,
}

impl ConcurrencyLimiter {
    pub fn new(limit: usize) -> Result<Self, LimiterError> {
        Ok(Self::with_limit(ConcurrencyLimit::bounded(limit)?))
    }

    pub fn unbounded() -> Self {
        Self::with_limit(ConcurrencyLimit::Unbounded)
    }

    pub fn with_limit(limit: ConcurrencyLimit) -> Self {
        Self {
            shared: Arc::new(Shared {
                limit,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn limit(&self) -> ConcurrencyLimit {
        self.shared.limit
    }

    /// Operations that have started and not yet finished.
    pub fn active_count(&self) -> usize {
        self.shared.lock().active
    }

    /// Operations still waiting to start.
    pub fn pending_count(&self) -> usize {
        self.shared.lock().waiting.len()
    }

    /// Discards every operation that has not started yet. Their futures
    /// resolve to [`LimiterError::Cancelled`] and their operations never run.
    /// Returns how many were discarded.
    pub fn clear_queue(&self) -> usize {
        let discarded: Vec<Waiter> = self.shared.lock().waiting.drain(..).collect();
        for waiter in &discarded {
            waiter.wake.notify_one();
        }
        discarded.len()
    }

    /// Enqueues `operation` and returns a future for its output.
    ///
    /// Submission happens when `run` is called, so calling `run` in a loop
    /// fixes the start order. The operation is invoked only once the returned
    /// future is polled and every operation submitted before it has started
    /// or been discarded; a queued future that is never polled holds back
    /// the ones behind it until it is dropped.
    pub fn run<F, Fut, T>(&self, operation: F) -> impl Future<Output = Result<T, LimiterError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = self.shared.enqueue();

        async move {
            let slot = ticket.admitted().await?;
            let output = operation().await;
            drop(slot);
            Ok(output)
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(self: &Arc<Self>) -> QueuedTicket {
        let wake = Arc::new(Notify::new());
        let mut state = self.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiting.push_back(Waiter {
            ticket,
            wake: Arc::clone(&wake),
        });

        QueuedTicket {
            shared: Arc::clone(self),
            ticket,
            wake,
            queued: true,
        }
    }

    fn try_admit(&self, ticket: u64) -> Admission {
        let mut state = self.lock();
        let position = state
            .waiting
            .iter()
            .position(|waiter| waiter.ticket == ticket);
        match position {
            None => Admission::Discarded,
            Some(0) if self.limit.admits(state.active) => {
                state.waiting.pop_front();
                state.active += 1;
                Self::wake_front(&state, self.limit);
                Admission::Started
            }
            Some(_) => Admission::Waiting,
        }
    }

    fn wake_front(state: &QueueState, limit: ConcurrencyLimit) {
        if !limit.admits(state.active) {
            return;
        }
        if let Some(front) = state.waiting.front() {
            front.wake.notify_one();
        }
    }
}

impl QueuedTicket {
    async fn admitted(mut self) -> Result<ActiveSlot, LimiterError> {
        loop {
            match self.shared.try_admit(self.ticket) {
                Admission::Started => {
                    self.queued = false;
                    return Ok(ActiveSlot {
                        shared: Arc::clone(&self.shared),
                    });
                }
                Admission::Discarded => {
                    self.queued = false;
                    return Err(LimiterError::Cancelled);
                }
                Admission::Waiting => self.wake.notified().await,
            }
        }
    }
}

impl Drop for QueuedTicket {
    fn drop(&mut self) {
        if !self.queued {
            return;
        }
        let mut state = self.shared.lock();
        state.waiting.retain(|waiter| waiter.ticket != self.ticket);
        Shared::wake_front(&state, self.shared.limit);
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.active -= 1;
        Shared::wake_front(&state, self.shared.limit);
    }
}
