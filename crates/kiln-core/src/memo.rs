//! Memoized slots that join in-flight computations.
//!
//! A [`Memo`] starts at most one computation at a time. Callers that arrive
//! while it runs await the same shared future instead of starting another
//! one, and everyone receives the same value or error.

use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Shared handle to an in-flight computation.
pub type SharedResult<T> = Shared<BoxFuture<'static, Result<T>>>;

/// What a slot does with a failed computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Forget the failure; the next caller starts a fresh computation.
    #[default]
    Retry,
    /// Keep the failure; every later caller receives the same error.
    Cache,
}

enum State<T> {
    Vacant,
    InFlight(SharedResult<T>),
    Ready(T),
    Failed(Error),
}

/// Non-starting view of a slot.
pub enum Snapshot<T> {
    Vacant,
    InFlight(SharedResult<T>),
    Ready(Result<T>),
}

pub struct Memo<T> {
    state: Mutex<State<T>>,
    policy: FailurePolicy,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            state: Mutex::new(State::Vacant),
            policy,
        }
    }

    /// Inspect the slot without starting anything.
    pub fn snapshot(&self) -> Snapshot<T> {
        match &*self.lock() {
            State::Vacant => Snapshot::Vacant,
            State::InFlight(fut) => Snapshot::InFlight(fut.clone()),
            State::Ready(value) => Snapshot::Ready(Ok(value.clone())),
            State::Failed(err) => Snapshot::Ready(Err(err.clone())),
        }
    }

    /// The memoized value, if the slot has resolved successfully.
    pub fn get(&self) -> Option<T> {
        match &*self.lock() {
            State::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Return the memoized value, join the in-flight computation, or start
    /// `init` if the slot is vacant.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let pending = {
            let mut state = self.lock();
            match &*state {
                State::Ready(value) => return Ok(value.clone()),
                State::Failed(err) => return Err(err.clone()),
                State::InFlight(fut) => fut.clone(),
                State::Vacant => {
                    let fut = init().boxed().shared();
                    *state = State::InFlight(fut.clone());
                    fut
                }
            }
        };

        let outcome = pending.clone().await;
        self.settle(&pending, &outcome);
        outcome
    }

    /// Store a value, replacing whatever the slot held.
    pub fn set(&self, value: T) {
        *self.lock() = State::Ready(value);
    }

    /// Drop any memoized value or failure. An in-flight computation keeps
    /// running for the callers already awaiting it.
    pub fn clear(&self) {
        *self.lock() = State::Vacant;
    }

    fn settle(&self, pending: &SharedResult<T>, outcome: &Result<T>) {
        let mut state = self.lock();
        let current = match &*state {
            State::InFlight(fut) => fut.ptr_eq(pending),
            _ => false,
        };
        // Someone else already settled, replaced, or cleared the slot.
        if !current {
            return;
        }
        *state = match (outcome, self.policy) {
            (Ok(value), _) => State::Ready(value.clone()),
            (Err(err), FailurePolicy::Cache) => State::Failed(err.clone()),
            (Err(_), FailurePolicy::Retry) => State::Vacant,
        };
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(FailurePolicy::default())
    }
}

impl<T> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            State::Vacant => "vacant",
            State::InFlight(_) => "in-flight",
            State::Ready(_) => "ready",
            State::Failed(_) => "failed",
        };
        f.debug_struct("Memo")
            .field("state", &state)
            .field("policy", &self.policy)
            .finish()
    }
}
