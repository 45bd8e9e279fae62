//! Per-key coalescing of origin fills.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::cache::ResourceKey;
use crate::error::Result;

type Call<T> = Arc<OnceCell<Result<T>>>;

// == Single Flight ==
/// Lets only one fill per key run at a time; concurrent callers for the
/// same key wait for and share its outcome.
///
/// The map is behind a synchronous mutex that is never held across an
/// await, so a finished call is always unregistered in the same poll that
/// completed it and no later caller can pick up its outcome.
#[derive(Debug)]
pub struct SingleFlight<T> {
    calls: Mutex<HashMap<ResourceKey, Call<T>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` unless a call for `key` is already in flight, in which
    /// case its result is awaited instead.
    ///
    /// If the running caller is cancelled, one of the waiters runs its own
    /// `work` in its place.
    pub async fn run<F, Fut>(&self, key: &ResourceKey, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let call = self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let outcome = call.get_or_init(work).await.clone();
        self.forget(key, &call);
        outcome
    }

    fn forget(&self, key: &ResourceKey, call: &Call<T>) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        if calls.get(key).is_some_and(|current| Arc::ptr_eq(current, call)) {
            calls.remove(key);
        }
    }

    /// Number of keys with a call in flight.
    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
