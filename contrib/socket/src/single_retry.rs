//! `SingleRetryableOperation`: at-most-one in-flight attempt of an
//! operation shared by concurrent callers, with a from-scratch retry (not a
//! cached failure) on error.

use std::sync::Arc;

use tokio::sync::Mutex;

use remotecore::error::{Error, Result};

enum State<T> {
    Idle,
    InFlight(tokio::sync::broadcast::Sender<Result<T, String>>),
    Done(T),
}

/// Deduplicates concurrent callers of one fallible, cloneable-result async
/// operation. The first caller to arrive runs `make`; everyone who shows up
/// while it's in flight shares its result. On failure, the slot resets so
/// the *next* caller retries from scratch rather than replaying the
/// failure.
pub struct SingleRetryableOperation<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Clone + Send + 'static> Default for SingleRetryableOperation<T> {
    fn default() -> Self {
        SingleRetryableOperation { state: Arc::new(Mutex::new(State::Idle)) }
    }
}

impl<T: Clone + Send + 'static> SingleRetryableOperation<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `make` if this is the first caller (or the prior attempt
    /// failed); otherwise awaits the in-flight attempt's result.
    pub async fn get_or_init<F, Fut>(&self, make: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut guard = self.state.lock().await;

        match &*guard {
            State::Done(value) => return Ok(value.clone()),
            State::InFlight(tx) => {
                let mut rx = tx.subscribe();
                drop(guard);
                return match rx.recv().await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(message)) => Err(Error::ConcurrentInit(message)),
                    Err(_) => Err(Error::ConcurrentInit("the in-flight attempt was dropped before completing".into())),
                };
            }
            State::Idle => {}
        }

        let (tx, _rx) = tokio::sync::broadcast::channel(1);
        *guard = State::InFlight(tx.clone());
        drop(guard);

        let result = make().await;

        let mut guard = self.state.lock().await;
        match &result {
            Ok(value) => {
                *guard = State::Done(value.clone());
                let _ = tx.send(Ok(value.clone()));
            }
            Err(e) => {
                *guard = State::Idle;
                let _ = tx.send(Err(e.to_string()));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_callers_share_one_attempt() {
        let op = Arc::new(SingleRetryableOperation::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let op = op.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                op.get_or_init(|| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        Ok(42u32)
                    }
                }).await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failed_attempt_resets_for_the_next_caller() {
        let op = SingleRetryableOperation::<u32>::new();
        let calls = AtomicUsize::new(0);

        let first = op.get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, _>(Error::ConcurrentInit("boom".into())) }
        }).await;
        assert!(first.is_err());

        let second = op.get_or_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7u32) }
        }).await;
        assert_eq!(second.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
