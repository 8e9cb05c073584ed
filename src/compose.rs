//! Wraps any async function with an observable `active` flag.
//!
//! ```ignore
//! let save = compose(|todo: Todo| async move { client.save(todo).await });
//! let mut active = save.subscribe();
//! save.call(todo).await?;
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::action::StateRef;

/// An async function plus an `active` flag that is true while any call runs.
pub struct Composed<F> {
    f: F,
    active: StateRef<bool>,
    running: Arc<AtomicUsize>,
}

pub fn compose<F>(f: F) -> Composed<F> {
    Composed {
        f,
        active: StateRef::new(false),
        running: Arc::new(AtomicUsize::new(0)),
    }
}

impl<F> Composed<F> {
    pub fn active(&self) -> bool {
        self.active.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    pub async fn call<A, Fut>(&self, args: A) -> Fut::Output
    where
        F: Fn(A) -> Fut,
        Fut: Future,
    {
        self.active.modify(|active| {
            self.running.fetch_add(1, Ordering::SeqCst);
            !std::mem::replace(active, true)
        });
        let _done = Done {
            active: self.active.clone(),
            running: Arc::clone(&self.running),
        };
        (self.f)(args).await
    }
}

struct Done {
    active: StateRef<bool>,
    running: Arc<AtomicUsize>,
}

impl Drop for Done {
    fn drop(&mut self) {
        // The counter only moves under the flag's lock, so the last call out
        // cannot race a new call's `true`.
        let running = &self.running;
        self.active.modify(|active| {
            if running.fetch_sub(1, Ordering::SeqCst) == 1 {
                *active = false;
                true
            } else {
                false
            }
        });
    }
}
