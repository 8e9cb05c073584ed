//! Memoized derived reads over container keys.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use super::{ContainerError, StateContainer};

type Compute<T> = Arc<dyn Fn(&[Arc<Value>]) -> T + Send + Sync>;

struct Memo<T> {
    revisions: Vec<u64>,
    value: Arc<T>,
}

/// A derived value recomputed only when one of its source keys changed.
///
/// Dependency tracking is revision based: the getter remembers the revision
/// of every source it last computed from and recomputes on the next `get`
/// once any of them moved.
pub struct Getter<T> {
    container: Arc<dyn StateContainer>,
    keys: Vec<String>,
    compute: Compute<T>,
    memo: Mutex<Option<Memo<T>>>,
}

impl<T> Getter<T> {
    pub fn new<K, F>(container: Arc<dyn StateContainer>, keys: K, compute: F) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        F: Fn(&[Arc<Value>]) -> T + Send + Sync + 'static,
    {
        Self {
            container,
            keys: keys.into_iter().map(Into::into).collect(),
            compute: Arc::new(compute),
            memo: Mutex::new(None),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// True if a source changed since the last computation (or none happened).
    pub fn is_stale(&self) -> Result<bool, ContainerError> {
        let revisions = self.revisions()?;
        let memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(memo.as_ref().map_or(true, |m| m.revisions != revisions))
    }

    /// Returns the memoized value, recomputing it if a source changed.
    pub fn get(&self) -> Result<Arc<T>, ContainerError> {
        let revisions = self.revisions()?;
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = memo.as_ref() {
            if cached.revisions == revisions {
                return Ok(Arc::clone(&cached.value));
            }
        }

        let mut values = Vec::with_capacity(self.keys.len());
        let mut seen = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let snapshot = self
                .container
                .snapshot(key)?
                .ok_or_else(|| ContainerError::UnknownKey(key.clone()))?;
            seen.push(snapshot.revision);
            values.push(snapshot.value);
        }

        let value = Arc::new((self.compute)(&values));
        *memo = Some(Memo {
            revisions: seen,
            value: Arc::clone(&value),
        });
        Ok(value)
    }

    fn revisions(&self) -> Result<Vec<u64>, ContainerError> {
        self.keys
            .iter()
            .map(|key| {
                self.container
                    .revision(key)?
                    .ok_or_else(|| ContainerError::UnknownKey(key.clone()))
            })
            .collect()
    }
}
