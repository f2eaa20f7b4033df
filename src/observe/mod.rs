//! observe
//!
//! Rename-stable path handles.
//!
//! An [`ObservablePath`] is a caller's view of one resource. It keeps the
//! path the view started from, follows renames made through the mutation
//! engine, and tells subscribed observers about each move.
//!
//! # Identity
//!
//! Identity is a token of the view, not of the path string. Views made
//! with [`ObservablePath::view`] share the token and stay equal even after
//! one of them follows a rename the other has not seen yet;
//! [`ObservablePath::reconcile`] brings a lagging view up to date.
//!
//! # Example
//!
//! ```ignore
//! let tracked = ObservablePath::new(fs.path("docs/readme.txt")?);
//! tracked.subscribe(|change: &PathChange| println!("moved to {}", change.current));
//! engine.rename_observed(&fs, &tracked, "readme2.txt", &request)?;
//! assert_eq!(tracked.current().name(), Some("readme2.txt"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use tracing::trace;
use uuid::Uuid;

use crate::core::resolver::LogicalPath;

/// A move of an observed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathChange {
    /// Identity token of the view that moved.
    pub id: Uuid,
    pub previous: LogicalPath,
    pub current: LogicalPath,
}

/// Receives path changes, synchronously on the mutating thread.
pub trait PathObserver: Send + Sync {
    fn path_changed(&self, change: &PathChange);
}

impl<F> PathObserver for F
where
    F: Fn(&PathChange) + Send + Sync,
{
    fn path_changed(&self, change: &PathChange) {
        self(change)
    }
}

/// Handle returned by [`ObservablePath::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Errors from observable path operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObserveError {
    /// The two views do not track the same resource.
    #[error("views track different resources ({expected} vs {actual})")]
    IdentityMismatch { expected: Uuid, actual: Uuid },
}

/// A path with a stable identity across renames.
pub struct ObservablePath {
    id: Uuid,
    original: LogicalPath,
    current: RwLock<LogicalPath>,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn PathObserver>)>>,
    next_subscription: AtomicU64,
}

impl ObservablePath {
    /// Start tracking `path` under a fresh identity.
    pub fn new(path: LogicalPath) -> Self {
        Self::with_identity(Uuid::new_v4(), path.clone(), path)
    }

    fn with_identity(id: Uuid, original: LogicalPath, current: LogicalPath) -> Self {
        Self {
            id,
            original,
            current: RwLock::new(current),
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The path as of now.
    pub fn current(&self) -> LogicalPath {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The path the view started from.
    pub fn original(&self) -> &LogicalPath {
        &self.original
    }

    /// Whether the view moved since it was created.
    pub fn is_moved(&self) -> bool {
        self.current() != self.original
    }

    /// Another view of the same resource, without observers.
    pub fn view(&self) -> Self {
        Self::with_identity(self.id, self.original.clone(), self.current())
    }

    /// Register an observer; observers are called in subscription order.
    pub fn subscribe(&self, observer: impl PathObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Adopt the current path of another view of the same resource.
    ///
    /// Returns whether this view moved.
    ///
    /// # Errors
    ///
    /// - [`ObserveError::IdentityMismatch`] if `other` tracks a different
    ///   resource
    pub fn reconcile(&self, other: &ObservablePath) -> Result<bool, ObserveError> {
        if other.id != self.id {
            return Err(ObserveError::IdentityMismatch {
                expected: self.id,
                actual: other.id,
            });
        }
        let target = other.current();
        if target == self.current() {
            return Ok(false);
        }
        self.on_path_changed(target);
        Ok(true)
    }

    /// Move the view and notify observers.
    ///
    /// Only called after a rename has been committed.
    pub(crate) fn on_path_changed(&self, new_path: LogicalPath) {
        let previous = {
            let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *current, new_path.clone())
        };
        let change = PathChange {
            id: self.id,
            previous,
            current: new_path,
        };

        // Observers run without the lock held so they may (un)subscribe.
        let observers: Vec<Arc<dyn PathObserver>> = self
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        trace!(id = %self.id, to = %change.current, observers = observers.len(), "path changed");
        for observer in observers {
            observer.path_changed(&change);
        }
    }
}

impl std::fmt::Debug for ObservablePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservablePath")
            .field("id", &self.id)
            .field("original", &self.original)
            .field("current", &self.current())
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl PartialEq for ObservablePath {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObservablePath {}

impl std::hash::Hash for ObservablePath {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BranchName, RepoName};

    fn path(rel: &str) -> LogicalPath {
        LogicalPath::from_relative(
            RepoName::new("docs").unwrap(),
            BranchName::new("master").unwrap(),
            rel,
        )
        .unwrap()
    }

    mod tracking {
        use super::*;

        #[test]
        fn starts_unmoved() {
            let tracked = ObservablePath::new(path("a.txt"));
            assert_eq!(tracked.current(), path("a.txt"));
            assert_eq!(tracked.original(), &path("a.txt"));
            assert!(!tracked.is_moved());
        }

        #[test]
        fn change_keeps_original() {
            let tracked = ObservablePath::new(path("a.txt"));
            tracked.on_path_changed(path("b.txt"));
            tracked.on_path_changed(path("c.txt"));
            assert_eq!(tracked.current(), path("c.txt"));
            assert_eq!(tracked.original(), &path("a.txt"));
            assert!(tracked.is_moved());
        }
    }

    mod observers {
        use super::*;

        #[test]
        fn notified_in_subscription_order() {
            let tracked = ObservablePath::new(path("a.txt"));
            let log = Arc::new(Mutex::new(Vec::new()));

            for label in ["first", "second", "third"] {
                let log = Arc::clone(&log);
                tracked.subscribe(move |change: &PathChange| {
                    log.lock()
                        .unwrap()
                        .push((label, change.current.name().unwrap().to_string()));
                });
            }

            tracked.on_path_changed(path("b.txt"));
            let log = log.lock().unwrap();
            assert_eq!(
                *log,
                vec![
                    ("first", "b.txt".to_string()),
                    ("second", "b.txt".to_string()),
                    ("third", "b.txt".to_string()),
                ]
            );
        }

        #[test]
        fn change_carries_previous_and_identity() {
            let tracked = ObservablePath::new(path("a.txt"));
            let seen = Arc::new(Mutex::new(None));
            let sink = Arc::clone(&seen);
            tracked.subscribe(move |change: &PathChange| {
                *sink.lock().unwrap() = Some(change.clone());
            });

            tracked.on_path_changed(path("b.txt"));
            let change = seen.lock().unwrap().clone().unwrap();
            assert_eq!(change.id, tracked.id());
            assert_eq!(change.previous, path("a.txt"));
            assert_eq!(change.current, path("b.txt"));
        }

        #[test]
        fn unsubscribed_observer_is_silent() {
            let tracked = ObservablePath::new(path("a.txt"));
            let count = Arc::new(AtomicU64::new(0));
            let counter = Arc::clone(&count);
            let sub = tracked.subscribe(move |_: &PathChange| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

            assert!(tracked.unsubscribe(sub));
            assert!(!tracked.unsubscribe(sub));
            tracked.on_path_changed(path("b.txt"));
            assert_eq!(count.load(Ordering::SeqCst), 0);
        }
    }

    mod identity {
        use super::*;

        #[test]
        fn views_share_identity_across_divergent_renames() {
            let a = ObservablePath::new(path("a.txt"));
            let b = a.view();
            a.on_path_changed(path("renamed.txt"));

            assert_eq!(a, b);
            assert_eq!(a.id(), b.id());
            assert_ne!(a.current(), b.current());
            assert_eq!(b.observer_count(), 0);
        }

        #[test]
        fn reconcile_adopts_other_view() {
            let a = ObservablePath::new(path("a.txt"));
            let b = a.view();
            a.on_path_changed(path("renamed.txt"));

            assert!(b.reconcile(&a).unwrap());
            assert_eq!(b.current(), path("renamed.txt"));
            assert_eq!(b.original(), &path("a.txt"));
            assert!(!b.reconcile(&a).unwrap());
        }

        #[test]
        fn reconcile_rejects_unrelated_paths() {
            let a = ObservablePath::new(path("a.txt"));
            let other = ObservablePath::new(path("a.txt"));
            assert_ne!(a, other);
            assert!(matches!(
                a.reconcile(&other),
                Err(ObserveError::IdentityMismatch { .. })
            ));
        }
    }
}
