//! A single owned value with synchronous change listeners.
//!
//! [`Observable`] holds one value and a list of listeners. Every commit
//! replaces the value and then calls each listener, in registration order,
//! with the committed value. Commits are serialized by a re-entrant lock,
//! so listeners may read the value or commit again from inside a callback
//! without deadlocking, and no listener ever sees a half-applied change.
//!
//! A commit made from inside a callback is queued and delivered once the
//! current notification pass has reached every listener, so all listeners
//! see commits in the same order and end on the latest value.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Registered listeners, shared with outstanding [`Subscription`]s.
struct Listeners<T> {
    entries: Mutex<Vec<(u64, Listener<T>)>>,
}

/// Type-erased handle used by [`Subscription`] to detach itself.
trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<T> Detach for Listeners<T> {
    fn detach(&self, id: u64) {
        self.entries.lock().retain(|(entry_id, _)| *entry_id != id);
    }
}

/// Observable value.
pub struct Observable<T> {
    value: RwLock<T>,
    listeners: Arc<Listeners<T>>,
    next_id: AtomicU64,
    commit: ReentrantMutex<()>,
    // Both only touched while `commit` is held.
    pending: Mutex<VecDeque<T>>,
    dispatching: AtomicBool,
}

/// Ends a notification pass, even if a listener panics.
struct DispatchGuard<'a, T> {
    dispatching: &'a AtomicBool,
    pending: &'a Mutex<VecDeque<T>>,
}

impl<T> Drop for DispatchGuard<'_, T> {
    fn drop(&mut self) {
        self.pending.lock().clear();
        self.dispatching.store(false, Ordering::Relaxed);
    }
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an observable holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            value: RwLock::new(initial),
            listeners: Arc::new(Listeners {
                entries: Mutex::new(Vec::new()),
            }),
            next_id: AtomicU64::new(0),
            commit: ReentrantMutex::new(()),
            pending: Mutex::new(VecDeque::new()),
            dispatching: AtomicBool::new(false),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Replaces the value and notifies listeners.
    pub fn set(&self, value: T) {
        self.update(|current| *current = value);
    }

    /// Mutates the value in place, then notifies listeners with the result.
    ///
    /// `f` runs while the value is write-locked; it must not call back into
    /// this observable. When called from inside a listener, the value is
    /// replaced immediately but notification waits until the running pass
    /// finishes.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _commit = self.commit.lock();
        let (result, committed) = {
            let mut value = self.value.write();
            let result = f(&mut value);
            (result, value.clone())
        };
        self.pending.lock().push_back(committed);
        if self.dispatching.swap(true, Ordering::Relaxed) {
            return result;
        }
        let _dispatch = DispatchGuard {
            dispatching: &self.dispatching,
            pending: &self.pending,
        };
        loop {
            let Some(next) = self.pending.lock().pop_front() else {
                break;
            };
            for listener in self.listener_snapshot() {
                listener(&next);
            }
        }
        result
    }

    /// Registers `listener`. It is called immediately with the current
    /// value and then after every commit, until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    #[must_use = "dropping the Subscription unsubscribes the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        // Holding the commit lock guarantees no commit slips in between
        // the initial delivery and registration.
        let _commit = self.commit.lock();
        let listener: Listener<T> = Arc::new(listener);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entries
            .lock()
            .push((id, Arc::clone(&listener)));

        let current = self.get();
        listener(&current);

        let registry: Arc<dyn Detach> = self.listeners.clone();
        Subscription {
            id,
            registry: Arc::downgrade(&registry),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.entries.lock().len()
    }

    fn listener_snapshot(&self) -> Vec<Listener<T>> {
        self.listeners
            .entries
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

/// Handle for a registered listener. Dropping it stops delivery.
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    /// Stops delivery to this listener.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
