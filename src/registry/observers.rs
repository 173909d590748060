use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use log::error;

use crate::types::StepEvent;

thread_local! {
    static NOTIFYING: Cell<bool> = const { Cell::new(false) };
}

/// True while the current thread is inside `ObserverSet::notify`.
pub fn is_notifying() -> bool {
    NOTIFYING.with(Cell::get)
}

/// Marks the thread as notifying; restores the previous mark on drop.
struct NotifyScope {
    previous: bool,
}

impl NotifyScope {
    fn enter() -> Self {
        Self {
            previous: NOTIFYING.with(|n| n.replace(true)),
        }
    }
}

impl Drop for NotifyScope {
    fn drop(&mut self) {
        NOTIFYING.with(|n| n.set(self.previous));
    }
}

/// Receives every step event, in the order steps are accepted.
pub trait StepObserver: Send + Sync {
    fn on_step(&self, event: &StepEvent);
}

impl<F> StepObserver for F
where
    F: Fn(&StepEvent) + Send + Sync,
{
    fn on_step(&self, event: &StepEvent) {
        self(event)
    }
}

/// Listener list keyed by reference identity. The same `Arc` may be added
/// twice and is then notified twice.
#[derive(Default)]
pub struct ObserverSet {
    observers: Mutex<Vec<Arc<dyn StepObserver>>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn StepObserver>) {
        self.lock().push(observer);
    }

    /// Removes the earliest registration of this exact `Arc`. Returns false
    /// when it was not registered.
    pub fn remove(&self, observer: &Arc<dyn StepObserver>) -> bool {
        let mut observers = self.lock();
        match observers.iter().position(|o| Arc::ptr_eq(o, observer)) {
            Some(index) => {
                observers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Calls every observer sequentially. A panicking observer is logged and
    /// skipped; the rest still run.
    pub fn notify(&self, event: &StepEvent) {
        // snapshot so observers may add or remove listeners re-entrantly
        let observers: Vec<Arc<dyn StepObserver>> = self.lock().clone();
        let _scope = NotifyScope::enter();

        for (index, observer) in observers.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer.on_step(event)));
            if let Err(payload) = outcome {
                error!(
                    "Step listener #{} panicked on {} steps: {}",
                    index,
                    event.steps,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn StepObserver>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn counting() -> (Arc<AtomicU64>, Arc<dyn StepObserver>) {
        let seen = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&seen);
        let observer: Arc<dyn StepObserver> = Arc::new(move |event: &StepEvent| {
            sink.store(event.steps, Ordering::SeqCst);
        });
        (seen, observer)
    }

    #[test]
    fn test_notifies_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let set = ObserverSet::new();
        for id in 0..3 {
            let order = Arc::clone(&order);
            set.add(Arc::new(move |_: &StepEvent| order.lock().unwrap().push(id)));
        }

        set.notify(&StepEvent::new(1, 0));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_panicking_observer_is_isolated() {
        let set = ObserverSet::new();
        set.add(Arc::new(|_: &StepEvent| panic!("listener failure")));
        let (seen, observer) = counting();
        set.add(observer);

        set.notify(&StepEvent::new(7, 1_000));
        assert_eq!(seen.load(Ordering::SeqCst), 7);

        // the set is still usable afterwards
        set.notify(&StepEvent::new(8, 1_100));
        assert_eq!(seen.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_notifying_flag_is_scoped_to_the_call() {
        let inside = Arc::new(Mutex::new(Vec::new()));
        let set = ObserverSet::new();
        let sink = Arc::clone(&inside);
        set.add(Arc::new(move |_: &StepEvent| sink.lock().unwrap().push(is_notifying())));
        set.add(Arc::new(|_: &StepEvent| panic!("listener failure")));

        assert!(!is_notifying());
        set.notify(&StepEvent::new(1, 0));
        assert!(!is_notifying());
        assert_eq!(*inside.lock().unwrap(), vec![true]);
    }

    #[test]
    fn test_remove_by_reference() {
        let set = ObserverSet::new();
        let (seen, observer) = counting();
        let (_, other) = counting();

        set.add(Arc::clone(&observer));
        set.add(Arc::clone(&observer));
        assert_eq!(set.len(), 2);

        assert!(!set.remove(&other));
        assert!(set.remove(&observer));
        assert_eq!(set.len(), 1);

        set.notify(&StepEvent::new(3, 0));
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        assert!(set.remove(&observer));
        assert!(set.is_empty());
    }
}
