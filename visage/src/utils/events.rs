//! Defines Visage event manager system.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Name under which a callback receives every event, whatever its name.
pub const ANY_EVENT: &str = "*";

/// An event that can go through an [`EventManager`]: it knows the name it is emitted under.
pub trait Event: Clone + Send + 'static {
    fn name(&self) -> &'static str;
}

type Callback<E> = Arc<Mutex<Box<dyn FnMut(E) + Send>>>;
type SyncedCallbackMap<E> = Mutex<HashMap<String, Vec<CallbackWrapper<E>>>>;
pub type EventHandler = usize;

/// Publish/subscribe bus: callbacks register for an event name and receive a clone of each
/// matching event, in registration order.
///
/// Events carry notification only: a callback can observe, it has no say on what is emitted.
/// Callbacks run without any lock of the manager held, so they may emit, register or unregister.
/// An event emitted from within a callback is queued and delivered once the current one has
/// reached all its callbacks.
pub struct EventManager<E: Event> {
    callbacks: Arc<SyncedCallbackMap<E>>,
    dispatch: Arc<Mutex<Dispatch<E>>>,
    next_id: Arc<AtomicUsize>,
}

struct CallbackWrapper<E> {
    id: EventHandler,
    callback: Callback<E>,
}

/// Events waiting for delivery, and whether some emit is already delivering them.
struct Dispatch<E> {
    queue: VecDeque<E>,
    draining: bool,
}

impl<E: Event> Clone for EventManager<E> {
    fn clone(&self) -> Self {
        Self {
            callbacks: self.callbacks.clone(),
            dispatch: self.dispatch.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<E: Event> Default for EventManager<E> {
    fn default() -> Self {
        Self {
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            dispatch: Arc::new(Mutex::new(Dispatch {
                queue: VecDeque::new(),
                draining: false,
            })),
            next_id: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl<E: Event> EventManager<E> {
    /// Register event handler for a specific event name ([`ANY_EVENT`] to receive them all).
    ///
    /// # Return
    /// Returns an EventHandler that can be used by the `unregister()` method.
    pub fn on<S, F>(&self, event: S, callback: F) -> EventHandler
    where
        S: Into<String>,
        F: FnMut(E) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Box<dyn FnMut(E) + Send> = Box::new(callback);
        self.callbacks
            .lock()
            .entry(event.into())
            .or_default()
            .push(CallbackWrapper {
                id,
                callback: Arc::new(Mutex::new(callback)),
            });
        id
    }

    /// Invoke all event handlers registered for the name of the given event, then the ones
    /// registered for [`ANY_EVENT`].
    ///
    /// When called from within a callback, the event is queued: the outer call delivers it next.
    pub fn emit(&self, event: E) {
        {
            let mut dispatch = self.dispatch.lock();
            dispatch.queue.push_back(event);
            if dispatch.draining {
                return;
            }
            dispatch.draining = true;
        }

        loop {
            let event = {
                let mut dispatch = self.dispatch.lock();
                match dispatch.queue.pop_front() {
                    Some(event) => event,
                    None => {
                        dispatch.draining = false;
                        return;
                    }
                }
            };
            for callback in self.matching(event.name()) {
                let mut callback = callback.lock();
                (*callback)(event.clone());
            }
        }
    }

    /// Snapshot of the callbacks an event of that name reaches, in delivery order.
    fn matching(&self, name: &str) -> Vec<Callback<E>> {
        let callbacks = self.callbacks.lock();
        [name, ANY_EVENT]
            .iter()
            .filter_map(|name| callbacks.get(*name))
            .flat_map(|wrappers| wrappers.iter().map(|wrapper| wrapper.callback.clone()))
            .collect()
    }

    /// Unregister a given handler if found.
    pub fn unregister(&self, handler: EventHandler) {
        self.callbacks
            .lock()
            .values_mut()
            .for_each(|v| v.retain(|cb| cb.id != handler));
    }

    /// Number of handlers currently registered (all names included).
    pub fn len(&self) -> usize {
        self.callbacks.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
