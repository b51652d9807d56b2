//! Synchronous publish/subscribe over a closed set of events.
//!
//! Every emitting type defines one event enum implementing [`Event`]. Its
//! [`Event::Kind`] is the subscription key, so handlers receive a
//! strongly-typed payload and no casts are needed.
//!
//! All methods take `&self`. Handlers may subscribe or unsubscribe while an
//! emission is in flight: `emit` works on a snapshot of the handler list
//! taken when it starts.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::EmitterError;

/// An event that can be dispatched through an [`EventEmitter`].
pub trait Event {
    /// Discriminant used as the subscription key.
    type Kind: Copy + Eq + Hash + fmt::Debug + fmt::Display;

    fn kind(&self) -> Self::Kind;
}

/// Identifies one registration. Unique per emitter, whatever the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Handler<E> = Rc<dyn Fn(&E)>;

struct Listener<E: Event> {
    kind: E::Kind,
    id: SubscriptionId,
    handler: Handler<E>,
}

pub struct EventEmitter<E: Event> {
    listeners: RefCell<Vec<Listener<E>>>,
    last_id: Cell<u64>,
}

impl<E: Event> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            last_id: Cell::new(0),
        }
    }

    /// Register `handler` for every future event of `kind`.
    ///
    /// Handlers for the same kind run in registration order.
    pub fn subscribe<F>(&self, kind: E::Kind, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + 'static,
    {
        let id = SubscriptionId(self.last_id.get());
        self.last_id.set(id.0 + 1);
        self.listeners.borrow_mut().push(Listener {
            kind,
            id,
            handler: Rc::new(handler),
        });
        id
    }

    /// Remove the registration matching both `kind` and `id`.
    ///
    /// An unknown pair is reported and otherwise ignored.
    pub fn unsubscribe(&self, kind: E::Kind, id: SubscriptionId) -> Result<(), EmitterError> {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|l| l.kind == kind && l.id == id) {
            Some(index) => {
                listeners.remove(index);
                Ok(())
            }
            None => {
                tracing::warn!(event = %kind, id = id.0, "no listener found to unsubscribe");
                Err(EmitterError::UnknownSubscription {
                    kind: kind.to_string(),
                    id: id.0,
                })
            }
        }
    }

    /// Invoke every handler registered for `event.kind()`.
    ///
    /// A panicking handler is logged and skipped; the remaining handlers
    /// still run and the panic does not reach the caller.
    pub fn emit(&self, event: E) {
        let kind = event.kind();
        let snapshot: Vec<(SubscriptionId, Handler<E>)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| (l.id, Rc::clone(&l.handler)))
            .collect();

        for (id, handler) in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&event)));
            if let Err(payload) = outcome {
                tracing::error!(
                    event = %kind,
                    id = id.0,
                    reason = panic_message(payload.as_ref()),
                    "listener panicked"
                );
            }
        }
    }

    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }

    /// Drop every registration. Ids are not reused afterwards.
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

impl<E: Event> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.borrow().len())
            .field("last_id", &self.last_id.get())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Hello(u32),
        Bye,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum PingKind {
        Hello,
        Bye,
    }

    impl fmt::Display for PingKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                PingKind::Hello => f.write_str("hello"),
                PingKind::Bye => f.write_str("bye"),
            }
        }
    }

    impl Event for Ping {
        type Kind = PingKind;

        fn kind(&self) -> PingKind {
            match self {
                Ping::Hello(_) => PingKind::Hello,
                Ping::Bye => PingKind::Bye,
            }
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&Ping)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = Rc::clone(&log);
        let make = move |name: &str| -> Box<dyn Fn(&Ping)> {
            let log = Rc::clone(&log2);
            let name = name.to_string();
            Box::new(move |ev: &Ping| log.borrow_mut().push(format!("{name}:{ev:?}")))
        };
        (log, make)
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let emitter = EventEmitter::<Ping>::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        emitter.subscribe(PingKind::Hello, move |e| a(e));
        emitter.subscribe(PingKind::Hello, move |e| b(e));

        emitter.emit(Ping::Hello(7));

        assert_eq!(*log.borrow(), vec!["a:Hello(7)", "b:Hello(7)"]);
    }

    #[test]
    fn only_matching_kind_is_invoked() {
        let emitter = EventEmitter::<Ping>::new();
        let (log, make) = recorder();
        let a = make("a");
        emitter.subscribe(PingKind::Bye, move |e| a(e));

        emitter.emit(Ping::Hello(1));
        assert!(log.borrow().is_empty());

        emitter.emit(Ping::Bye);
        assert_eq!(*log.borrow(), vec!["a:Bye"]);
    }

    #[test]
    fn ids_are_unique_across_kinds() {
        let emitter = EventEmitter::<Ping>::new();
        let a = emitter.subscribe(PingKind::Hello, |_| {});
        let b = emitter.subscribe(PingKind::Bye, |_| {});
        let c = emitter.subscribe(PingKind::Hello, |_| {});
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn unsubscribe_requires_matching_kind() {
        let emitter = EventEmitter::<Ping>::new();
        let id = emitter.subscribe(PingKind::Hello, |_| {});

        let err = emitter.unsubscribe(PingKind::Bye, id).unwrap_err();
        assert_eq!(
            err,
            EmitterError::UnknownSubscription {
                kind: "bye".into(),
                id: id.as_u64()
            }
        );
        assert_eq!(emitter.subscriber_count(PingKind::Hello), 1);

        assert!(emitter.unsubscribe(PingKind::Hello, id).is_ok());
        assert_eq!(emitter.subscriber_count(PingKind::Hello), 0);
        assert!(emitter.unsubscribe(PingKind::Hello, id).is_err());
    }

    #[test]
    fn panicking_handler_does_not_stop_later_handlers() {
        let emitter = EventEmitter::<Ping>::new();
        let (log, make) = recorder();
        let after = make("after");
        emitter.subscribe(PingKind::Hello, |_| panic!("boom"));
        emitter.subscribe(PingKind::Hello, move |e| after(e));

        emitter.emit(Ping::Hello(1));
        emitter.emit(Ping::Hello(2));

        assert_eq!(*log.borrow(), vec!["after:Hello(1)", "after:Hello(2)"]);
    }

    #[test]
    fn handler_unsubscribing_itself_mid_emit() {
        let emitter = Rc::new(EventEmitter::<Ping>::new());
        let calls = Rc::new(RefCell::new(Vec::new()));
        let own_id: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));

        let id = {
            let inner = Rc::clone(&emitter);
            let calls = Rc::clone(&calls);
            let own_id = Rc::clone(&own_id);
            emitter.subscribe(PingKind::Hello, move |_| {
                calls.borrow_mut().push("first");
                if let Some(id) = own_id.get() {
                    inner.unsubscribe(PingKind::Hello, id).unwrap();
                }
            })
        };
        own_id.set(Some(id));
        {
            let calls = Rc::clone(&calls);
            emitter.subscribe(PingKind::Hello, move |_| calls.borrow_mut().push("second"));
        }

        emitter.emit(Ping::Hello(1));
        assert_eq!(*calls.borrow(), vec!["first", "second"]);

        emitter.emit(Ping::Hello(2));
        assert_eq!(*calls.borrow(), vec!["first", "second", "second"]);
    }

    #[test]
    fn handler_subscribed_mid_emit_waits_for_next_emission() {
        let emitter = Rc::new(EventEmitter::<Ping>::new());
        let calls = Rc::new(Cell::new(0u32));
        let added = Rc::new(Cell::new(false));
        {
            let inner = Rc::clone(&emitter);
            let calls = Rc::clone(&calls);
            let added = Rc::clone(&added);
            emitter.subscribe(PingKind::Hello, move |_| {
                if !added.replace(true) {
                    let calls = Rc::clone(&calls);
                    inner.subscribe(PingKind::Hello, move |_| calls.set(calls.get() + 1));
                }
            });
        }

        emitter.emit(Ping::Hello(1));
        assert_eq!(calls.get(), 0);
        emitter.emit(Ping::Hello(2));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn clear_removes_everything() {
        let emitter = EventEmitter::<Ping>::new();
        emitter.subscribe(PingKind::Hello, |_| {});
        emitter.subscribe(PingKind::Bye, |_| {});
        emitter.clear();
        assert_eq!(emitter.subscriber_count(PingKind::Hello), 0);
        assert_eq!(emitter.subscriber_count(PingKind::Bye), 0);
    }
}
