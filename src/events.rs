// Copyright 2025 Cowboy AI, LLC.

//! Class lifecycle notifications
//!
//! The engine publishes an event whenever a class is derived and whenever an
//! overload replaces one. Delivery is synchronous, inside the publishing
//! call; subscribers may call back into the runtime. The engine itself does
//! not depend on any subscriber.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::class::ClassRef;
use crate::runtime::Runtime;

/// What happened to a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ClassEventKind {
    /// A class was derived
    Extended,
    /// A registered class was replaced through overload
    Overloaded,
}

/// Where an event is published
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every derivation
    Extended,
    /// Derivations producing a class with this name
    ExtendedNamed(String),
    /// Overloads of this name
    Overloaded(String),
}

/// A class lifecycle event
#[derive(Debug, Clone)]
pub struct ClassEvent {
    /// Event id
    pub event_id: Uuid,
    /// What happened
    pub kind: ClassEventKind,
    /// The class that was produced
    pub class: ClassRef,
    /// The class it was derived from
    pub origin: ClassRef,
    /// When it happened
    pub occurred_at: DateTime<Utc>,
}

impl ClassEvent {
    pub(crate) fn new(kind: ClassEventKind, class: &ClassRef, origin: &ClassRef) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            class: Rc::clone(class),
            origin: Rc::clone(origin),
            occurred_at: Utc::now(),
        }
    }

    /// Event type name
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            ClassEventKind::Extended => "ClassExtended",
            ClassEventKind::Overloaded => "ClassOverloaded",
        }
    }

    /// Name of the produced class
    pub fn class_name(&self) -> &str {
        self.class.name()
    }
}

/// Handle returned by a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

type Handler = Rc<dyn Fn(&Runtime, &ClassEvent)>;

struct Subscriber {
    id: SubscriptionId,
    once: bool,
    handler: Handler,
}

/// Synchronous publish/subscribe bus for class events
#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<IndexMap<Topic, Vec<Subscriber>>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every event on a topic
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Runtime, &ClassEvent) + 'static,
    {
        self.add(topic, false, Rc::new(handler))
    }

    /// Subscribe to the next event on a topic only
    pub fn subscribe_once<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Runtime, &ClassEvent) + 'static,
    {
        self.add(topic, true, Rc::new(handler))
    }

    fn add(&self, topic: Topic, once: bool, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.subscribers
            .borrow_mut()
            .entry(topic)
            .or_default()
            .push(Subscriber { id, once, handler });
        id
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        for list in subscribers.values_mut() {
            if let Some(position) = list.iter().position(|s| s.id == id) {
                list.remove(position);
                return true;
            }
        }
        false
    }

    /// Number of live subscriptions on a topic
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.subscribers
            .borrow()
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Deliver an event to every subscriber of a topic; returns how many ran
    ///
    /// One-shot subscribers are removed before any handler runs, so a
    /// handler that publishes again never sees itself twice.
    pub(crate) fn publish(&self, runtime: &Runtime, topic: &Topic, event: &ClassEvent) -> usize {
        let handlers: Vec<Handler> = {
            let mut subscribers = self.subscribers.borrow_mut();
            let Some(list) = subscribers.get_mut(topic) else {
                return 0;
            };
            let handlers = list.iter().map(|s| Rc::clone(&s.handler)).collect();
            list.retain(|s| !s.once);
            handlers
        };
        trace!(
            topic = ?topic,
            event = event.event_type(),
            class = %event.class_name(),
            subscribers = handlers.len(),
            "publishing class event"
        );
        for handler in &handlers {
            handler(runtime, event);
        }
        handlers.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics: Vec<(Topic, usize)> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(topic, list)| (topic.clone(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("topics", &topics).finish()
    }
}
