// Copyright 2025 Cowboy AI, LLC.

//! The class runtime
//!
//! A [`Runtime`] owns the root class, the registry, the event bus, the
//! pending overload queues and the diagnostics log. Everything is
//! single-threaded; callbacks receive `&Runtime` and may re-enter it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::class::{ClassDefinition, ClassRef};
use crate::config::RuntimeConfig;
use crate::definition::{MemberCollector, AUGMENTED, INIT};
use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::errors::{ClassError, ClassResult};
use crate::events::{ClassEvent, EventBus, Topic};
use crate::instance::{ConstructOptions, Instance, Object};
use crate::overload::PendingOverloads;
use crate::registry::ClassRegistry;

/// Counters describing what a runtime has done so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStats {
    /// Classes derived through `extend`, overloads included
    pub classes_derived: u64,
    /// Overloads applied, immediately or from the queue
    pub overloads_applied: u64,
    /// Overloads queued because their target did not exist yet
    pub overloads_deferred: u64,
    /// Chain searches run to find the owner of an untagged method
    pub ownership_searches: u64,
    /// Event deliveries to subscribers
    pub events_published: u64,
}

/// A class runtime
///
/// # Example
///
/// ```
/// use cim_class::{Definition, ExtendOptions, Runtime};
/// use serde_json::json;
///
/// let runtime = Runtime::new();
/// let animal = runtime
///     .extend(
///         runtime.root(),
///         &Definition::new("Animal", |m| {
///             m.method("speak", |_| Ok(json!("...")));
///         }),
///         ExtendOptions::new(),
///     )
///     .unwrap();
///
/// let rex = runtime.instantiate(&animal, vec![]).unwrap();
/// assert_eq!(rex.call(&runtime, "speak", vec![]).unwrap(), json!("..."));
/// assert!(runtime.is_registered("Animal"));
/// ```
pub struct Runtime {
    config: RuntimeConfig,
    root: ClassRef,
    registry: RefCell<ClassRegistry>,
    events: EventBus,
    pending: PendingOverloads,
    diagnostics: RefCell<DiagnosticLog>,
    stats: RefCell<RuntimeStats>,
}

impl Runtime {
    /// Create a runtime with the default configuration
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with a configuration
    ///
    /// The root class is created and registered under
    /// `config.root_class_name`. It declares no-op `init` and `augmented`
    /// methods so `parent()` chains always terminate there.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut body = MemberCollector::default();
        body.method(INIT, |_| Ok(Value::Null));
        body.method(AUGMENTED, |_| Ok(Value::Null));
        let root = Rc::new(ClassDefinition::root(&config.root_class_name, body));

        let mut registry = ClassRegistry::new();
        registry.insert(&root);
        info!(root = %config.root_class_name, "class runtime created");

        Self {
            diagnostics: RefCell::new(DiagnosticLog::new(config.diagnostics_capacity)),
            config,
            root,
            registry: RefCell::new(registry),
            events: EventBus::new(),
            pending: PendingOverloads::new(),
            stats: RefCell::new(RuntimeStats::default()),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The root class
    pub fn root(&self) -> &ClassRef {
        &self.root
    }

    /// Class currently registered under a name
    pub fn lookup(&self, name: &str) -> Option<ClassRef> {
        self.registry.borrow().get(name)
    }

    /// Class currently registered under a name
    ///
    /// # Errors
    ///
    /// `UnknownClass` if the name is not registered.
    pub fn require(&self, name: &str) -> ClassResult<ClassRef> {
        self.lookup(name)
            .ok_or_else(|| ClassError::UnknownClass(name.to_string()))
    }

    /// Check whether a name is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.borrow().contains(name)
    }

    /// Registered names in first-registration order
    pub fn class_names(&self) -> Vec<String> {
        self.registry.borrow().names()
    }

    /// The event bus
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Create an instance of a class, running its init hooks with `args`
    pub fn instantiate(&self, class: &ClassRef, args: Vec<Value>) -> ClassResult<Object> {
        self.construct(class, ConstructOptions::new(args))
    }

    /// Create an instance of the class registered under a name
    ///
    /// # Errors
    ///
    /// `UnknownClass` if the name is not registered; otherwise any failure
    /// raised by an init hook.
    pub fn instantiate_named(&self, name: &str, args: Vec<Value>) -> ClassResult<Object> {
        let class = self.require(name)?;
        self.instantiate(&class, args)
    }

    /// Create an instance with explicit construction options
    pub fn construct(&self, class: &ClassRef, options: ConstructOptions) -> ClassResult<Object> {
        Instance::construct(self, class, &options)
    }

    /// Recorded diagnostics, oldest first
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().entries()
    }

    /// Remove and return recorded diagnostics
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow_mut().take()
    }

    /// Snapshot of the runtime counters
    pub fn stats(&self) -> RuntimeStats {
        self.stats.borrow().clone()
    }

    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().record(diagnostic);
    }

    /// Install a class under its name; returns the class it displaced
    pub(crate) fn register(&self, class: &ClassRef) -> Option<ClassRef> {
        let displaced = self.registry.borrow_mut().insert(class);
        debug!(class = %class.name(), replaced = displaced.is_some(), "registered class");
        displaced
    }

    pub(crate) fn publish(&self, topic: Topic, event: &ClassEvent) {
        let delivered = self.events.publish(self, &topic, event);
        self.stats.borrow_mut().events_published += delivered as u64;
    }

    pub(crate) fn pending(&self) -> &PendingOverloads {
        &self.pending
    }

    pub(crate) fn record_derivation(&self) {
        self.stats.borrow_mut().classes_derived += 1;
    }

    pub(crate) fn record_ownership_search(&self) {
        self.stats.borrow_mut().ownership_searches += 1;
    }

    pub(crate) fn record_deferred_overload(&self) {
        self.stats.borrow_mut().overloads_deferred += 1;
    }

    pub(crate) fn record_applied_overload(&self) {
        self.stats.borrow_mut().overloads_applied += 1;
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("root", &self.root.name())
            .field("classes", &self.class_names())
            .field("pending_overloads", &self.pending.total())
            .field("stats", &*self.stats.borrow())
            .finish()
    }
}
