// Copyright 2025 Cowboy AI, LLC.

//! Overload scheduling
//!
//! `overload` replaces the registered definition of a name with a class
//! derived from it. When the name is not registered yet the definition is
//! queued and applied synchronously the moment the name is first
//! registered. A queued overload whose target never appears stays pending.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::class::ClassRef;
use crate::definition::Definition;
use crate::errors::ClassResult;
use crate::extend::ExtendOptions;
use crate::runtime::Runtime;

/// Result of scheduling an overload
#[derive(Debug, Clone)]
pub enum OverloadOutcome {
    /// The target existed; this is the replacement now registered
    Applied(ClassRef),
    /// The target does not exist yet; the overload is queued
    Deferred,
}

impl OverloadOutcome {
    /// The replacement class, if the overload ran
    pub fn applied(&self) -> Option<&ClassRef> {
        match self {
            OverloadOutcome::Applied(class) => Some(class),
            OverloadOutcome::Deferred => None,
        }
    }

    /// Check whether the overload is waiting for its target
    pub fn is_deferred(&self) -> bool {
        matches!(self, OverloadOutcome::Deferred)
    }
}

/// Overloads waiting for their target name, in declaration order
#[derive(Debug, Default)]
pub struct PendingOverloads {
    queues: RefCell<HashMap<String, VecDeque<Definition>>>,
}

impl PendingOverloads {
    /// Create an empty queue set
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an overload for a name
    pub fn push(&self, target: &str, definition: Definition) {
        self.queues
            .borrow_mut()
            .entry(target.to_string())
            .or_default()
            .push_back(definition);
    }

    /// Remove and return everything queued for a name
    pub fn drain(&self, target: &str) -> VecDeque<Definition> {
        self.queues.borrow_mut().remove(target).unwrap_or_default()
    }

    /// Remove and return the oldest overload queued for a name
    pub fn pop(&self, target: &str) -> Option<Definition> {
        let mut queues = self.queues.borrow_mut();
        let queue = queues.get_mut(target)?;
        let next = queue.pop_front();
        if queue.is_empty() {
            queues.remove(target);
        }
        next
    }

    /// Number of overloads queued for a name
    pub fn len(&self, target: &str) -> usize {
        self.queues.borrow().get(target).map(VecDeque::len).unwrap_or(0)
    }

    /// Total number of queued overloads
    pub fn total(&self) -> usize {
        self.queues.borrow().values().map(VecDeque::len).sum()
    }
}

impl Runtime {
    /// Replace the class registered under `target`, now or once it exists
    pub fn overload(&self, target: &str, definition: Definition) -> ClassResult<OverloadOutcome> {
        match self.lookup(target) {
            Some(base) => {
                let class = self.apply_overload(&base, target, &definition)?;
                Ok(OverloadOutcome::Applied(class))
            }
            None => {
                debug!(class = %target, "deferring overload until class is registered");
                self.pending().push(target, definition);
                self.record_deferred_overload();
                Ok(OverloadOutcome::Deferred)
            }
        }
    }

    fn apply_overload(&self, base: &ClassRef, target: &str, definition: &Definition) -> ClassResult<ClassRef> {
        debug!(class = %target, "applying overload");
        let class = self.extend(base, &definition.renamed(target), ExtendOptions::overloading(target))?;
        self.record_applied_overload();
        Ok(class)
    }

    /// Apply overloads queued for a name that has just been registered
    ///
    /// Overloads are taken off the queue one at a time; if one fails, the
    /// ones behind it stay queued for the next registration of the name.
    pub(crate) fn apply_pending_overloads(&self, target: &str) -> ClassResult<()> {
        while let Some(base) = self.lookup(target) {
            let Some(definition) = self.pending().pop(target) else {
                break;
            };
            if let Err(err) = self.apply_overload(&base, target, &definition) {
                warn!(
                    class = %target,
                    remaining = self.pending().len(target),
                    error = %err,
                    "queued overload failed; remaining overloads stay pending"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    /// Number of overloads waiting for `target`
    pub fn pending_overloads(&self, target: &str) -> usize {
        self.pending().len(target)
    }
}
