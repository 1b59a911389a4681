//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use cim_class::{ClassRef, Definition, ExtendOptions, Runtime, INIT};
use serde_json::Value;

/// Ordered record of what ran, shared with method bodies.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Definition whose `init` logs its name and, optionally, continues upward.
pub fn logging_init(name: &str, journal: &Journal, call_parent: bool) -> Definition {
    let journal = journal.clone();
    let label = name.to_string();
    Definition::new(name, move |m| {
        let journal = journal.clone();
        let label = label.clone();
        m.method(INIT, move |call| {
            journal.log(label.clone());
            if call_parent {
                call.parent()?;
            }
            Ok(Value::Null)
        });
    })
}

/// Derive and register `definition` from `origin`.
pub fn derive(runtime: &Runtime, origin: &ClassRef, definition: &Definition) -> ClassRef {
    runtime
        .extend(origin, definition, ExtendOptions::new())
        .expect("derivation should succeed")
}

/// Root -> A -> B -> C with logging inits; `b_calls_parent` controls B.
pub fn abc_chain(runtime: &Runtime, journal: &Journal, b_calls_parent: bool) -> ClassRef {
    let a = derive(runtime, runtime.root(), &logging_init("A", journal, true));
    let b = derive(runtime, &a, &logging_init("B", journal, b_calls_parent));
    derive(runtime, &b, &logging_init("C", journal, true))
}
