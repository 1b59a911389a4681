// Copyright 2025 Cowboy AI, LLC.

//! Name to class registry
//!
//! Last write wins. Callers decide whether a replacement deserves a warning.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::class::ClassRef;

/// Registered classes by name, in first-registration order
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: IndexMap<String, ClassRef>,
}

impl ClassRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Class registered under a name
    pub fn get(&self, name: &str) -> Option<ClassRef> {
        self.classes.get(name).cloned()
    }

    /// Check whether a name is taken
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Install a class under its own name; returns the definition it displaced
    pub fn insert(&mut self, class: &ClassRef) -> Option<ClassRef> {
        class.mark_registered();
        self.classes.insert(class.name().to_string(), Rc::clone(class))
    }

    /// Registered names
    pub fn names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate over registered classes
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClassRef)> {
        self.classes.iter()
    }
}
