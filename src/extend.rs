// Copyright 2025 Cowboy AI, LLC.

//! Class derivation
//!
//! `extend` composes a new class from an origin class, the members a
//! definition declares, and any trait sources. Member priority, lowest
//! first: origin chain (through the parent link), trait sources in listed
//! order, the definition's own members.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::class::{ClassDefinition, ClassParts, ClassRef};
use crate::definition::{Definition, CONSTRUCTOR};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::errors::ClassResult;
use crate::events::{ClassEvent, ClassEventKind, Topic};
use crate::member::Member;
use crate::ownership::{tag_members, OwnershipTable};
use crate::runtime::Runtime;

/// An auxiliary source of members merged below a class's own members
#[derive(Debug, Clone)]
pub enum TraitSource {
    /// Members declared directly on an existing class; their ownership
    /// tags travel with them
    Class(ClassRef),
    /// Members declared by a definition body
    Definition(Definition),
}

impl TraitSource {
    fn label(&self) -> String {
        match self {
            TraitSource::Class(class) => class.name().to_string(),
            TraitSource::Definition(definition) => {
                definition.name().unwrap_or("anonymous").to_string()
            }
        }
    }
}

impl From<ClassRef> for TraitSource {
    fn from(class: ClassRef) -> Self {
        TraitSource::Class(class)
    }
}

impl From<&ClassRef> for TraitSource {
    fn from(class: &ClassRef) -> Self {
        TraitSource::Class(Rc::clone(class))
    }
}

impl From<Definition> for TraitSource {
    fn from(definition: Definition) -> Self {
        TraitSource::Definition(definition)
    }
}

/// Options recognized by `extend`
#[derive(Debug, Clone)]
pub struct ExtendOptions {
    /// Name of the new class; defaults to the definition's declared name
    pub name: Option<String>,
    /// Insert the new class into the registry (default `true`)
    pub register: bool,
    /// Trait sources, lowest priority first
    pub also: Vec<TraitSource>,
    pub(crate) overloading: bool,
}

impl Default for ExtendOptions {
    fn default() -> Self {
        Self {
            name: None,
            register: true,
            also: Vec::new(),
            overloading: false,
        }
    }
}

impl ExtendOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the new class
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Do not register the new class
    pub fn unregistered(mut self) -> Self {
        self.register = false;
        self
    }

    /// Merge a trait source
    pub fn also(mut self, source: impl Into<TraitSource>) -> Self {
        self.also.push(source.into());
        self
    }

    pub(crate) fn overloading(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            overloading: true,
            ..Self::default()
        }
    }

    /// Whether this derivation replaces a class through `overload`
    pub fn is_overloading(&self) -> bool {
        self.overloading
    }

    /// Final name and registration flag for a definition
    fn resolve(&self, definition: &Definition) -> (String, bool) {
        match self.name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => (name.to_string(), self.register),
            None => match definition.name() {
                Some(name) => (name.to_string(), self.register),
                None => (String::new(), false),
            },
        }
    }
}

impl Runtime {
    /// Derive a new class from `origin`
    ///
    /// Registering over an existing name without going through `overload`
    /// reports an `ExtendOverRegistered` diagnostic and still replaces the
    /// entry. Failures of class hooks propagate.
    ///
    /// ```mermaid
    /// graph TD
    ///     A[harvest definition] --> B[tag own members]
    ///     B --> C[merge traits + own]
    ///     C --> D[tag merged]
    ///     D --> E[statics: origin then own]
    ///     E --> F{register?}
    ///     F -->|yes| G[warn if taken, install]
    ///     F -->|no| H
    ///     G --> H[origin __extended__]
    ///     H --> I[apply queued overloads]
    ///     I --> J[publish extended]
    ///     J --> K{overloading?}
    ///     K -->|yes| L[__overloaded__ + publish]
    /// ```
    pub fn extend(
        &self,
        origin: &ClassRef,
        definition: &Definition,
        options: ExtendOptions,
    ) -> ClassResult<ClassRef> {
        let (name, register) = options.resolve(definition);
        let parent_name = origin.name().to_string();
        let child = definition.harvest();

        let mut ownership = OwnershipTable::new();
        tag_members(&mut ownership, &child.members, &name, Some(&parent_name));

        let mut members: IndexMap<String, Member> = IndexMap::new();
        let mut trait_sources = Vec::with_capacity(options.also.len());
        for source in &options.also {
            trait_sources.push(source.label());
            match source {
                TraitSource::Class(class) => {
                    for (key, member) in class.own_members() {
                        if key == CONSTRUCTOR {
                            continue;
                        }
                        if !child.members.contains_key(&key) {
                            ownership.inherit(&key, class.ownership(&key).as_ref());
                        }
                        members.insert(key, member);
                    }
                }
                TraitSource::Definition(trait_definition) => {
                    for (key, member) in trait_definition.harvest().members {
                        if key == CONSTRUCTOR {
                            continue;
                        }
                        if !child.members.contains_key(&key) {
                            ownership.clear(&key);
                        }
                        members.insert(key, member);
                    }
                }
            }
        }
        members.extend(child.members);
        tag_members(&mut ownership, &members, &name, Some(&parent_name));

        let mut statics = origin.statics();
        let mut static_ownership = origin.static_ownership_table();
        for (key, member) in child.statics {
            static_ownership.clear(&key);
            statics.insert(key, member);
        }
        tag_members(&mut static_ownership, &statics, &name, Some(&parent_name));

        let class = Rc::new(ClassDefinition::from_parts(ClassParts {
            name: name.clone(),
            parent: Some(Rc::clone(origin)),
            members,
            statics,
            ownership,
            static_ownership,
            trait_sources,
            hooks: origin.hooks().layered(&child.hooks),
        }));
        debug!(
            class = %name,
            parent = %parent_name,
            register,
            overloading = options.overloading,
            "derived class"
        );

        if register {
            let displaced = self.register(&class);
            if displaced.is_some() && !options.overloading && self.config().warn_on_reregister {
                let message = format!(
                    "Class {} is already registered; extending over it replaces it. Use overload instead",
                    name
                );
                warn!(class = %name, "{}", message);
                self.report(Diagnostic::new(
                    DiagnosticKind::ExtendOverRegistered,
                    name.clone(),
                    None,
                    message,
                ));
            }
        }

        if let Some(hook) = origin.hooks().extended.clone() {
            hook.invoke(self, origin, &class)?;
        }

        // Queued overloads land before any subscriber can look the name up.
        // An overloading derivation leaves the queue to the loop driving it.
        if register && !options.overloading {
            self.apply_pending_overloads(&name)?;
        }

        self.publish(Topic::Extended, &ClassEvent::new(ClassEventKind::Extended, &class, origin));
        self.publish(
            Topic::ExtendedNamed(name.clone()),
            &ClassEvent::new(ClassEventKind::Extended, &class, origin),
        );
        self.record_derivation();

        if options.overloading {
            if let Some(hook) = class.hooks().overloaded.clone() {
                hook.invoke(self, origin, &class)?;
            }
            self.publish(
                Topic::Overloaded(name.clone()),
                &ClassEvent::new(ClassEventKind::Overloaded, &class, origin),
            );
        }

        Ok(class)
    }

    /// Derive a new class from the class registered under `origin`
    ///
    /// # Errors
    ///
    /// `UnknownClass` if nothing is registered under `origin`.
    pub fn extend_named(
        &self,
        origin: &str,
        definition: &Definition,
        options: ExtendOptions,
    ) -> ClassResult<ClassRef> {
        let origin = self.require(origin)?;
        self.extend(&origin, definition, options)
    }
}
