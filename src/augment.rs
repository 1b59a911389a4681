// Copyright 2025 Cowboy AI, LLC.

//! Instance augmentation
//!
//! `augment` produces a new object that shadows a few properties and reads
//! everything else through to the original. The original is never touched,
//! and later changes to it stay visible through the view.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::definition::AUGMENTED;
use crate::dispatch::{invoke, Frame, Call};
use crate::errors::ClassResult;
use crate::instance::{Instance, Object};
use crate::member::{Member, Method};
use crate::runtime::Runtime;

/// What an instance is augmented with
///
/// Only a mapping contributes properties. Any other value is still handed
/// to the `augmented` hook but adds nothing to the view.
#[derive(Debug, Clone)]
pub enum Augmentation {
    /// Properties to shadow on the new view
    Mapping(IndexMap<String, Member>),
    /// A non-mapping addition
    Value(Value),
}

impl Default for Augmentation {
    fn default() -> Self {
        Augmentation::Mapping(IndexMap::new())
    }
}

impl Augmentation {
    /// Empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a data property to a mapping augmentation
    pub fn data(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_member(name, Member::Data(value.into()))
    }

    /// Add a method to a mapping augmentation
    pub fn method<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Call<'_>) -> ClassResult<Value> + 'static,
    {
        self.with_member(name, Member::Method(Method::new(body)))
    }

    fn with_member(self, name: impl Into<String>, member: Member) -> Self {
        let mut members = match self {
            Augmentation::Mapping(members) => members,
            Augmentation::Value(_) => IndexMap::new(),
        };
        members.insert(name.into(), member);
        Augmentation::Mapping(members)
    }

    /// Check if this addition is a mapping
    pub fn is_mapping(&self) -> bool {
        matches!(self, Augmentation::Mapping(_))
    }

    /// The mapping's members
    pub fn members(&self) -> Option<&IndexMap<String, Member>> {
        match self {
            Augmentation::Mapping(members) => Some(members),
            Augmentation::Value(_) => None,
        }
    }

    /// Member of the mapping by name
    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members().and_then(|members| members.get(name))
    }

    /// JSON form handed to the `augmented` hook
    ///
    /// Methods have no JSON form and are left out, so a method-only mapping
    /// becomes `{}`. The hook reaches the full addition, methods included,
    /// through `call.this().augment_source()`.
    pub fn to_value(&self) -> Value {
        match self {
            Augmentation::Mapping(members) => {
                let object: Map<String, Value> = members
                    .iter()
                    .filter_map(|(name, member)| {
                        member.as_data().map(|value| (name.clone(), value.clone()))
                    })
                    .collect();
                Value::Object(object)
            }
            Augmentation::Value(value) => value.clone(),
        }
    }
}

impl From<Value> for Augmentation {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(object) => Augmentation::Mapping(
                object
                    .into_iter()
                    .map(|(name, value)| (name, Member::Data(value)))
                    .collect(),
            ),
            other => Augmentation::Value(other),
        }
    }
}

impl From<IndexMap<String, Member>> for Augmentation {
    fn from(members: IndexMap<String, Member>) -> Self {
        Augmentation::Mapping(members)
    }
}

impl Instance {
    /// Create a shadowing view of this instance
    ///
    /// The view's own properties are the addition's members; every other
    /// read falls through to this instance. If the view resolves an
    /// `augmented` hook it runs immediately with the addition's data (see
    /// [`Augmentation::to_value`]), and its failure is returned as-is.
    ///
    /// ```mermaid
    /// graph LR
    ///     V[view: addition] -->|miss| O[original]
    ///     O -->|miss| C[class chain]
    /// ```
    pub fn augment(
        self: &Rc<Self>,
        runtime: &Runtime,
        addition: impl Into<Augmentation>,
    ) -> ClassResult<Object> {
        let addition = addition.into();
        let (properties, source) = match &addition {
            Augmentation::Mapping(members) => (members.clone(), Some(addition.clone())),
            Augmentation::Value(_) => (IndexMap::new(), None),
        };
        debug!(
            class = %self.class().name(),
            properties = properties.len(),
            "augmenting instance"
        );
        let view = Rc::new(Instance::view(self, properties, source));

        if let Some(resolved) = view.resolve(AUGMENTED) {
            if let Member::Method(method) = &resolved.member {
                invoke(
                    runtime,
                    &view,
                    Frame::resolved(AUGMENTED, method, &resolved),
                    &[addition.to_value()],
                )?;
            }
        }
        Ok(view)
    }
}
