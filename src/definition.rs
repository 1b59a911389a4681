// Copyright 2025 Cowboy AI, LLC.

//! Extension definitions and the member collector they populate
//!
//! A [`Definition`] is a builder closure. Deriving a class runs it exactly
//! once against a fresh [`MemberCollector`] and takes whatever the closure
//! declared as the new level's own members, statics and class hooks.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::class::ClassRef;
use crate::dispatch::Call;
use crate::errors::ClassResult;
use crate::member::{Member, Method};
use crate::runtime::Runtime;

/// Instance hook run before `init`
pub const PRE_INIT: &str = "pre_init";
/// Main initialization hook
pub const INIT: &str = "init";
/// Instance hook run after `init`
pub const POST_INIT: &str = "post_init";
/// Instance hook run on a freshly augmented view
pub const AUGMENTED: &str = "augmented";
/// Member name never merged from a trait source
pub const CONSTRUCTOR: &str = "constructor";

type ClassHookFn = dyn Fn(&Runtime, &ClassRef, &ClassRef) -> ClassResult<()>;

/// Class-level hook receiving `(origin, new_class)`
#[derive(Clone)]
pub struct ClassHook {
    body: Rc<ClassHookFn>,
}

impl ClassHook {
    /// Wrap a closure as a class hook
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Runtime, &ClassRef, &ClassRef) -> ClassResult<()> + 'static,
    {
        Self {
            body: Rc::new(body),
        }
    }

    pub(crate) fn invoke(
        &self,
        runtime: &Runtime,
        origin: &ClassRef,
        class: &ClassRef,
    ) -> ClassResult<()> {
        (self.body)(runtime, origin, class)
    }
}

impl fmt::Debug for ClassHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClassHook")
    }
}

/// Hooks a class exposes to the derivation engine
#[derive(Debug, Clone, Default)]
pub struct ClassHooks {
    /// Runs when this class is used as the origin of a derivation
    pub extended: Option<ClassHook>,
    /// Runs when a derivation of this class replaces a registered name
    pub overloaded: Option<ClassHook>,
}

impl ClassHooks {
    /// Hooks of `self` with any hook present in `over` taking its place
    pub fn layered(&self, over: &ClassHooks) -> ClassHooks {
        ClassHooks {
            extended: over.extended.clone().or_else(|| self.extended.clone()),
            overloaded: over.overloaded.clone().or_else(|| self.overloaded.clone()),
        }
    }
}

/// Collects the members a definition declares
#[derive(Debug, Default)]
pub struct MemberCollector {
    pub(crate) members: IndexMap<String, Member>,
    pub(crate) statics: IndexMap<String, Member>,
    pub(crate) hooks: ClassHooks,
}

impl MemberCollector {
    /// Declare an instance-level method
    pub fn method<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&mut Call<'_>) -> ClassResult<Value> + 'static,
    {
        self.members
            .insert(name.into(), Member::Method(Method::new(body)));
        self
    }

    /// Declare an instance-level data member; every instance gets its own copy
    pub fn data(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.members.insert(name.into(), Member::Data(value.into()));
        self
    }

    /// Declare an instance-level member of either kind
    pub fn member(&mut self, name: impl Into<String>, member: Member) -> &mut Self {
        self.members.insert(name.into(), member);
        self
    }

    /// Declare a class-level method
    pub fn static_method<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&mut Call<'_>) -> ClassResult<Value> + 'static,
    {
        self.statics
            .insert(name.into(), Member::Method(Method::new(body)));
        self
    }

    /// Declare a class-level data member
    pub fn static_data(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.statics.insert(name.into(), Member::Data(value.into()));
        self
    }

    /// Hook invoked with `(origin, new_class)` whenever this class is derived from
    pub fn on_extended<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Runtime, &ClassRef, &ClassRef) -> ClassResult<()> + 'static,
    {
        self.hooks.extended = Some(ClassHook::new(hook));
        self
    }

    /// Hook invoked with `(origin, new_class)` after an overload replaces this class
    pub fn on_overloaded<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Runtime, &ClassRef, &ClassRef) -> ClassResult<()> + 'static,
    {
        self.hooks.overloaded = Some(ClassHook::new(hook));
        self
    }

    /// Names declared so far, in declaration order
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }
}

type DefinitionBody = dyn Fn(&mut MemberCollector);

/// An extension definition: a name plus a body that declares members
///
/// # Example
///
/// ```
/// use cim_class::Definition;
/// use serde_json::Value;
///
/// let dog = Definition::new("Dog", |m| {
///     m.data("legs", 4);
///     m.method("speak", |_call| Ok(Value::from("woof")));
/// });
/// assert_eq!(dog.name(), Some("Dog"));
/// ```
#[derive(Clone)]
pub struct Definition {
    name: Option<String>,
    body: Rc<DefinitionBody>,
}

impl Definition {
    /// Create a named definition
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut MemberCollector) + 'static,
    {
        Self {
            name: Some(name.into()),
            body: Rc::new(body),
        }
    }

    /// Create a definition with no declared name; it is never registered
    /// unless a name is supplied through the extend options
    pub fn anonymous<F>(body: F) -> Self
    where
        F: Fn(&mut MemberCollector) + 'static,
    {
        Self {
            name: None,
            body: Rc::new(body),
        }
    }

    /// Declared name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Same body under a different declared name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            body: Rc::clone(&self.body),
        }
    }

    /// Run the body once and return what it declared
    pub(crate) fn harvest(&self) -> MemberCollector {
        let mut collector = MemberCollector::default();
        (self.body)(&mut collector);
        collector
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
