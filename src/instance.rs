// Copyright 2025 Cowboy AI, LLC.

//! Instances and construction
//!
//! Property reads check the instance's own properties first, then the
//! instance it augments (if any), then the class template chain. Writes
//! always land on the instance's own properties.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;
use uuid::Uuid;

use crate::augment::Augmentation;
use crate::class::{ClassRef, ResolvedMember};
use crate::definition::{INIT, POST_INIT, PRE_INIT};
use crate::dispatch::{invoke, Frame};
use crate::errors::{ClassError, ClassResult};
use crate::member::{Member, Method};
use crate::runtime::Runtime;

/// Shared handle to an instance
pub type Object = Rc<Instance>;

/// How an instance is being constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstructMode {
    /// Regular construction: internal construction, then the init hooks
    #[default]
    Instancing,
    /// Structural scaffold only; no initialization hook ever runs
    Extending,
}

/// Options for [`Runtime::construct`]
#[derive(Debug, Clone, Default)]
pub struct ConstructOptions {
    /// Construction mode
    pub mode: ConstructMode,
    /// Arguments passed to the constructor
    pub args: Vec<Value>,
    /// Arguments handed to the init hooks instead of `args`
    pub override_args: Option<Vec<Value>>,
}

impl ConstructOptions {
    /// Regular construction with the given arguments
    pub fn new(args: Vec<Value>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    /// Scaffold construction; hooks are suppressed
    pub fn extending() -> Self {
        Self {
            mode: ConstructMode::Extending,
            ..Self::default()
        }
    }

    /// Hand these arguments to the init hooks instead of the constructor args
    pub fn with_override_args(mut self, args: Vec<Value>) -> Self {
        self.override_args = Some(args);
        self
    }

    fn hook_args(&self) -> &[Value] {
        self.override_args.as_deref().unwrap_or(&self.args)
    }
}

/// An object built from a class, or an augmented view of another instance
pub struct Instance {
    id: Uuid,
    class: ClassRef,
    properties: RefCell<IndexMap<String, Member>>,
    base: Option<Object>,
    augment_source: Option<Augmentation>,
}

impl Instance {
    pub(crate) fn bare(class: ClassRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            class,
            properties: RefCell::new(IndexMap::new()),
            base: None,
            augment_source: None,
        }
    }

    pub(crate) fn view(base: &Object, properties: IndexMap<String, Member>, source: Option<Augmentation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            class: Rc::clone(&base.class),
            properties: RefCell::new(properties),
            base: Some(Rc::clone(base)),
            augment_source: source,
        }
    }

    /// Build an instance: internal construction top-down, then the init
    /// hooks of the instance's class unless the mode is `Extending`
    pub(crate) fn construct(
        runtime: &Runtime,
        class: &ClassRef,
        options: &ConstructOptions,
    ) -> ClassResult<Object> {
        let object = Rc::new(Instance::bare(Rc::clone(class)));

        let levels: Vec<_> = class.chain().collect();
        for level in levels.into_iter().rev() {
            for (name, value) in level.own_data() {
                object.set(name, value);
            }
        }

        if options.mode == ConstructMode::Extending {
            trace!(class = %class.name(), "scaffold constructed without hooks");
            return Ok(object);
        }

        for hook in [PRE_INIT, INIT, POST_INIT] {
            if let Some(resolved) = object.resolve(hook) {
                if let Member::Method(method) = &resolved.member {
                    invoke(
                        runtime,
                        &object,
                        Frame::resolved(hook, method, &resolved),
                        options.hook_args(),
                    )?;
                }
            }
        }
        Ok(object)
    }

    /// Unique id of this instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The definition this instance was built from
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// The instance this one augments
    pub fn base(&self) -> Option<&Object> {
        self.base.as_ref()
    }

    /// The addition that produced this augmented view
    pub fn augment_source(&self) -> Option<&Augmentation> {
        self.augment_source.as_ref()
    }

    /// Whether a property is set directly on this instance
    pub fn has_own_property(&self, name: &str) -> bool {
        self.properties.borrow().contains_key(name)
    }

    /// Names of the properties set directly on this instance
    pub fn own_property_names(&self) -> Vec<String> {
        self.properties.borrow().keys().cloned().collect()
    }

    fn own_property(&self, name: &str) -> Option<Member> {
        let own = self.properties.borrow().get(name).cloned();
        own.or_else(|| self.base.as_ref().and_then(|base| base.own_property(name)))
    }

    /// Resolve a member as a method call would see it
    pub fn resolve(&self, name: &str) -> Option<ResolvedMember> {
        if let Some(member) = self.own_property(name) {
            return Some(ResolvedMember {
                member,
                class: Rc::clone(&self.class),
                ownership: None,
            });
        }
        self.class.lookup_member(name)
    }

    /// Read a member
    pub fn get(&self, name: &str) -> Option<Member> {
        self.resolve(name).map(|resolved| resolved.member)
    }

    /// Read a data member
    pub fn get_value(&self, name: &str) -> Option<Value> {
        self.get(name).and_then(|member| member.as_data().cloned())
    }

    /// Set a data property on this instance
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.set_member(name, Member::Data(value.into()));
    }

    /// Set a property of either kind on this instance
    pub fn set_member(&self, name: impl Into<String>, member: Member) {
        self.properties.borrow_mut().insert(name.into(), member);
    }

    /// Invoke a method by name
    ///
    /// # Errors
    ///
    /// `MissingMember` when nothing resolves, `NotCallable` for data, and
    /// whatever the method body itself returns.
    pub fn call(self: &Rc<Self>, runtime: &Runtime, name: &str, args: Vec<Value>) -> ClassResult<Value> {
        let resolved = self.resolve(name).ok_or_else(|| ClassError::MissingMember {
            class: self.class.name().to_string(),
            member: name.to_string(),
        })?;
        match &resolved.member {
            Member::Method(method) => invoke(runtime, self, Frame::resolved(name, method, &resolved), &args),
            Member::Data(_) => Err(ClassError::NotCallable {
                class: self.class.name().to_string(),
                member: name.to_string(),
            }),
        }
    }

    /// Invoke a detached method with this instance as receiver
    ///
    /// The call has no member name, so `parent()` inside it is a no-op
    /// unless a member name is given explicitly.
    pub fn apply(self: &Rc<Self>, runtime: &Runtime, method: &Method, args: Vec<Value>) -> ClassResult<Value> {
        invoke(runtime, self, Frame::detached(method, &self.class), &args)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("class", &self.class.name())
            .field("properties", &self.own_property_names())
            .field("augmented", &self.base.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Definition;
    use crate::extend::ExtendOptions;
    use serde_json::json;

    #[test]
    fn test_construction_copies_data_top_down() {
        let runtime = Runtime::new();
        let animal = runtime
            .extend(
                runtime.root(),
                &Definition::new("Animal", |m| {
                    m.data("legs", 4).data("sound", "...");
                }),
                ExtendOptions::default(),
            )
            .unwrap();
        let bird = animal
            .extend(
                &runtime,
                &Definition::new("Bird", |m| {
                    m.data("legs", 2);
                }),
                ExtendOptions::default(),
            )
            .unwrap();

        let tweety = runtime.instantiate(&bird, vec![]).unwrap();
        assert_eq!(tweety.get_value("legs"), Some(json!(2)));
        assert_eq!(tweety.get_value("sound"), Some(json!("...")));
        assert!(tweety.has_own_property("legs"));
        assert_eq!(tweety.class().name(), "Bird");
    }

    #[test]
    fn test_instances_do_not_share_data() {
        let runtime = Runtime::new();
        let bag = runtime
            .extend(
                runtime.root(),
                &Definition::new("Bag", |m| {
                    m.data("items", json!([]));
                }),
                ExtendOptions::default(),
            )
            .unwrap();

        let a = runtime.instantiate(&bag, vec![]).unwrap();
        let b = runtime.instantiate(&bag, vec![]).unwrap();
        a.set("items", json!(["apple"]));

        assert_eq!(b.get_value("items"), Some(json!([])));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_call_errors() {
        let runtime = Runtime::new();
        let thing = runtime
            .extend(
                runtime.root(),
                &Definition::new("Thing", |m| {
                    m.data("weight", 3);
                }),
                ExtendOptions::default(),
            )
            .unwrap();
        let object = runtime.instantiate(&thing, vec![]).unwrap();

        assert!(matches!(
            object.call(&runtime, "fly", vec![]),
            Err(ClassError::MissingMember { .. })
        ));
        assert!(matches!(
            object.call(&runtime, "weight", vec![]),
            Err(ClassError::NotCallable { .. })
        ));
    }

    #[test]
    fn test_extending_mode_skips_hooks() {
        let runtime = Runtime::new();
        let loud = runtime
            .extend(
                runtime.root(),
                &Definition::new("Loud", |m| {
                    m.data("ready", false);
                    m.method(INIT, |call| {
                        call.set("ready", true);
                        Ok(Value::Null)
                    });
                }),
                ExtendOptions::default(),
            )
            .unwrap();

        let scaffold = runtime
            .construct(&loud, ConstructOptions::extending())
            .unwrap();
        assert_eq!(scaffold.get_value("ready"), Some(json!(false)));

        let real = runtime.instantiate(&loud, vec![]).unwrap();
        assert_eq!(real.get_value("ready"), Some(json!(true)));
    }

    #[test]
    fn test_override_args_reach_init() {
        let runtime = Runtime::new();
        let echo = runtime
            .extend(
                runtime.root(),
                &Definition::new("Echo", |m| {
                    m.method(INIT, |call| {
                        let first = call.arg(0).cloned().unwrap_or(Value::Null);
                        call.set("heard", first);
                        Ok(Value::Null)
                    });
                }),
                ExtendOptions::default(),
            )
            .unwrap();

        let options = ConstructOptions::new(vec![json!("ignored")])
            .with_override_args(vec![json!("override")]);
        let object = runtime.construct(&echo, options).unwrap();
        assert_eq!(object.get_value("heard"), Some(json!("override")));
    }
}
