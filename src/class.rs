// Copyright 2025 Cowboy AI, LLC.

//! Class definitions
//!
//! A [`ClassDefinition`] is produced by the derivation engine and shared
//! through [`ClassRef`]. Instances hold the `ClassRef` they were built from,
//! so replacing a registry entry later never changes an existing instance.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::definition::{ClassHooks, Definition, MemberCollector};
use crate::dispatch::Call;
use crate::errors::ClassResult;
use crate::extend::ExtendOptions;
use crate::instance::Object;
use crate::member::{Member, Method};
use crate::overload::OverloadOutcome;
use crate::ownership::{tag_members, Ownership, OwnershipTable};
use crate::runtime::Runtime;

/// Shared handle to a class definition
pub type ClassRef = Rc<ClassDefinition>;

/// A member resolved on a class chain, with the class that declares it
#[derive(Debug, Clone)]
pub struct ResolvedMember {
    /// The member value
    pub member: Member,
    /// Class whose own mapping holds the member
    pub class: ClassRef,
    /// Ownership tag for the member in that class, if any
    pub ownership: Option<Ownership>,
}

/// Everything the derivation engine composes for a new class
pub(crate) struct ClassParts {
    pub name: String,
    pub parent: Option<ClassRef>,
    pub members: IndexMap<String, Member>,
    pub statics: IndexMap<String, Member>,
    pub ownership: OwnershipTable,
    pub static_ownership: OwnershipTable,
    pub trait_sources: Vec<String>,
    pub hooks: ClassHooks,
}

/// A composed class: template members, statics, ownership and a parent link
pub struct ClassDefinition {
    id: Uuid,
    name: String,
    parent: Option<ClassRef>,
    members: RefCell<IndexMap<String, Member>>,
    statics: RefCell<IndexMap<String, Member>>,
    ownership: RefCell<OwnershipTable>,
    static_ownership: RefCell<OwnershipTable>,
    trait_sources: Vec<String>,
    hooks: ClassHooks,
    registered: Cell<bool>,
}

impl ClassDefinition {
    pub(crate) fn from_parts(parts: ClassParts) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: parts.name,
            parent: parts.parent,
            members: RefCell::new(parts.members),
            statics: RefCell::new(parts.statics),
            ownership: RefCell::new(parts.ownership),
            static_ownership: RefCell::new(parts.static_ownership),
            trait_sources: parts.trait_sources,
            hooks: parts.hooks,
            registered: Cell::new(false),
        }
    }

    /// Build the root of a hierarchy from a harvested body
    pub(crate) fn root(name: &str, body: MemberCollector) -> Self {
        let mut ownership = OwnershipTable::new();
        tag_members(&mut ownership, &body.members, name, None);
        let mut static_ownership = OwnershipTable::new();
        tag_members(&mut static_ownership, &body.statics, name, None);

        Self::from_parts(ClassParts {
            name: name.to_string(),
            parent: None,
            members: body.members,
            statics: body.statics,
            ownership,
            static_ownership,
            trait_sources: Vec::new(),
            hooks: body.hooks,
        })
    }

    /// Unique id of this definition (distinct across overloads of a name)
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Class name; empty for anonymous classes
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class this one derives from
    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_ref()
    }

    /// Name of the parent class
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref().map(ClassDefinition::name)
    }

    /// This class followed by its ancestors up to the root
    pub fn chain(&self) -> impl Iterator<Item = &ClassDefinition> {
        std::iter::successors(Some(self), |class| class.parent.as_deref())
    }

    /// Names along the chain, most derived first
    pub fn lineage(&self) -> Vec<String> {
        self.chain().map(|class| class.name.clone()).collect()
    }

    /// Whether this class is, or derives from, a class with the given name
    pub fn is_a(&self, name: &str) -> bool {
        self.chain().any(|class| class.name == name)
    }

    /// Names of the trait sources merged into this class, in merge order
    pub fn trait_sources(&self) -> &[String] {
        &self.trait_sources
    }

    /// Whether this definition was ever installed in a registry
    pub fn is_registered(&self) -> bool {
        self.registered.get()
    }

    pub(crate) fn mark_registered(&self) {
        self.registered.set(true);
    }

    pub(crate) fn hooks(&self) -> &ClassHooks {
        &self.hooks
    }

    /// Check whether this class's own mapping declares a member
    pub fn has_own_member(&self, name: &str) -> bool {
        self.members.borrow().contains_key(name)
    }

    /// Member declared directly on this class
    pub fn own_member(&self, name: &str) -> Option<Member> {
        self.members.borrow().get(name).cloned()
    }

    /// Snapshot of this class's own mapping, in declaration order
    pub fn own_members(&self) -> IndexMap<String, Member> {
        self.members.borrow().clone()
    }

    /// Every member name visible on the chain, most derived first
    pub fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for class in self.chain() {
            for name in class.members.borrow().keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Resolve a template member along the chain, starting at this class
    pub fn lookup_member(self: &Rc<Self>, name: &str) -> Option<ResolvedMember> {
        let mut current = Some(Rc::clone(self));
        while let Some(class) = current {
            let found = class.members.borrow().get(name).cloned();
            if let Some(member) = found {
                let ownership = class.ownership(name);
                return Some(ResolvedMember {
                    member,
                    class,
                    ownership,
                });
            }
            current = class.parent.clone();
        }
        None
    }

    /// Class-level member
    pub fn static_member(&self, name: &str) -> Option<Member> {
        self.statics.borrow().get(name).cloned()
    }

    /// Snapshot of the class-level members
    pub fn statics(&self) -> IndexMap<String, Member> {
        self.statics.borrow().clone()
    }

    pub(crate) fn resolve_static(self: &Rc<Self>, name: &str) -> Option<ResolvedMember> {
        let member = self.static_member(name)?;
        Some(ResolvedMember {
            member,
            class: Rc::clone(self),
            ownership: self.static_ownership.borrow().get(name).cloned(),
        })
    }

    /// Ownership recorded for a template member of this class
    pub fn ownership(&self, name: &str) -> Option<Ownership> {
        self.ownership.borrow().get(name).cloned()
    }

    /// Ownership recorded for a class-level member
    pub fn static_ownership(&self, name: &str) -> Option<Ownership> {
        self.static_ownership.borrow().get(name).cloned()
    }

    pub(crate) fn static_ownership_table(&self) -> OwnershipTable {
        self.static_ownership.borrow().clone()
    }

    /// Record ownership discovered after derivation
    pub(crate) fn tag(&self, name: &str, ownership: Ownership) -> bool {
        self.ownership.borrow_mut().tag(name, ownership)
    }

    /// Attach or replace a method on the template after derivation
    ///
    /// The new function starts untagged; the first `parent()` call from it
    /// finds its owner by searching the chain.
    pub fn define_method<F>(&self, name: impl Into<String>, body: F)
    where
        F: Fn(&mut Call<'_>) -> ClassResult<Value> + 'static,
    {
        self.define_member(name, Member::Method(Method::new(body)));
    }

    /// Attach or replace a data member on the template after derivation
    pub fn define_data(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.define_member(name, Member::Data(value.into()));
    }

    /// Attach or replace a template member after derivation
    pub fn define_member(&self, name: impl Into<String>, member: Member) {
        let name = name.into();
        debug!(class = %self.name, member = %name, "patching class template");
        self.ownership.borrow_mut().clear(&name);
        self.members.borrow_mut().insert(name, member);
    }

    /// Data members declared on this level, used for internal construction
    pub(crate) fn own_data(&self) -> Vec<(String, Value)> {
        self.members
            .borrow()
            .iter()
            .filter_map(|(name, member)| {
                member.as_data().map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }

    /// Derive a new class from this one
    pub fn extend(
        self: &Rc<Self>,
        runtime: &Runtime,
        definition: &Definition,
        options: ExtendOptions,
    ) -> ClassResult<ClassRef> {
        runtime.extend(self, definition, options)
    }

    /// Replace the registered definition under this class's name
    pub fn overload(&self, runtime: &Runtime, definition: Definition) -> ClassResult<OverloadOutcome> {
        runtime.overload(&self.name, definition)
    }

    /// Construct an instance of this class
    pub fn instantiate(self: &Rc<Self>, runtime: &Runtime, args: Vec<Value>) -> ClassResult<Object> {
        runtime.instantiate(self, args)
    }
}

impl fmt::Debug for ClassDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<String> = self.members.borrow().keys().cloned().collect();
        f.debug_struct("ClassDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent_name())
            .field("members", &members)
            .field("trait_sources", &self.trait_sources)
            .field("registered", &self.registered.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn class(name: &str, parent: Option<ClassRef>, body: impl Fn(&mut MemberCollector)) -> ClassRef {
        let mut collector = MemberCollector::default();
        body(&mut collector);
        let parent_name = parent.as_ref().map(|p| p.name().to_string());
        let mut ownership = OwnershipTable::new();
        tag_members(&mut ownership, &collector.members, name, parent_name.as_deref());
        Rc::new(ClassDefinition::from_parts(ClassParts {
            name: name.to_string(),
            parent,
            members: collector.members,
            statics: collector.statics,
            ownership,
            static_ownership: OwnershipTable::new(),
            trait_sources: Vec::new(),
            hooks: collector.hooks,
        }))
    }

    /// Lookup walks the chain and reports the declaring class
    ///
    /// ```mermaid
    /// graph BT
    ///     Dog --> Animal
    ///     Animal --> Root
    /// ```
    #[test]
    fn test_lookup_walks_chain() {
        let root = Rc::new(ClassDefinition::root("Root", {
            let mut c = MemberCollector::default();
            c.method("init", |_| Ok(Value::Null));
            c
        }));
        let animal = class("Animal", Some(root.clone()), |m| {
            m.method("speak", |_| Ok(Value::Null));
        });
        let dog = class("Dog", Some(animal.clone()), |m| {
            m.data("color", "brown");
        });

        let speak = dog.lookup_member("speak").unwrap();
        assert_eq!(speak.class.name(), "Animal");
        assert_eq!(
            speak.ownership,
            Some(Ownership::new("Animal", Some("Root")))
        );

        let init = dog.lookup_member("init").unwrap();
        assert_eq!(init.class.name(), "Root");
        assert_eq!(init.ownership, Some(Ownership::new("Root", None::<String>)));

        assert!(dog.lookup_member("fly").is_none());
        assert_eq!(dog.lineage(), vec!["Dog", "Animal", "Root"]);
        assert!(dog.is_a("Root"));
        assert!(!animal.is_a("Dog"));
    }

    #[test]
    fn test_member_names_deduplicate() {
        let animal = class("Animal", None, |m| {
            m.method("speak", |_| Ok(Value::Null));
            m.data("legs", 4);
        });
        let dog = class("Dog", Some(animal), |m| {
            m.method("speak", |_| Ok(Value::Null));
        });
        assert_eq!(dog.member_names(), vec!["speak", "legs"]);
    }

    #[test]
    fn test_define_method_clears_tag() {
        let animal = class("Animal", None, |m| {
            m.method("speak", |_| Ok(Value::Null));
        });
        assert!(animal.ownership("speak").is_some());

        animal.define_method("speak", |_| Ok(Value::from("patched")));
        assert!(animal.ownership("speak").is_none());
        assert!(animal.has_own_member("speak"));

        animal.define_data("legs", 4);
        assert_eq!(animal.own_data(), vec![("legs".to_string(), json!(4))]);
    }

    #[test]
    fn test_debug_lists_members() {
        let animal = class("Animal", None, |m| {
            m.data("legs", 4);
        });
        let debug = format!("{:?}", animal);
        assert!(debug.contains("Animal"));
        assert!(debug.contains("legs"));
    }
}
