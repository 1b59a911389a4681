// Copyright 2025 Cowboy AI, LLC.

//! Method invocation and parent dispatch
//!
//! Every method runs with a [`Call`] frame that knows the receiver, the
//! member name it was invoked under, its arguments, and the ownership tag of
//! the executing function. `parent()` uses that tag to continue one level up
//! the hierarchy; an untagged function (patched in after derivation) finds
//! its owner by searching the chain once and caching the result.
//!
//! Resolution misses never fail: they return `Ok(None)`.

use std::rc::Rc;

use serde_json::Value;
use tracing::{trace, warn};

use crate::class::{ClassDefinition, ClassRef, ResolvedMember};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::errors::{ClassError, ClassResult};
use crate::instance::{ConstructOptions, Instance, Object};
use crate::member::{Member, Method};
use crate::ownership::Ownership;
use crate::runtime::Runtime;

/// Argument list handed to the parent implementation
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ArgumentStrategy {
    /// Reuse the arguments the executing method was called with
    #[default]
    CallingArguments,
    /// Use this list as the argument list
    Explicit(Vec<Value>),
    /// Use the trailing values given to the parent call itself
    Trailing(Vec<Value>),
}

impl ArgumentStrategy {
    fn resolve(self, calling: &[Value]) -> Vec<Value> {
        match self {
            ArgumentStrategy::CallingArguments => calling.to_vec(),
            ArgumentStrategy::Explicit(args) | ArgumentStrategy::Trailing(args) => args,
        }
    }
}

/// A parent dispatch request
///
/// # Example
///
/// ```
/// use cim_class::{ArgumentStrategy, ParentCall};
/// use serde_json::json;
///
/// let request = ParentCall::new().member("greet").trailing(vec![json!("hi")]);
/// assert_eq!(request.member_name(), Some("greet"));
/// assert_eq!(request.arguments(), &ArgumentStrategy::Trailing(vec![json!("hi")]));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentCall {
    member: Option<String>,
    arguments: ArgumentStrategy,
}

impl ParentCall {
    /// Same member as the executing method, with its calling arguments
    pub fn new() -> Self {
        Self::default()
    }

    /// Target a specific member instead of the executing one
    pub fn member(mut self, name: impl Into<String>) -> Self {
        self.member = Some(name.into());
        self
    }

    /// Reuse the calling arguments (the default)
    pub fn calling_arguments(mut self) -> Self {
        self.arguments = ArgumentStrategy::CallingArguments;
        self
    }

    /// Pass an explicit argument list
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.arguments = ArgumentStrategy::Explicit(args);
        self
    }

    /// Pass trailing values as the argument list
    pub fn trailing(mut self, args: Vec<Value>) -> Self {
        self.arguments = ArgumentStrategy::Trailing(args);
        self
    }

    /// Requested member name, if one was given
    pub fn member_name(&self) -> Option<&str> {
        self.member.as_deref()
    }

    /// Selected argument strategy
    pub fn arguments(&self) -> &ArgumentStrategy {
        &self.arguments
    }
}

/// Identity of a method about to run
pub(crate) struct Frame<'a> {
    name: &'a str,
    method: Method,
    class: ClassRef,
    ownership: Option<Ownership>,
}

impl<'a> Frame<'a> {
    pub(crate) fn resolved(name: &'a str, method: &Method, resolved: &ResolvedMember) -> Self {
        Self {
            name,
            method: method.clone(),
            class: Rc::clone(&resolved.class),
            ownership: resolved.ownership.clone(),
        }
    }

    pub(crate) fn detached(method: &Method, class: &ClassRef) -> Self {
        Self {
            name: "",
            method: method.clone(),
            class: Rc::clone(class),
            ownership: None,
        }
    }
}

/// Run a method against a receiver
pub(crate) fn invoke(runtime: &Runtime, this: &Object, frame: Frame<'_>, args: &[Value]) -> ClassResult<Value> {
    let method = frame.method.clone();
    let mut call = Call {
        runtime,
        this,
        name: frame.name,
        args,
        method: frame.method,
        class: frame.class,
        ownership: frame.ownership,
    };
    method.invoke(&mut call)
}

/// The frame of an executing method
pub struct Call<'a> {
    runtime: &'a Runtime,
    this: &'a Object,
    name: &'a str,
    args: &'a [Value],
    method: Method,
    class: ClassRef,
    ownership: Option<Ownership>,
}

impl<'a> Call<'a> {
    /// The runtime the method runs in
    pub fn runtime(&self) -> &'a Runtime {
        self.runtime
    }

    /// The receiver
    pub fn this(&self) -> &'a Object {
        self.this
    }

    /// Member name the method was invoked under; empty for detached calls
    pub fn name(&self) -> &str {
        self.name
    }

    /// Arguments of this call
    pub fn args(&self) -> &[Value] {
        self.args
    }

    /// Argument at a position
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Class in which the executing method was found
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Ownership of the executing method, once known
    pub fn ownership(&self) -> Option<&Ownership> {
        self.ownership.as_ref()
    }

    /// Read a data property of the receiver
    pub fn get(&self, name: &str) -> Option<Value> {
        self.this.get_value(name)
    }

    /// Set a data property on the receiver
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.this.set(name, value);
    }

    /// Invoke another method on the receiver
    pub fn call(&self, name: &str, args: Vec<Value>) -> ClassResult<Value> {
        self.this.call(self.runtime, name, args)
    }

    /// Invoke the same member one level up, with the calling arguments
    pub fn parent(&mut self) -> ClassResult<Option<Value>> {
        self.parent_with(ParentCall::new())
    }

    /// Invoke or read a named member one level up, with the calling arguments
    pub fn parent_member(&mut self, member: &str) -> ClassResult<Option<Value>> {
        self.parent_with(ParentCall::new().member(member))
    }

    /// Invoke or read a member one level up the hierarchy
    ///
    /// Returns `Ok(None)` when there is no usable member name, when the
    /// executing method's owner cannot be found, when the root has been
    /// reached, or when the parent has no such member. Data members are
    /// returned without invocation.
    ///
    /// ```mermaid
    /// graph TD
    ///     A[parent] --> B{member name?}
    ///     B -->|none| Z[None]
    ///     B -->|yes| C{tagged?}
    ///     C -->|yes| E[parent class]
    ///     C -->|no| D[live search + tag]
    ///     D -->|miss| Z
    ///     D --> E
    ///     E -->|root| Z
    ///     E --> F{static or template}
    ///     F -->|data| G[value]
    ///     F -->|method| H[invoke on this]
    ///     F -->|miss| W[diagnostic + None]
    /// ```
    pub fn parent_with(&mut self, request: ParentCall) -> ClassResult<Option<Value>> {
        let ParentCall { member, arguments } = request;
        let member = member.unwrap_or_else(|| self.name.to_string());
        if member.is_empty() {
            return Ok(None);
        }

        let Some(ownership) = self.resolve_ownership(&member) else {
            trace!(member = %member, "no owner found for parent dispatch");
            return Ok(None);
        };
        let Some(parent_name) = ownership.parent.as_deref() else {
            return Ok(None);
        };
        let Some(parent) = self.resolve_parent(&ownership, parent_name) else {
            self.report_missing(&ownership, parent_name, &member);
            return Ok(None);
        };

        let target = parent
            .resolve_static(&member)
            .or_else(|| parent.lookup_member(&member));
        let Some(target) = target else {
            self.report_missing(&ownership, parent_name, &member);
            return Ok(None);
        };

        match &target.member {
            Member::Data(value) => Ok(Some(value.clone())),
            Member::Method(method) => {
                let args = arguments.resolve(self.args);
                let frame = Frame::resolved(&member, method, &target);
                invoke(self.runtime, self.this, frame, &args).map(Some)
            }
        }
    }

    fn resolve_ownership(&mut self, member: &str) -> Option<Ownership> {
        if let Some(ownership) = &self.ownership {
            return Some(ownership.clone());
        }
        // The owner sought is that of the executing function, found under
        // the name it runs as. A requested member only stands in for
        // detached calls, which have no function slot to cache into.
        let searched = if self.name.is_empty() { member } else { self.name };
        let (owner, exact) = self.search_owner(searched)?;
        let ownership = Ownership::new(owner.name(), owner.parent_name());
        if exact && !self.name.is_empty() {
            owner.tag(self.name, ownership.clone());
            self.ownership = Some(ownership.clone());
        }
        Some(ownership)
    }

    /// Walk the chain from the receiver's registered class looking for the
    /// class that declares the executing function
    fn search_owner(&self, member: &str) -> Option<(ClassRef, bool)> {
        self.runtime.record_ownership_search();
        let class_name = self.this.class().name();
        let start = self
            .runtime
            .lookup(class_name)
            .filter(|_| !class_name.is_empty())
            .unwrap_or_else(|| Rc::clone(self.this.class()));
        trace!(class = %start.name(), member = %member, "searching chain for method owner");

        let mut first_declaring: Option<ClassRef> = None;
        let mut current = Some(start);
        while let Some(class) = current {
            if let Some(declared) = class.own_member(member) {
                let same = declared
                    .as_method()
                    .is_some_and(|method| method.ptr_eq(&self.method));
                if same {
                    return Some((class, true));
                }
                if first_declaring.is_none() {
                    first_declaring = Some(Rc::clone(&class));
                }
            }
            current = class.parent().cloned();
        }
        first_declaring.map(|class| (class, false))
    }

    /// Registry entry for the parent name, unless that entry is the owner
    /// itself or derives from it (an overload shares its parent's name), in
    /// which case the owner's own parent link is used
    fn resolve_parent(&self, ownership: &Ownership, parent_name: &str) -> Option<ClassRef> {
        let owner = find_in_chain(&self.class, &ownership.owner);
        let registered = self.runtime.lookup(parent_name).filter(|entry| match &owner {
            Some(owner) => !entry.chain().any(|class| std::ptr::eq(class, owner.as_ref())),
            None => true,
        });
        registered
            .or_else(|| {
                owner
                    .and_then(|owner| owner.parent().cloned())
                    .filter(|parent| parent.name() == parent_name)
            })
            .or_else(|| find_in_chain(&self.class, parent_name))
            .or_else(|| find_in_chain(self.this.class(), parent_name))
    }

    fn report_missing(&self, ownership: &Ownership, parent: &str, member: &str) {
        if !self.runtime.config().warn_on_missing_parent {
            return;
        }
        let message = format!(
            "Could not find parent property {} from {} looking in {} (request context: {})",
            member,
            ownership.owner,
            parent,
            self.this.class().name()
        );
        warn!(member = %member, owner = %ownership.owner, parent = %parent, "{}", message);
        self.runtime.report(Diagnostic::new(
            DiagnosticKind::MissingParentMember,
            ownership.owner.clone(),
            Some(member.to_string()),
            message,
        ));
    }
}

fn find_in_chain(start: &ClassRef, name: &str) -> Option<ClassRef> {
    let mut current = Some(Rc::clone(start));
    while let Some(class) = current {
        if class.name() == name {
            return Some(class);
        }
        current = class.parent().cloned();
    }
    None
}

impl ClassDefinition {
    /// Invoke a class-level method
    ///
    /// The receiver is a hook-free scaffold of this class, so the method
    /// reads class data through `this`; its `parent()` resolves statics
    /// before template members, like any other parent dispatch.
    ///
    /// # Errors
    ///
    /// `MissingMember` if no class-level member has the name, `NotCallable`
    /// if it is data, or whatever the method itself returns.
    pub fn call_static(self: &Rc<Self>, runtime: &Runtime, name: &str, args: Vec<Value>) -> ClassResult<Value> {
        let resolved = self.resolve_static(name).ok_or_else(|| ClassError::MissingMember {
            class: self.name().to_string(),
            member: name.to_string(),
        })?;
        let Member::Method(method) = &resolved.member else {
            return Err(ClassError::NotCallable {
                class: self.name().to_string(),
                member: name.to_string(),
            });
        };
        let receiver = Instance::construct(runtime, self, &ConstructOptions::extending())?;
        trace!(class = %self.name(), member = %name, "calling class-level method");
        invoke(runtime, &receiver, Frame::resolved(name, method, &resolved), &args)
    }

    /// Resolve what `parent()` from a method declared on this class would reach
    pub fn parent_target(self: &Rc<Self>, member: &str) -> Option<ResolvedMember> {
        let parent = self.parent()?;
        parent
            .resolve_static(member)
            .or_else(|| parent.lookup_member(member))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Definition, INIT};
    use crate::extend::ExtendOptions;
    use serde_json::json;

    fn greeter_chain(runtime: &Runtime) -> ClassRef {
        let base = runtime
            .extend(
                runtime.root(),
                &Definition::new("Base", |m| {
                    m.data("title", "base");
                    m.method("greet", |call| {
                        let who = call.arg(0).and_then(Value::as_str).unwrap_or("nobody");
                        Ok(Value::from(format!("hello {}", who)))
                    });
                }),
                ExtendOptions::default(),
            )
            .unwrap();
        runtime
            .extend(
                &base,
                &Definition::new("Derived", |m| {
                    m.data("title", "derived");
                    m.method("greet", |call| {
                        let up = call.parent()?.unwrap_or(Value::Null);
                        Ok(Value::from(format!("<{}>", up.as_str().unwrap_or(""))))
                    });
                    m.method("explicit", |call| {
                        Ok(call
                            .parent_with(ParentCall::new().member("greet").with_args(vec![json!("bob")]))?
                            .unwrap_or(Value::Null))
                    });
                    m.method("trailing", |call| {
                        Ok(call
                            .parent_with(ParentCall::new().member("greet").trailing(vec![json!("eve")]))?
                            .unwrap_or(Value::Null))
                    });
                    m.method("base_title", |call| {
                        Ok(call.parent_member("title")?.unwrap_or(Value::Null))
                    });
                    m.method("nothing", |call| Ok(call.parent()?.unwrap_or(json!("none"))));
                }),
                ExtendOptions::default(),
            )
            .unwrap()
    }

    /// The three argument strategies
    ///
    /// ```mermaid
    /// graph LR
    ///     A[CallingArguments] --> D[greet args]
    ///     B[Explicit] --> D
    ///     C[Trailing] --> D
    /// ```
    #[test]
    fn test_argument_strategies() {
        let runtime = Runtime::new();
        let derived = greeter_chain(&runtime);
        let object = runtime.instantiate(&derived, vec![]).unwrap();

        assert_eq!(
            object.call(&runtime, "greet", vec![json!("ann")]).unwrap(),
            json!("<hello ann>")
        );
        assert_eq!(
            object.call(&runtime, "explicit", vec![json!("ann")]).unwrap(),
            json!("hello bob")
        );
        assert_eq!(
            object.call(&runtime, "trailing", vec![]).unwrap(),
            json!("hello eve")
        );
    }

    #[test]
    fn test_parent_data_is_returned_verbatim() {
        let runtime = Runtime::new();
        let derived = greeter_chain(&runtime);
        let object = runtime.instantiate(&derived, vec![]).unwrap();

        assert_eq!(object.get_value("title"), Some(json!("derived")));
        assert_eq!(
            object.call(&runtime, "base_title", vec![]).unwrap(),
            json!("base")
        );
    }

    #[test]
    fn test_missing_parent_member_is_reported_not_raised() {
        let runtime = Runtime::new();
        let derived = greeter_chain(&runtime);
        let object = runtime.instantiate(&derived, vec![]).unwrap();

        assert_eq!(
            object.call(&runtime, "nothing", vec![]).unwrap(),
            json!("none")
        );
        let diagnostics = runtime.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingParentMember);
        assert_eq!(diagnostics[0].member.as_deref(), Some("nothing"));
    }

    #[test]
    fn test_detached_call_parent_is_noop() {
        let runtime = Runtime::new();
        let derived = greeter_chain(&runtime);
        let object = runtime.instantiate(&derived, vec![]).unwrap();

        let detached = Method::new(|call| Ok(call.parent()?.unwrap_or(json!("noop"))));
        assert_eq!(
            object.apply(&runtime, &detached, vec![]).unwrap(),
            json!("noop")
        );
        assert!(runtime.diagnostics().is_empty());
    }

    #[test]
    fn test_root_init_ends_the_chain() {
        let runtime = Runtime::new();
        let leaf = runtime
            .extend(
                runtime.root(),
                &Definition::new("Leaf", |m| {
                    m.method(INIT, |call| {
                        let up = call.parent()?;
                        call.set("root_returned", up.unwrap_or(json!("undefined")));
                        Ok(Value::Null)
                    });
                }),
                ExtendOptions::default(),
            )
            .unwrap();

        let object = runtime.instantiate(&leaf, vec![]).unwrap();
        assert_eq!(object.get_value("root_returned"), Some(Value::Null));
    }

    #[test]
    fn test_parent_target_introspection() {
        let runtime = Runtime::new();
        let derived = greeter_chain(&runtime);
        let target = derived.parent_target("greet").unwrap();
        assert_eq!(target.class.name(), "Base");
        assert!(derived.parent_target("missing").is_none());
    }
}
