//! # CIM Class
//!
//! Runtime class composition for the Composable Information Machine.
//!
//! Classes are built at runtime from a parent class and a [`Definition`]
//! (a closure declaring members), registered by name, and instantiated into
//! objects whose methods can continue up the hierarchy with `parent()`.
//!
//! - **Derivation**: [`Runtime::extend`] composes a new class from an origin,
//!   the definition's own members, and optional trait sources
//! - **Parent dispatch**: every method knows which class declared it, so
//!   [`Call::parent`] always reaches the next level up, even from inherited
//!   code running on a deeper instance
//! - **Augmentation**: [`Instance::augment`] layers extra members over an
//!   existing object without touching it
//! - **Overload**: [`Runtime::overload`] replaces a registered class with a
//!   derivation of itself, or waits until the name is registered
//! - **Events**: derivations and overloads are published on an [`EventBus`]
//!
//! ## Example
//!
//! ```
//! use cim_class::{Definition, ExtendOptions, Runtime, INIT};
//! use serde_json::{json, Value};
//!
//! let runtime = Runtime::new();
//! let animal = runtime
//!     .extend(
//!         runtime.root(),
//!         &Definition::new("Animal", |m| {
//!             m.method(INIT, |call| {
//!                 call.set("legs", call.arg(0).cloned().unwrap_or(json!(4)));
//!                 call.parent()?;
//!                 Ok(Value::Null)
//!             });
//!         }),
//!         ExtendOptions::new(),
//!     )
//!     .unwrap();
//! let bird = runtime
//!     .extend(
//!         &animal,
//!         &Definition::new("Bird", |m| {
//!             m.method(INIT, |call| {
//!                 call.parent_with(cim_class::ParentCall::new().with_args(vec![json!(2)]))?;
//!                 Ok(Value::Null)
//!             });
//!         }),
//!         ExtendOptions::new(),
//!     )
//!     .unwrap();
//!
//! let tweety = runtime.instantiate(&bird, vec![]).unwrap();
//! assert_eq!(tweety.get_value("legs"), Some(json!(2)));
//! assert!(bird.is_a("Animal"));
//! ```
//!
//! Everything is single-threaded: classes and objects are reference counted
//! with `Rc` and callbacks may re-enter the runtime freely.

#![warn(missing_docs)]

mod augment;
mod class;
mod config;
mod definition;
mod diagnostics;
mod dispatch;
mod errors;
mod events;
mod extend;
mod instance;
mod member;
mod overload;
mod ownership;
mod registry;
mod runtime;

// Re-export core types
pub use augment::Augmentation;
pub use class::{ClassDefinition, ClassRef, ResolvedMember};
pub use config::RuntimeConfig;
pub use definition::{
    ClassHook, ClassHooks, Definition, MemberCollector, AUGMENTED, CONSTRUCTOR, INIT, POST_INIT,
    PRE_INIT,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog};
pub use dispatch::{ArgumentStrategy, Call, ParentCall};
pub use errors::{ClassError, ClassResult};
pub use events::{ClassEvent, ClassEventKind, EventBus, SubscriptionId, Topic};
pub use extend::{ExtendOptions, TraitSource};
pub use instance::{ConstructMode, ConstructOptions, Instance, Object};
pub use member::{Member, Method};
pub use overload::{OverloadOutcome, PendingOverloads};
pub use ownership::{tag_members, Ownership, OwnershipTable};
pub use registry::ClassRegistry;
pub use runtime::{Runtime, RuntimeStats};
