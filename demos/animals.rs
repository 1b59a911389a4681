//! Animals Demo - CIM Class
//!
//! Walks through the class runtime with a small animal hierarchy:
//! - Construction order with explicit `parent()` calls
//! - Augmenting an instance without touching it
//! - Patching a method after derivation (live owner search)
//! - Scheduling an overload before its target exists
//!
//! Run with `RUST_LOG=debug cargo run --example animals` to see the engine's logs.

use cim_class::{Augmentation, Definition, ExtendOptions, Runtime, Topic, INIT};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== CIM Class: Animals Demo ===\n");

    let runtime = Runtime::new();
    runtime.events().subscribe(Topic::Extended, |_, event| {
        println!(
            "  [event] {} derived from {}",
            event.class_name(),
            event.origin.name()
        );
    });

    // A deferred overload: Poodle does not exist yet.
    let outcome = runtime.overload(
        "Poodle",
        Definition::new("Poodle", |m| {
            m.method("speak", |call| {
                let plain = call.parent()?.unwrap_or(Value::Null);
                Ok(json!(format!("{} (with a French accent)", plain.as_str().unwrap_or(""))))
            });
        }),
    )?;
    println!("1. Overload for Poodle deferred: {}\n", outcome.is_deferred());

    println!("2. Deriving Animal, Dog and Poodle");
    let animal = runtime.extend(
        runtime.root(),
        &Definition::new("Animal", |m| {
            m.data("legs", 4);
            m.method(INIT, |call| {
                println!("  Animal init: a new animal with {} legs", call.get("legs").unwrap_or(Value::Null));
                Ok(Value::Null)
            });
            m.method("speak", |_| Ok(json!("...")));
        }),
        ExtendOptions::new(),
    )?;
    let dog = runtime.extend(
        &animal,
        &Definition::new("Dog", |m| {
            m.method(INIT, |call| {
                let color = call.arg(0).cloned().unwrap_or(json!("grey"));
                call.set("color", color.clone());
                println!("  Dog init: color {}", color);
                call.parent()?;
                Ok(Value::Null)
            });
            m.method("speak", |_| Ok(json!("Woof")));
        }),
        ExtendOptions::new(),
    )?;
    runtime.extend_named("Dog", &Definition::new("Poodle", |_| {}), ExtendOptions::new())?;
    println!("  registered: {:?}\n", runtime.class_names());

    println!("3. Construction order");
    let rex = runtime.instantiate(&dog, vec![json!("brown")])?;
    println!("  rex.color = {}\n", rex.get_value("color").unwrap_or(Value::Null));

    println!("4. Augmentation");
    let costumed = rex.augment(&runtime, Augmentation::new().data("color", "pink").data("hat", true))?;
    println!("  costumed.color = {}", costumed.get_value("color").unwrap_or(Value::Null));
    println!("  rex.color      = {}", rex.get_value("color").unwrap_or(Value::Null));
    println!("  costumed.legs  = {}\n", costumed.get_value("legs").unwrap_or(Value::Null));

    println!("5. Patching Dog after derivation");
    dog.define_method("speak", |call| {
        let base = call.parent()?.unwrap_or(Value::Null);
        Ok(json!(format!("Woof, then {}", base.as_str().unwrap_or(""))))
    });
    for _ in 0..2 {
        println!("  rex.speak() = {}", rex.call(&runtime, "speak", vec![])?);
    }
    println!("  owner searches: {}\n", runtime.stats().ownership_searches);

    println!("6. The overloaded Poodle");
    let fifi = runtime.instantiate_named("Poodle", vec![json!("white")])?;
    println!("  fifi.speak() = {}", fifi.call(&runtime, "speak", vec![])?);
    println!("  lineage: {:?}\n", fifi.class().lineage());

    println!("7. Runtime stats");
    println!("{}", serde_json::to_string_pretty(&runtime.stats())?);
    if !runtime.diagnostics().is_empty() {
        println!("  diagnostics: {:#?}", runtime.diagnostics());
    }

    Ok(())
}
