use std::collections::BTreeMap;

use cim_class::{Augmentation, ClassError, Definition, Object, Runtime, AUGMENTED};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

mod support;
use support::{derive, Journal};

fn record(runtime: &Runtime, fields: &BTreeMap<String, i64>) -> Object {
    let fields = fields.clone();
    let class = derive(
        runtime,
        runtime.root(),
        &Definition::new("Record", move |m| {
            for (name, value) in &fields {
                m.data(name.clone(), *value);
            }
        }),
    );
    runtime.instantiate(&class, vec![]).unwrap()
}

proptest! {
    #[test]
    fn augment_never_touches_the_original(
        original in prop::collection::btree_map("[a-e]", any::<i64>(), 0..5),
        addition in prop::collection::btree_map("[c-h]", any::<i64>(), 0..5),
    ) {
        let runtime = Runtime::new();
        let object = record(&runtime, &original);
        let before: Vec<_> = object
            .own_property_names()
            .into_iter()
            .map(|name| (name.clone(), object.get_value(&name)))
            .collect();

        let mapping: serde_json::Map<String, Value> =
            addition.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
        let view = object.augment(&runtime, Value::Object(mapping)).unwrap();

        let after: Vec<_> = object
            .own_property_names()
            .into_iter()
            .map(|name| (name.clone(), object.get_value(&name)))
            .collect();
        prop_assert_eq!(before, after);

        for (name, value) in &addition {
            prop_assert_eq!(view.get_value(name), Some(json!(value)));
        }
        for (name, value) in &original {
            if !addition.contains_key(name) {
                prop_assert_eq!(view.get_value(name), Some(json!(value)));
            }
        }
    }
}

#[test]
fn sibling_views_are_independent() {
    let runtime = Runtime::new();
    let object = record(&runtime, &BTreeMap::from([("shared".to_string(), 1)]));

    let left = object.augment(&runtime, json!({ "left": true })).unwrap();
    let right = object.augment(&runtime, json!({ "right": true })).unwrap();

    assert_eq!(left.get_value("right"), None);
    assert_eq!(right.get_value("left"), None);
    assert_eq!(left.get_value("shared"), Some(json!(1)));
    assert_eq!(right.get_value("shared"), Some(json!(1)));
}

#[test]
fn later_changes_to_the_original_show_through() {
    let runtime = Runtime::new();
    let object = record(&runtime, &BTreeMap::from([("count".to_string(), 1)]));
    let view = object.augment(&runtime, Augmentation::new().data("extra", 2)).unwrap();

    object.set("count", 5);
    view.set("local", 9);

    assert_eq!(view.get_value("count"), Some(json!(5)));
    assert_eq!(object.get_value("local"), None);
    assert!(Object::ptr_eq(view.base().unwrap(), &object));
}

#[test]
fn augmented_hook_receives_the_addition() {
    let runtime = Runtime::new();
    let journal = Journal::new();
    let log = journal.clone();
    let class = derive(
        &runtime,
        runtime.root(),
        &Definition::new("Watched", move |m| {
            let log = log.clone();
            m.method(AUGMENTED, move |call| {
                log.log(call.arg(0).cloned().unwrap_or(Value::Null).to_string());
                Ok(Value::Null)
            });
        }),
    );
    let object = runtime.instantiate(&class, vec![]).unwrap();

    object.augment(&runtime, json!({ "a": 1 })).unwrap();
    let plain = object.augment(&runtime, json!(42)).unwrap();

    assert_eq!(journal.entries(), vec![r#"{"a":1}"#, "42"]);
    assert!(plain.own_property_names().is_empty());
    assert!(plain.augment_source().is_none());
}

#[test]
fn augmented_hook_failure_propagates() {
    let runtime = Runtime::new();
    let class = derive(
        &runtime,
        runtime.root(),
        &Definition::new("Strict", |m| {
            m.method(AUGMENTED, |call| {
                if call.arg(0).and_then(|v| v.get("forbidden")).is_some() {
                    return Err(ClassError::custom("forbidden addition"));
                }
                Ok(Value::Null)
            });
        }),
    );
    let object = runtime.instantiate(&class, vec![]).unwrap();

    let err = object
        .augment(&runtime, json!({ "forbidden": 1 }))
        .unwrap_err();
    assert!(err.is_user_failure());
    assert!(object.augment(&runtime, json!({ "fine": 1 })).is_ok());
}

#[test]
fn stacked_views_resolve_through_every_layer() {
    let runtime = Runtime::new();
    let class = derive(
        &runtime,
        runtime.root(),
        &Definition::new("Speaker", |m| {
            m.method("speak", |_| Ok(json!("class")));
        }),
    );
    let object = runtime.instantiate(&class, vec![]).unwrap();

    let view = object
        .augment(
            &runtime,
            Augmentation::new().method("speak", |call| {
                let up = call.call("shout", vec![])?;
                Ok(json!(format!("view/{}", up.as_str().unwrap_or(""))))
            }),
        )
        .unwrap();
    let view = view
        .augment(
            &runtime,
            Augmentation::new().method("shout", |_| Ok(json!("loud"))),
        )
        .unwrap();

    assert_eq!(view.call(&runtime, "speak", vec![]).unwrap(), json!("view/loud"));
    assert_eq!(object.call(&runtime, "speak", vec![]).unwrap(), json!("class"));
}

#[test]
fn augmented_hook_reads_added_methods_through_the_view() {
    let runtime = Runtime::new();
    let journal = Journal::new();
    let log = journal.clone();
    let class = derive(
        &runtime,
        runtime.root(),
        &Definition::new("Watched", move |m| {
            let log = log.clone();
            m.method(AUGMENTED, move |call| {
                log.log(call.arg(0).cloned().unwrap_or(Value::Null).to_string());
                let source = call.this().augment_source();
                let names: Vec<String> = source
                    .and_then(|addition| addition.members())
                    .map(|members| members.keys().cloned().collect())
                    .unwrap_or_default();
                log.log(names.join(","));
                let is_method = source
                    .and_then(|addition| addition.get("shout"))
                    .is_some_and(|member| member.as_method().is_some());
                log.log(is_method.to_string());
                Ok(Value::Null)
            });
        }),
    );
    let object = runtime.instantiate(&class, vec![]).unwrap();

    object
        .augment(
            &runtime,
            Augmentation::new().method("shout", |_| Ok(json!("loud"))),
        )
        .unwrap();

    assert_eq!(journal.entries(), vec!["{}", "shout", "true"]);
}
