use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;

use lumen::{Error, Identifier, Method, Pipeline};

mod framework;

use framework::{spec, task, task_names};

fn producer_name(method: &Method, output: &str) -> Option<String> {
    method
        .get_task(&Identifier::new(output))
        .map(|task| task.name().to_string())
}

#[test]
pub fn local_task_beats_fallback() -> Result<()> {
    framework::init_logging();
    let base = Method::new("base");
    base.register_task(task("base_x", &[], &["x"]));
    let method = Method::new("method");
    let local = task("local_x", &[], &["x"]);
    method.register_task(local.clone());
    method.register_fallback_method(base.clone());

    let pipeline = Pipeline::for_outputs(&method, &[spec("x")])?;
    assert_eq!(task_names(&pipeline), ["local_x"]);
    let x = Identifier::new("x");
    assert_eq!(method.local_task(&x).map(|task| task.name().to_string()).as_deref(), Some("local_x"));

    assert!(method.unregister_task(&local));
    let pipeline = Pipeline::for_outputs(&method, &[spec("x")])?;
    assert_eq!(task_names(&pipeline), ["base_x"]);
    assert!(method.local_task(&x).is_none());
    assert!(base.local_task(&x).is_some());

    assert!(!method.unregister_task(&local), "Task is already unregistered");
    Ok(())
}

#[test]
pub fn later_registration_replaces_local_producer() {
    let method = Method::new("method");
    method.register_task(task("first", &[], &["x"]));
    method.register_task(task("second", &[], &["x", "y"]));
    assert_eq!(producer_name(&method, "x").as_deref(), Some("second"));
    assert_eq!(method.local_outputs().len(), 2);
}

#[test]
pub fn fallbacks_are_consulted_in_order() {
    let first = Method::new("first");
    first.register_task(task("first_x", &[], &["x"]));
    let second = Method::new("second");
    second.register_task(task("second_x", &[], &["x"]));
    second.register_task(task("second_y", &[], &["y"]));

    let method = Method::new("method");
    method.register_fallback_method(first.clone());
    method.register_fallback_method(second.clone());
    assert_eq!(producer_name(&method, "x").as_deref(), Some("first_x"));
    assert_eq!(producer_name(&method, "y").as_deref(), Some("second_y"));
    assert_eq!(producer_name(&method, "z"), None);

    method.prefer_fallback_method(second.clone());
    assert_eq!(producer_name(&method, "x").as_deref(), Some("second_x"));
    assert_eq!(method.fallback_methods().len(), 2);

    assert!(method.unregister_fallback_method(&second));
    assert_eq!(producer_name(&method, "x").as_deref(), Some("first_x"));
    assert_eq!(producer_name(&method, "y"), None);
}

#[test]
pub fn duplicate_fallback_is_ignored() {
    let base = Method::new("base");
    let method = Method::new("method");
    method.register_fallback_method(base.clone());
    let hash = method.preference_hash();
    method.register_fallback_method(base.clone());
    assert_eq!(method.fallback_methods().len(), 1);
    assert_eq!(method.preference_hash(), hash);
}

#[test]
pub fn preference_hash_propagates_to_dependents() {
    framework::init_logging();
    let leaf = Method::new("leaf");
    leaf.register_task(task("leaf_x", &[], &["x"]));
    let middle = Method::new("middle");
    middle.register_fallback_method(leaf.clone());
    let top = Method::new("top");
    top.register_fallback_method(middle.clone());
    let unrelated = Method::new("unrelated");
    unrelated.register_task(task("unrelated_x", &[], &["x"]));

    let before = [
        leaf.preference_hash(),
        middle.preference_hash(),
        top.preference_hash(),
        unrelated.preference_hash(),
    ];

    let extra = Method::new("extra");
    extra.register_task(task("extra_y", &[], &["y"]));
    leaf.prefer_fallback_method(extra.clone());

    assert_ne!(leaf.preference_hash(), before[0]);
    assert_ne!(middle.preference_hash(), before[1]);
    assert_ne!(top.preference_hash(), before[2]);
    assert_eq!(unrelated.preference_hash(), before[3]);

    // Mutating a fallback of a fallback propagates as well.
    let top_hash = top.preference_hash();
    extra.register_task(task("extra_z", &[], &["z"]));
    assert_ne!(top.preference_hash(), top_hash);
}

#[test]
pub fn preference_hash_is_stable_without_changes() {
    let method = Method::new("method");
    method.register_task(task("a", &["p"], &["q"]));
    assert_eq!(method.preference_hash(), method.preference_hash());
}

#[test]
pub fn listeners_see_fallback_changes() {
    let leaf = Method::new("leaf");
    let top = Method::new("top");
    top.register_fallback_method(leaf.clone());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let id = top.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    leaf.register_task(task("a", &[], &["x"]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    top.register_task(task("b", &[], &["y"]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert!(top.unsubscribe(id));
    assert!(!top.unsubscribe(id));
    leaf.register_task(task("c", &[], &["z"]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
pub fn dropped_dependents_are_released() {
    let leaf = Method::new("leaf");
    {
        let top = Method::new("top");
        top.register_fallback_method(leaf.clone());
    }
    // The dependent is gone, mutating the leaf must not touch it.
    leaf.register_task(task("a", &[], &["x"]));
    assert_eq!(Arc::strong_count(&leaf), 1);
}

#[test]
pub fn fallback_cycle_is_reported() {
    framework::init_logging();
    let a = Method::new("a");
    let b = Method::new("b");
    a.register_fallback_method(b.clone());
    b.register_fallback_method(a.clone());

    let err = a.check_fallback_chain().unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::FallbackCycle(_))));

    // Lookups terminate on the malformed chain.
    assert!(a.get_task(&Identifier::new("missing")).is_none());
    let _ = a.preference_hash();

    let err = Pipeline::for_outputs(&a, &[spec("missing")]).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::FallbackCycle(_))));

    // Break the cycle so both methods can be dropped.
    assert!(b.unregister_fallback_method(&a));
    assert!(a.check_fallback_chain().is_ok());
}
