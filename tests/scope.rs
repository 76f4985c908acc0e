use std::sync::Arc;

use anyhow::Result;

use lumen::{Error, Identifier, PropertyScope, SortedMap, TypeToken};

#[test]
pub fn values_are_typed() -> Result<()> {
    let mut scope = PropertyScope::new();
    scope.set("exposure", 1.5f32)?;
    let name = Identifier::new("exposure");

    assert_eq!(*scope.get::<f32>(&name)?, 1.5);
    assert_eq!(scope.type_of(&name), Some(TypeToken::of::<f32>()));

    let err = scope.get::<f64>(&name).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::TypeMismatch { .. })));

    let err = scope.set("exposure", 2.0f64).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::TypeMismatch { .. })));

    scope.set("exposure", 2.0f32)?;
    assert_eq!(*scope.get::<f32>(&name)?, 2.0);
    Ok(())
}

#[test]
pub fn missing_values() -> Result<()> {
    let scope = PropertyScope::new();
    let name = Identifier::new("missing");
    let err = scope.get::<i32>(&name).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::PropertyNotFound(_))));
    assert!(scope.try_get::<i32>(&name)?.is_none());
    assert!(!scope.contains(&name));
    Ok(())
}

#[test]
pub fn child_scopes_fall_back_to_parent() -> Result<()> {
    let mut parent = PropertyScope::new();
    parent.set("resolution", (1280u32, 720u32))?;
    parent.set("samples", 4u32)?;
    let parent = Arc::new(parent);

    let mut child = PropertyScope::child(parent.clone());
    child.set("samples", 16u32)?;

    assert_eq!(*child.get::<(u32, u32)>(&"resolution".into())?, (1280, 720));
    assert_eq!(*child.get::<u32>(&"samples".into())?, 16);
    assert_eq!(*parent.get::<u32>(&"samples".into())?, 4);
    assert_eq!(child.local_names().count(), 1);

    // Removing from the child uncovers the parent value.
    assert!(child.remove(&"samples".into()).is_some());
    assert_eq!(*child.get::<u32>(&"samples".into())?, 4);

    // A child may not shadow a parent value with another type.
    assert!(child.set("resolution", 1u8).is_err());
    Ok(())
}

#[test]
pub fn shared_values_are_not_copied() -> Result<()> {
    let mut scope = PropertyScope::new();
    let buffer = Arc::new(vec![0u8; 16]);
    scope.set_shared("buffer", buffer.clone())?;
    let stored = scope.get_shared::<Vec<u8>>(&"buffer".into())?;
    assert!(Arc::ptr_eq(&buffer, &stored));
    Ok(())
}

#[test]
pub fn type_tokens_compare_by_type() {
    assert_eq!(TypeToken::of::<u32>(), TypeToken::of::<u32>());
    assert_ne!(TypeToken::of::<u32>(), TypeToken::of::<i32>());
    assert!(TypeToken::of::<Vec<f32>>().is::<Vec<f32>>());
    assert!(TypeToken::of::<u32>().name().contains("u32"));
    assert!(TypeToken::registered_count() >= 2);
}

#[test]
pub fn sorted_map_updates_in_place() {
    let mut map = SortedMap::new();
    assert_eq!(map.insert("b", 1), None);
    assert_eq!(map.insert("a", 2), None);
    assert_eq!(map.insert("b", 3), Some(1));
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&"b".into()), Some(&3));

    if let Some(value) = map.get_mut(&"a".into()) {
        *value += 10;
    }
    assert_eq!(map.get(&"a".into()), Some(&12));
    assert!(map.get_mut(&"missing".into()).is_none());
    // Lookups by hash recover the stored name.
    assert_eq!(map.get_key(&Identifier::new("a")).map(Identifier::name), Some("a"));
    assert!(map.get_key(&"missing".into()).is_none());

    let keys: Vec<u64> = map.keys().map(Identifier::value).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let before = map.content_hash();
    map.insert("c", 4);
    assert_ne!(map.content_hash(), before);
    assert_eq!(map.remove(&"c".into()), Some(4));
    assert_eq!(map.content_hash(), before);
}
