//! In-memory provider through the facade.

use crate::common::{blog_model, init_tracing};
use keystone::{
    row, EntityState, EntryTracker, InMemoryProvider, KeystoneConfig, KeystoneError,
    SaveExecutor, Value,
};
use std::sync::Arc;
use std::thread;

/// Test: ensure_created seeds each entity type into its own table
#[test]
fn test_seed_on_first_creation() {
    init_tracing();
    let provider = InMemoryProvider::new(&KeystoneConfig::default(), blog_model());

    assert!(provider.ensure_created().unwrap());
    assert!(!provider.ensure_created().unwrap());

    let blogs = provider.table("Blog").unwrap();
    let tags = provider.table("Tag").unwrap();
    let posts = provider.table("Post").unwrap();
    assert_eq!(blogs.len(), 2);
    assert_eq!(tags.len(), 1);
    assert_eq!(posts.len(), 1);

    // Blog and Post share a key shape but not a table
    assert!(!Arc::ptr_eq(&blogs, &posts));
    assert_eq!(provider.store().registry().len(), 3);
}

/// Test: the same table instance is returned on every lookup
#[test]
fn test_table_identity_is_stable() {
    init_tracing();
    let provider = Arc::new(InMemoryProvider::new(&KeystoneConfig::default(), blog_model()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || provider.table("Tag").unwrap())
        })
        .collect();
    let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for table in &tables[1..] {
        assert!(Arc::ptr_eq(&tables[0], table));
    }
    assert_eq!(provider.store().registry().len(), 1);
}

/// Test: unknown entity names are a configuration error
#[test]
fn test_unknown_entity() {
    let provider = InMemoryProvider::new(&KeystoneConfig::default(), blog_model());
    let err = provider.table("Comment").unwrap_err();
    assert!(matches!(err, KeystoneError::Configuration { .. }));
}

/// Test: tracked changes are applied through the store's save executor
#[test]
fn test_save_tracked_changes() {
    init_tracing();
    let model = blog_model();
    let provider = InMemoryProvider::new(&KeystoneConfig::default(), Arc::clone(&model));
    provider.ensure_created().unwrap();

    let blog = model.find_entity_type("Blog").unwrap();
    let post = model.find_entity_type("Post").unwrap();

    let mut tracker = EntryTracker::new();
    tracker
        .create_entry(
            row([
                ("post_id", Value::Int(10)),
                ("blog_id", Value::Int(1)),
                ("body", Value::Null),
            ]),
            post,
        )
        .set_state(EntityState::Added);
    tracker
        .create_entry(
            row([("blog_id", Value::Int(2)), ("title", Value::from("Storage engines"))]),
            blog,
        )
        .set_state(EntityState::Modified);
    tracker
        .create_entry(row([("blog_id", Value::Int(1)), ("title", Value::from("Systems"))]), blog)
        .set_state(EntityState::Deleted);
    // Unchanged entries are not saved
    tracker
        .create_entry(row([("blog_id", Value::Int(3)), ("title", Value::from("x"))]), blog)
        .set_state(EntityState::Unchanged);

    let saved = provider.store().save_changes(&tracker.entries_to_save()).unwrap();
    assert_eq!(saved, 3);

    let blogs = provider.table("Blog").unwrap();
    assert_eq!(blogs.len(), 1);
    let renamed = blogs.find(&[Value::Int(2)]).unwrap().unwrap();
    assert_eq!(renamed["title"], Value::from("Storage engines"));
    assert!(blogs.find(&[Value::Int(1)]).unwrap().is_none());
    assert_eq!(provider.table("Post").unwrap().len(), 2);
}

/// Test: key values stay out of error text unless sensitive logging is on
#[test]
fn test_sensitive_logging_from_config() {
    let redacted = InMemoryProvider::new(&KeystoneConfig::default(), blog_model());
    redacted.ensure_created().unwrap();
    let err = redacted
        .table("Blog")
        .unwrap()
        .insert(row([("blog_id", Value::Int(1)), ("title", Value::from("dup"))]))
        .unwrap_err();
    assert!(matches!(err, KeystoneError::DuplicateKey { .. }));
    assert!(!err.to_string().contains("{1}"));

    let config = KeystoneConfig::from_toml_str("[logging]\nsensitive_data_logging = true\n").unwrap();
    let verbose = InMemoryProvider::new(&config, blog_model());
    verbose.ensure_created().unwrap();
    let err = verbose
        .table("Blog")
        .unwrap()
        .insert(row([("blog_id", Value::Int(1)), ("title", Value::from("dup"))]))
        .unwrap_err();
    assert!(err.to_string().contains("{1}"));
}

/// Test: ensure_deleted clears rows and allows re-seeding
#[test]
fn test_delete_then_recreate() {
    let provider = InMemoryProvider::new(&KeystoneConfig::default(), blog_model());
    assert!(!provider.ensure_deleted());

    provider.ensure_created().unwrap();
    assert!(provider.ensure_deleted());
    assert!(provider.table("Blog").unwrap().is_empty());

    assert!(provider.ensure_created().unwrap());
    assert_eq!(provider.table("Blog").unwrap().len(), 2);
}
