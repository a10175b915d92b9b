//! Shared fixtures.

use keystone::{row, EntityType, Model, ScalarType, Value};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a test subscriber once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Blog and Post (int keys, same container, overlapping key values) and Tag
/// (composite key), all with seed data.
pub fn blog_model() -> Arc<Model> {
    let blog = EntityType::builder("Blog")
        .property("blog_id", ScalarType::Int)
        .property("title", ScalarType::String)
        .key(["blog_id"])
        .container("Blogs")
        .seed(row([("blog_id", Value::Int(1)), ("title", Value::from("Systems"))]))
        .seed(row([("blog_id", Value::Int(2)), ("title", Value::from("Storage"))]))
        .build()
        .unwrap();

    let post = EntityType::builder("Post")
        .property("post_id", ScalarType::Int)
        .property("blog_id", ScalarType::Int)
        .nullable_property("body", ScalarType::String)
        .key(["post_id"])
        .container("Blogs")
        .seed(row([
            ("post_id", Value::Int(1)),
            ("blog_id", Value::Int(1)),
            ("body", Value::from("Hello")),
        ]))
        .build()
        .unwrap();

    let tag = EntityType::builder("Tag")
        .property("blog_id", ScalarType::Int)
        .property("label", ScalarType::String)
        .key(["blog_id", "label"])
        .container("Tags")
        .seed(row([("blog_id", Value::Int(1)), ("label", Value::from("rust"))]))
        .build()
        .unwrap();

    Arc::new(Model::new([blog, post, tag]).unwrap())
}
