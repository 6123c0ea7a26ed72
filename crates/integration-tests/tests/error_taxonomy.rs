//! The error taxonomy as seen through full operations: absence is null,
//! failed references and constraint violations are errors, malformed
//! requests are rejected up front.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use trellis_graph::GraphError;
use trellis_graph::catalog::Entity;
use trellis_graph::request::{Operation, Selection};
use trellis_graph::store::MemoryStore;
use trellis_graph::Resolver;
use trellis_integration_tests::TestContext;

#[tokio::test]
async fn test_unknown_author_email_is_not_found_and_atomic() {
    let ctx = TestContext::blog();
    let err = ctx
        .resolver
        .execute(&Operation::mutation(
            Selection::new("createDraft")
                .argument("title", "Orphan")
                .argument("authorEmail", "nobody@example.com"),
        ))
        .await
        .unwrap_err();
    let GraphError::NotFound(message) = err else {
        panic!("expected NotFound, got {err:?}");
    };
    assert!(message.contains("nobody@example.com"));

    // Nothing was written: the draft does not appear anywhere.
    let posts = ctx
        .resolver
        .execute(&Operation::query(
            Selection::new("post")
                .argument("id", 10)
                .field(Selection::new("author").field(
                    Selection::new("posts").field(Selection::new("title")),
                )),
        ))
        .await
        .unwrap();
    assert_eq!(posts["author"]["posts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_duplicate_email_is_constraint_violation() {
    let ctx = TestContext::blog();
    let err = ctx
        .resolver
        .execute(&Operation::mutation(
            Selection::new("createUser").argument("data", json!({ "email": "ada@example.com" })),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::ConstraintViolation(_)));

    // The existing user is untouched and still the only one with that email.
    let post = ctx
        .resolver
        .execute(&Operation::query(
            Selection::new("post")
                .argument("id", 10)
                .field(Selection::new("author").field(Selection::new("name"))),
        ))
        .await
        .unwrap();
    assert_eq!(post, json!({ "author": { "name": "Ada" } }));
}

#[tokio::test]
async fn test_malformed_operations_are_bad_requests() {
    let ctx = TestContext::blog();

    for operation in [
        // Unknown root field.
        Operation::query(Selection::new("posts")),
        // Missing required argument.
        Operation::query(Selection::new("post")),
        // Non-numeric id.
        Operation::query(Selection::new("post").argument("id", "ten")),
        // Unknown selected field.
        Operation::query(
            Selection::new("feed").field(Selection::new("viewCount")),
        ),
        // Missing draft title.
        Operation::mutation(Selection::new("createDraft").argument("content", "body only")),
        // Unknown mutation.
        Operation::mutation(Selection::new("deletePost").argument("id", 10)),
    ] {
        let err = ctx.resolver.execute(&operation).await.unwrap_err();
        assert!(
            matches!(err, GraphError::BadRequest(_)),
            "expected BadRequest for {operation:?}, got {err:?}"
        );
    }
}

#[tokio::test]
async fn test_missing_required_relation_is_data_integrity() {
    // An order whose shipper reference cannot be resolved is corrupt data,
    // not a null result.
    let store = MemoryStore::new();
    store
        .seed(
            Entity::Order,
            [serde_json::from_value(
                json!({ "id": 1, "orderDate": "1996-07-04T00:00:00Z", "shipperId": 99 }),
            )
            .unwrap()],
        )
        .unwrap();
    let resolver = Resolver::new(std::sync::Arc::new(store));

    let err = resolver
        .execute(&Operation::query(
            Selection::new("orders")
                .field(Selection::new("shipper").field(Selection::new("phone"))),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::DataIntegrity(_)));
}

#[tokio::test]
async fn test_failures_do_not_poison_the_resolver() {
    let ctx = TestContext::blog();

    let _ = ctx
        .resolver
        .execute(&Operation::mutation(
            Selection::new("createUser").argument("data", json!({ "email": "ada@example.com" })),
        ))
        .await
        .unwrap_err();

    // The next operation succeeds normally.
    let feed = ctx
        .resolver
        .execute(&Operation::query(
            Selection::new("feed").field(Selection::new("title")),
        ))
        .await
        .unwrap();
    assert_eq!(feed, json!([{ "title": "Hello, world" }]));
}
