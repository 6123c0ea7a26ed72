//! Integration tests for Trellis.
//!
//! These tests exercise the resolver end to end against the in-memory
//! store, which implements the same five primitives as the Postgres store.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p trellis-integration-tests
//! ```

use std::sync::Arc;

use serde_json::{Value, json};

use trellis_graph::Resolver;
use trellis_graph::catalog::Entity;
use trellis_graph::store::{MemoryStore, Record};

/// A resolver over a freshly seeded in-memory store.
pub struct TestContext {
    pub resolver: Resolver,
}

impl TestContext {
    /// An empty store.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            resolver: Resolver::new(Arc::new(MemoryStore::new())),
        }
    }

    /// One author with a published post and a draft.
    #[must_use]
    pub fn blog() -> Self {
        let store = MemoryStore::new();
        store
            .seed(
                Entity::User,
                [row(
                    json!({ "id": 1, "email": "ada@example.com", "name": "Ada" }),
                )],
            )
            .expect("seed users");
        store
            .seed(
                Entity::Post,
                [
                    row(json!({
                        "id": 10, "title": "Hello, world", "content": "The first post.",
                        "published": true, "authorId": 1
                    })),
                    row(json!({
                        "id": 11, "title": "Notes on engines", "content": null,
                        "published": false, "authorId": 1
                    })),
                ],
            )
            .expect("seed posts");
        Self {
            resolver: Resolver::new(Arc::new(store)),
        }
    }

    /// A small commerce catalog: one row per entity, one order with a line
    /// item, all relations linked.
    #[must_use]
    pub fn commerce() -> Self {
        let store = MemoryStore::new();
        store
            .seed(
                Entity::Category,
                [row(
                    json!({ "id": 1, "name": "Beverages", "description": "Drinks" }),
                )],
            )
            .expect("seed categories");
        store
            .seed(
                Entity::Supplier,
                [row(json!({
                    "id": 1, "name": "Exotic Liquids", "contactName": "Charlotte Cooper",
                    "address": "49 Gilbert St.", "city": "London",
                    "postalCode": "EC1 4SD", "country": "UK", "phone": "(171) 555-2222"
                }))],
            )
            .expect("seed suppliers");
        store
            .seed(
                Entity::Product,
                [row(json!({
                    "id": 1, "name": "Chai", "price": "18.00",
                    "description": "A fragrant black tea blend.",
                    "excerpt": "Black tea blend", "unit": "10 boxes x 20 bags",
                    "categoryId": 1, "supplierId": 1
                }))],
            )
            .expect("seed products");
        store
            .seed(
                Entity::Shipper,
                [row(
                    json!({ "id": 1, "shipperName": "Speedy Express", "phone": "(503) 555-9831" }),
                )],
            )
            .expect("seed shippers");
        store
            .seed(
                Entity::Customer,
                [row(json!({
                    "id": 1, "customerName": "Alfreds Futterkiste", "contactName": "Maria Anders",
                    "address": "Obere Str. 57", "city": "Berlin",
                    "postalCode": "12209", "country": "Germany"
                }))],
            )
            .expect("seed customers");
        store
            .seed(
                Entity::Employee,
                [row(json!({
                    "id": 1, "lastName": "Davolio", "firstName": "Nancy",
                    "birthDate": "1968-12-08T00:00:00Z", "photo": "nancy.jpg",
                    "notes": "Education includes a BA in psychology."
                }))],
            )
            .expect("seed employees");
        store
            .seed(
                Entity::Order,
                [row(json!({
                    "id": 1, "orderDate": "1996-07-04T00:00:00Z",
                    "shipperId": 1, "customerId": 1, "employeeId": 1
                }))],
            )
            .expect("seed orders");
        store
            .seed(
                Entity::OrderDetail,
                [row(
                    json!({ "id": 1, "quantity": 12, "orderId": 1, "productId": 1 }),
                )],
            )
            .expect("seed order details");
        Self {
            resolver: Resolver::new(Arc::new(store)),
        }
    }
}

fn row(value: Value) -> Record {
    serde_json::from_value(value).expect("fixture row must be an object")
}
