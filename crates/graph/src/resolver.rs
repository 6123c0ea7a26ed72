//! Demand-driven execution of operations against a store.
//!
//! The resolver walks the requested field tree and fetches exactly what it
//! names: scalar fields come from the record at hand, relation fields are
//! resolved lazily through [`RelationResolver`] with a fresh store
//! round-trip per traversal. Nothing is memoized, so a relation read always
//! reflects current store state.
//!
//! Absence and failure are distinct: `post(id)` and `publish(id)` on an
//! unknown identity resolve to an explicit JSON null, while a `connect`
//! link that names no record fails the whole mutation.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use trellis_core::{Email, PostId};

use crate::catalog::{Entity, FieldDef, MutationOp, QueryOp, RelationDef, RelationKind};
use crate::error::{GraphError, GraphResult};
use crate::request::{DraftInput, Operation, OperationKind, Selection, UserCreateInput};
use crate::store::{Connect, Filter, Nested, NewRecord, Record, Related, Store};

/// Capability for traversing one relation from one record, invoked only
/// when the requesting operation selects the relation field.
#[async_trait]
pub trait RelationResolver: Send + Sync {
    /// Traverse `relation` from the record with the given identity.
    async fn resolve_relation(
        &self,
        entity: Entity,
        id: i32,
        relation: &RelationDef,
    ) -> GraphResult<Related>;
}

#[async_trait]
impl<S: Store + ?Sized> RelationResolver for S {
    async fn resolve_relation(
        &self,
        entity: Entity,
        id: i32,
        relation: &RelationDef,
    ) -> GraphResult<Related> {
        Ok(self.related(entity, id, relation).await?)
    }
}

/// Executes parsed operations against a store.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn Store>,
}

impl Resolver {
    /// Build a resolver over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Execute one operation and produce its JSON result.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::BadRequest`] for unknown operations, unknown
    /// selected fields, or missing/malformed arguments; other variants per
    /// the error taxonomy on [`GraphError`].
    pub async fn execute(&self, operation: &Operation) -> GraphResult<Value> {
        match operation.kind {
            OperationKind::Query => self.execute_query(&operation.field).await,
            OperationKind::Mutation => self.execute_mutation(&operation.field).await,
        }
    }

    async fn execute_query(&self, field: &Selection) -> GraphResult<Value> {
        let op = QueryOp::parse(&field.name)
            .ok_or_else(|| GraphError::BadRequest(format!("unknown query field {}", field.name)))?;
        debug!(field = %field.name, "executing query");

        match op {
            QueryOp::Feed => {
                let filter = Filter::eq("published", true);
                let rows = self.store.find_many(Entity::Post, Some(&filter)).await?;
                self.shape_many(Entity::Post, &rows, &field.fields).await
            }
            QueryOp::Post => {
                let id: PostId = id_argument(field, "id")?.into();
                match self.store.find_one(Entity::Post, id.as_i32()).await? {
                    None => Ok(Value::Null),
                    Some(record) => self.shape(Entity::Post, &record, &field.fields).await,
                }
            }
            QueryOp::Collection(entity) => {
                let rows = self.store.find_many(entity, None).await?;
                self.shape_many(entity, &rows, &field.fields).await
            }
        }
    }

    async fn execute_mutation(&self, field: &Selection) -> GraphResult<Value> {
        let op = MutationOp::parse(&field.name).ok_or_else(|| {
            GraphError::BadRequest(format!("unknown mutation field {}", field.name))
        })?;
        debug!(field = %field.name, "executing mutation");

        match op {
            MutationOp::CreateUser => self.create_user(field).await,
            MutationOp::CreateDraft => self.create_draft(field).await,
            MutationOp::Publish => {
                let id: PostId = id_argument(field, "id")?.into();
                let mut patch = Record::new();
                patch.insert("published".to_owned(), Value::Bool(true));
                match self.store.update(Entity::Post, id.as_i32(), patch).await? {
                    None => Ok(Value::Null),
                    Some(record) => self.shape(Entity::Post, &record, &field.fields).await,
                }
            }
        }
    }

    async fn create_user(&self, field: &Selection) -> GraphResult<Value> {
        let input: UserCreateInput = argument(field, "data")?;
        let email = Email::parse(&input.email)
            .map_err(|err| GraphError::BadRequest(format!("invalid email: {err}")))?;

        let mut fields = Record::new();
        fields.insert("email".to_owned(), Value::from(email.into_inner()));
        fields.insert(
            "name".to_owned(),
            input.name.map_or(Value::Null, Value::from),
        );

        let mut new = NewRecord::with_fields(fields);
        if !input.posts.is_empty() {
            new.nested.push(Nested {
                relation: "posts",
                rows: input.posts.iter().map(draft_fields).collect(),
            });
        }

        let record = self.store.create(Entity::User, new).await?;
        self.shape(Entity::User, &record, &field.fields).await
    }

    async fn create_draft(&self, field: &Selection) -> GraphResult<Value> {
        let mut arguments = field.arguments.clone();
        let author_email = arguments.remove("authorEmail");
        let input: DraftInput =
            serde_json::from_value(Value::Object(arguments.into_iter().collect()))
                .map_err(|err| GraphError::BadRequest(format!("invalid arguments: {err}")))?;

        let mut new = NewRecord::with_fields(draft_fields(&input));
        if let Some(value) = author_email {
            if !value.is_string() {
                return Err(GraphError::BadRequest(
                    "authorEmail must be a string".to_owned(),
                ));
            }
            new.connect.push(Connect {
                relation: "author",
                field: "email",
                value,
            });
        }

        let record = self.store.create(Entity::Post, new).await?;
        self.shape(Entity::Post, &record, &field.fields).await
    }

    async fn shape_many(
        &self,
        entity: Entity,
        rows: &[Record],
        fields: &[Selection],
    ) -> GraphResult<Value> {
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(self.shape(entity, row, fields).await?);
        }
        Ok(Value::Array(items))
    }

    /// Shape one record against a selection: declared scalars come from the
    /// record, selected relations are traversed lazily. An empty selection
    /// yields all declared scalar fields and no relations.
    fn shape<'a>(
        &'a self,
        entity: Entity,
        record: &'a Record,
        fields: &'a [Selection],
    ) -> Pin<Box<dyn Future<Output = GraphResult<Value>> + Send + 'a>> {
        Box::pin(async move {
            let mut out = Map::new();

            if fields.is_empty() {
                for def in entity.fields() {
                    out.insert(def.name.to_owned(), scalar_value(entity, def, record)?);
                }
                return Ok(Value::Object(out));
            }

            for selection in fields {
                if let Some(def) = entity.field(&selection.name) {
                    out.insert(def.name.to_owned(), scalar_value(entity, def, record)?);
                } else if let Some(relation) = entity.relation(&selection.name) {
                    let id = record_id(entity, record)?;
                    let value = self.relation_value(entity, id, relation, selection).await?;
                    out.insert(relation.name.to_owned(), value);
                } else {
                    return Err(GraphError::BadRequest(format!(
                        "unknown field {} on {}",
                        selection.name,
                        entity.name()
                    )));
                }
            }
            Ok(Value::Object(out))
        })
    }

    async fn relation_value(
        &self,
        entity: Entity,
        id: i32,
        relation: &RelationDef,
        selection: &Selection,
    ) -> GraphResult<Value> {
        match self
            .store
            .resolve_relation(entity, id, relation)
            .await?
        {
            Related::One(None) => {
                if let RelationKind::ManyToOne {
                    nullable: false, ..
                } = relation.kind
                {
                    return Err(GraphError::DataIntegrity(format!(
                        "{}.{} is required but unresolvable for id {id}",
                        entity.name(),
                        relation.name
                    )));
                }
                Ok(Value::Null)
            }
            Related::One(Some(target)) => {
                self.shape(relation.target, &target, &selection.fields).await
            }
            Related::Many(rows) => {
                self.shape_many(relation.target, &rows, &selection.fields)
                    .await
            }
        }
    }
}

/// Coerce an `id` argument: numbers and numeric strings both serve as
/// identities on the wire.
fn id_argument(field: &Selection, name: &str) -> GraphResult<i32> {
    let value = field.arguments.get(name).ok_or_else(|| {
        GraphError::BadRequest(format!("{} requires an {name} argument", field.name))
    })?;
    let id = match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| {
        GraphError::BadRequest(format!("{name} must be an integer, got {value}"))
    })
}

/// Fetch and deserialize one named argument.
fn argument<T: serde::de::DeserializeOwned>(field: &Selection, name: &str) -> GraphResult<T> {
    let value = field.arguments.get(name).ok_or_else(|| {
        GraphError::BadRequest(format!("{} requires a {name} argument", field.name))
    })?;
    serde_json::from_value(value.clone())
        .map_err(|err| GraphError::BadRequest(format!("invalid {name}: {err}")))
}

/// Scalar fields for a new draft. Every draft starts unpublished; the
/// `published` input flag is accepted but has no effect.
fn draft_fields(input: &DraftInput) -> Record {
    let mut fields = Record::new();
    fields.insert("title".to_owned(), Value::from(input.title.clone()));
    fields.insert(
        "content".to_owned(),
        input.content.clone().map_or(Value::Null, Value::from),
    );
    fields.insert("published".to_owned(), Value::Bool(false));
    fields
}

fn scalar_value(entity: Entity, def: &FieldDef, record: &Record) -> GraphResult<Value> {
    match record.get(def.name) {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ if def.nullable => Ok(Value::Null),
        _ => Err(GraphError::DataIntegrity(format!(
            "{}.{} is non-nullable but unpopulated",
            entity.name(),
            def.name
        ))),
    }
}

fn record_id(entity: Entity, record: &Record) -> GraphResult<i32> {
    record
        .get("id")
        .and_then(Value::as_i64)
        .and_then(|id| i32::try_from(id).ok())
        .ok_or_else(|| {
            GraphError::DataIntegrity(format!("{} record missing id", entity.name()))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use crate::store::MemoryStore;

    use super::*;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn resolver_with(store: MemoryStore) -> Resolver {
        Resolver::new(Arc::new(store))
    }

    fn seeded_blog() -> Resolver {
        let store = MemoryStore::new();
        store
            .seed(
                Entity::User,
                [record(json!({ "id": 1, "email": "ada@example.com", "name": "Ada" }))],
            )
            .unwrap();
        store
            .seed(
                Entity::Post,
                [
                    record(json!({
                        "id": 10, "title": "Hello", "content": "first",
                        "published": true, "authorId": 1
                    })),
                    record(json!({
                        "id": 11, "title": "Draft", "content": null,
                        "published": false, "authorId": 1
                    })),
                ],
            )
            .unwrap();
        resolver_with(store)
    }

    #[tokio::test]
    async fn test_feed_returns_only_published() {
        let resolver = seeded_blog();
        let result = resolver
            .execute(&Operation::query(
                Selection::new("feed").field(Selection::new("title")),
            ))
            .await
            .unwrap();
        assert_eq!(result, json!([{ "title": "Hello" }]));
    }

    #[tokio::test]
    async fn test_post_missing_id_is_null() {
        let resolver = seeded_blog();
        let result = resolver
            .execute(&Operation::query(Selection::new("post").argument("id", 999)))
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_post_accepts_string_id() {
        let resolver = seeded_blog();
        let result = resolver
            .execute(&Operation::query(
                Selection::new("post")
                    .argument("id", "10")
                    .field(Selection::new("title")),
            ))
            .await
            .unwrap();
        assert_eq!(result, json!({ "title": "Hello" }));
    }

    #[tokio::test]
    async fn test_shape_returns_only_requested_fields() {
        let resolver = seeded_blog();
        let result = resolver
            .execute(&Operation::query(
                Selection::new("post")
                    .argument("id", 10)
                    .field(Selection::new("title"))
                    .field(Selection::new("published")),
            ))
            .await
            .unwrap();
        assert_eq!(result, json!({ "title": "Hello", "published": true }));
    }

    #[tokio::test]
    async fn test_empty_selection_yields_all_scalars_without_fk() {
        let resolver = seeded_blog();
        let result = resolver
            .execute(&Operation::query(Selection::new("post").argument("id", 10)))
            .await
            .unwrap();
        assert_eq!(
            result,
            json!({ "id": 10, "title": "Hello", "content": "first", "published": true })
        );
    }

    #[tokio::test]
    async fn test_relation_traversal_both_directions() {
        let resolver = seeded_blog();
        let result = resolver
            .execute(&Operation::query(
                Selection::new("post").argument("id", 10).field(
                    Selection::new("author")
                        .field(Selection::new("email"))
                        .field(Selection::new("posts").field(Selection::new("title"))),
                ),
            ))
            .await
            .unwrap();
        assert_eq!(
            result,
            json!({
                "author": {
                    "email": "ada@example.com",
                    "posts": [{ "title": "Hello" }, { "title": "Draft" }]
                }
            })
        );
    }

    #[tokio::test]
    async fn test_relation_read_reflects_later_writes() {
        let resolver = seeded_blog();
        resolver
            .execute(&Operation::mutation(
                Selection::new("createDraft")
                    .argument("title", "Fresh")
                    .argument("authorEmail", "ada@example.com"),
            ))
            .await
            .unwrap();

        let result = resolver
            .execute(&Operation::query(
                Selection::new("post")
                    .argument("id", 10)
                    .field(Selection::new("author").field(
                        Selection::new("posts").field(Selection::new("title")),
                    )),
            ))
            .await
            .unwrap();
        let titles: Vec<&str> = result["author"]["posts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|post| post["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["Hello", "Draft", "Fresh"]);
    }

    #[tokio::test]
    async fn test_create_draft_ignores_published_flag() {
        let resolver = seeded_blog();
        let result = resolver
            .execute(&Operation::mutation(
                Selection::new("createDraft")
                    .argument("title", "Sneaky")
                    .argument("published", true)
                    .field(Selection::new("published")),
            ))
            .await
            .unwrap();
        assert_eq!(result, json!({ "published": false }));
    }

    #[tokio::test]
    async fn test_create_draft_unknown_author_fails_without_write() {
        let resolver = seeded_blog();
        let err = resolver
            .execute(&Operation::mutation(
                Selection::new("createDraft")
                    .argument("title", "Orphan")
                    .argument("authorEmail", "nobody@example.com"),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::NotFound(_)));

        let feed = resolver
            .execute(&Operation::query(Selection::new("feed")))
            .await
            .unwrap();
        assert_eq!(feed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_user_with_nested_drafts() {
        let resolver = seeded_blog();
        let result = resolver
            .execute(&Operation::mutation(
                Selection::new("createUser")
                    .argument(
                        "data",
                        json!({
                            "email": "grace@example.com",
                            "posts": [{ "title": "Nested", "content": "body" }]
                        }),
                    )
                    .field(Selection::new("email"))
                    .field(
                        Selection::new("posts")
                            .field(Selection::new("title"))
                            .field(Selection::new("published")),
                    ),
            ))
            .await
            .unwrap();
        assert_eq!(
            result,
            json!({
                "email": "grace@example.com",
                "posts": [{ "title": "Nested", "published": false }]
            })
        );
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email_conflicts() {
        let resolver = seeded_blog();
        let err = resolver
            .execute(&Operation::mutation(
                Selection::new("createUser").argument("data", json!({ "email": "ada@example.com" })),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_create_user_takes_wrapped_input() {
        let resolver = seeded_blog();
        let result = resolver
            .execute(&Operation::mutation(
                Selection::new("createUser")
                    .argument("data", json!({ "email": "hedy@example.com" }))
                    .field(Selection::new("email"))
                    .field(Selection::new("name")),
            ))
            .await
            .unwrap();
        assert_eq!(result, json!({ "email": "hedy@example.com", "name": null }));
    }

    #[tokio::test]
    async fn test_create_user_without_data_is_bad_request() {
        let resolver = seeded_blog();
        let err = resolver
            .execute(&Operation::mutation(
                Selection::new("createUser").argument("email", "hedy@example.com"),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_create_user_rejects_invalid_email() {
        let resolver = seeded_blog();
        let err = resolver
            .execute(&Operation::mutation(
                Selection::new("createUser").argument("data", json!({ "email": "not-an-email" })),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_publish_flips_flag_and_is_idempotent() {
        let resolver = seeded_blog();
        for _ in 0..2 {
            let result = resolver
                .execute(&Operation::mutation(
                    Selection::new("publish")
                        .argument("id", 11)
                        .field(Selection::new("published")),
                ))
                .await
                .unwrap();
            assert_eq!(result, json!({ "published": true }));
        }

        let feed = resolver
            .execute(&Operation::query(Selection::new("feed")))
            .await
            .unwrap();
        assert_eq!(feed.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_publish_missing_id_is_null() {
        let resolver = seeded_blog();
        let result = resolver
            .execute(&Operation::mutation(
                Selection::new("publish").argument("id", 999),
            ))
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_root_field_is_bad_request() {
        let resolver = seeded_blog();
        let err = resolver
            .execute(&Operation::query(Selection::new("deleteEverything")))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_unknown_selected_field_is_bad_request() {
        let resolver = seeded_blog();
        let err = resolver
            .execute(&Operation::query(
                Selection::new("post")
                    .argument("id", 10)
                    .field(Selection::new("secret")),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_missing_id_argument_is_bad_request() {
        let resolver = seeded_blog();
        let err = resolver
            .execute(&Operation::query(Selection::new("post")))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_unpopulated_required_scalar_is_data_integrity() {
        let store = MemoryStore::new();
        store
            .seed(Entity::Post, [record(json!({ "id": 1, "published": false }))])
            .unwrap();
        let resolver = resolver_with(store);

        let err = resolver
            .execute(&Operation::query(
                Selection::new("post")
                    .argument("id", 1)
                    .field(Selection::new("title")),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn test_unresolvable_required_relation_is_data_integrity() {
        let store = MemoryStore::new();
        store
            .seed(
                Entity::Order,
                [record(json!({ "id": 1, "orderDate": "2024-01-01T00:00:00Z" }))],
            )
            .unwrap();
        let resolver = resolver_with(store);

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
    async fn test_collection_queries_cover_catalog() {
        let store = MemoryStore::new();
        store
            .seed(
                Entity::Shipper,
                [record(json!({ "shipperName": "Speedy", "phone": "555" }))],
            )
            .unwrap();
        let resolver = resolver_with(store);

        let shippers = resolver
            .execute(&Operation::query(
                Selection::new("shippers").field(Selection::new("shipperName")),
            ))
            .await
            .unwrap();
        assert_eq!(shippers, json!([{ "shipperName": "Speedy" }]));

        let empty = resolver
            .execute(&Operation::query(Selection::new("categories")))
            .await
            .unwrap();
        assert_eq!(empty, json!([]));
    }

    #[tokio::test]
    async fn test_nullable_relation_resolves_to_null() {
        let store = MemoryStore::new();
        store
            .seed(
                Entity::Post,
                [record(json!({ "id": 1, "title": "Lonely", "published": true }))],
            )
            .unwrap();
        let resolver = resolver_with(store);

        let result = resolver
            .execute(&Operation::query(
                Selection::new("post")
                    .argument("id", 1)
                    .field(Selection::new("author").field(Selection::new("email"))),
            ))
            .await
            .unwrap();
        assert_eq!(result, json!({ "author": null }));
    }
}
