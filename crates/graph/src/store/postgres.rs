//! Postgres store.
//!
//! Implements the five primitives with SQL generated from the type catalog:
//! the catalog supplies table names, column lists, and scalar types, so the
//! queries here are built and bound at runtime rather than through sqlx's
//! compile-time checked macros (which would require a live database to
//! build the workspace).
//!
//! `connect` links and nested child rows run inside one transaction, so a
//! failed link resolution leaves no partial write. Postgres unique
//! violations map to [`StoreError::Conflict`].

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::catalog::{Entity, RelationDef, RelationKind, Scalar};

use super::{Filter, NewRecord, Record, Related, Store, StoreError};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// A Postgres-backed implementation of the five store primitives.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// One SQL column: the record key it maps to and its scalar type. Covers
/// declared fields plus the foreign key columns of owning relations.
#[derive(Debug, Clone, Copy)]
struct Column {
    field: &'static str,
    column: &'static str,
    ty: Scalar,
}

fn columns(entity: Entity) -> Vec<Column> {
    let mut cols: Vec<Column> = entity
        .fields()
        .iter()
        .map(|def| Column {
            field: def.name,
            column: def.column,
            ty: def.ty,
        })
        .collect();
    for relation in entity.relations() {
        if let RelationKind::ManyToOne {
            fk_field,
            fk_column,
            ..
        } = relation.kind
        {
            cols.push(Column {
                field: fk_field,
                column: fk_column,
                ty: Scalar::Id,
            });
        }
    }
    cols
}

fn select_list(entity: Entity) -> String {
    columns(entity)
        .iter()
        .map(|col| col.column)
        .collect::<Vec<_>>()
        .join(", ")
}

fn select_sql(entity: Entity, where_column: Option<&str>) -> String {
    let list = select_list(entity);
    let table = entity.table();
    match where_column {
        Some(column) => format!("SELECT {list} FROM {table} WHERE {column} = $1"),
        None => format!("SELECT {list} FROM {table}"),
    }
}

fn insert_sql(entity: Entity, cols: &[Column]) -> String {
    let table = entity.table();
    let returning = select_list(entity);
    if cols.is_empty() {
        return format!("INSERT INTO {table} DEFAULT VALUES RETURNING {returning}");
    }
    let names = cols
        .iter()
        .map(|col| col.column)
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=cols.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {table} ({names}) VALUES ({placeholders}) RETURNING {returning}")
}

fn update_sql(entity: Entity, cols: &[Column]) -> String {
    let table = entity.table();
    let returning = select_list(entity);
    let sets = cols
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ${}", col.column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let id_placeholder = cols.len() + 1;
    format!("UPDATE {table} SET {sets} WHERE id = ${id_placeholder} RETURNING {returning}")
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

fn invalid(context: &str, value: &Value) -> StoreError {
    StoreError::InvalidValue(format!("{context}: {value}"))
}

/// Bind a JSON value to the next placeholder according to its declared
/// scalar type. Nulls bind as SQL NULL.
fn bind_value<'q>(
    query: PgQuery<'q>,
    ty: Scalar,
    value: &Value,
    context: &str,
) -> Result<PgQuery<'q>, StoreError> {
    let query = match ty {
        Scalar::Id | Scalar::Int => {
            let bound = match value {
                Value::Null => None,
                other => Some(
                    other
                        .as_i64()
                        .and_then(|n| i32::try_from(n).ok())
                        .ok_or_else(|| invalid(context, value))?,
                ),
            };
            query.bind(bound)
        }
        Scalar::Text => {
            let bound = match value {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => return Err(invalid(context, other)),
            };
            query.bind(bound)
        }
        Scalar::Bool => {
            let bound = match value {
                Value::Null => None,
                other => Some(other.as_bool().ok_or_else(|| invalid(context, value))?),
            };
            query.bind(bound)
        }
        Scalar::Decimal => {
            let bound = match value {
                Value::Null => None,
                Value::String(s) => {
                    Some(Decimal::from_str(s).map_err(|_| invalid(context, value))?)
                }
                Value::Number(n) => {
                    Some(Decimal::from_str(&n.to_string()).map_err(|_| invalid(context, value))?)
                }
                other => return Err(invalid(context, other)),
            };
            query.bind(bound)
        }
        Scalar::DateTime => {
            let bound = match value {
                Value::Null => None,
                Value::String(s) => Some(
                    DateTime::parse_from_rfc3339(s)
                        .map_err(|_| invalid(context, value))?
                        .with_timezone(&Utc),
                ),
                other => return Err(invalid(context, other)),
            };
            query.bind(bound)
        }
    };
    Ok(query)
}

fn row_to_record(entity: Entity, row: &PgRow) -> Result<Record, StoreError> {
    let mut record = Record::new();
    for col in columns(entity) {
        let value = match col.ty {
            Scalar::Id | Scalar::Int => row
                .try_get::<Option<i32>, _>(col.column)?
                .map_or(Value::Null, Value::from),
            Scalar::Text => row
                .try_get::<Option<String>, _>(col.column)?
                .map_or(Value::Null, Value::from),
            Scalar::Bool => row
                .try_get::<Option<bool>, _>(col.column)?
                .map_or(Value::Null, Value::from),
            Scalar::Decimal => row
                .try_get::<Option<Decimal>, _>(col.column)?
                .map_or(Value::Null, |d| Value::from(d.to_string())),
            Scalar::DateTime => row
                .try_get::<Option<DateTime<Utc>>, _>(col.column)?
                .map_or(Value::Null, |dt| Value::from(dt.to_rfc3339())),
        };
        record.insert(col.field.to_owned(), value);
    }
    Ok(record)
}

fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(db_err.message().to_owned());
    }
    StoreError::Database(err)
}

fn record_id(entity: Entity, record: &Record) -> Result<i32, StoreError> {
    record
        .get("id")
        .and_then(Value::as_i64)
        .and_then(|id| i32::try_from(id).ok())
        .ok_or_else(|| StoreError::Corrupt(format!("{} row missing id", entity.name())))
}

async fn insert_row(
    tx: &mut Transaction<'_, Postgres>,
    entity: Entity,
    fields: &Record,
) -> Result<Record, StoreError> {
    let cols: Vec<Column> = columns(entity)
        .into_iter()
        .filter(|col| col.field != "id" && fields.contains_key(col.field))
        .collect();
    let sql = insert_sql(entity, &cols);
    let mut query = sqlx::query(&sql);
    for col in &cols {
        let value = fields.get(col.field).unwrap_or(&Value::Null);
        query = bind_value(query, col.ty, value, col.field)?;
    }
    let row = query
        .fetch_one(&mut **tx)
        .await
        .map_err(map_unique_violation)?;
    row_to_record(entity, &row)
}

#[async_trait]
impl Store for PgStore {
    async fn find_one(&self, entity: Entity, id: i32) -> Result<Option<Record>, StoreError> {
        let sql = select_sql(entity, Some("id"));
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|row| row_to_record(entity, &row)).transpose()
    }

    async fn find_many(
        &self,
        entity: Entity,
        filter: Option<&Filter>,
    ) -> Result<Vec<Record>, StoreError> {
        let rows = match filter {
            None => {
                let sql = select_sql(entity, None);
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
            Some(filter) => {
                let col = columns(entity)
                    .into_iter()
                    .find(|col| col.field == filter.field)
                    .ok_or_else(|| {
                        StoreError::InvalidValue(format!(
                            "unknown filter field {} on {}",
                            filter.field,
                            entity.name()
                        ))
                    })?;
                let sql = select_sql(entity, Some(col.column));
                let query = bind_value(sqlx::query(&sql), col.ty, &filter.value, col.field)?;
                query.fetch_all(&self.pool).await?
            }
        };
        rows.iter().map(|row| row_to_record(entity, row)).collect()
    }

    async fn create(&self, entity: Entity, new: NewRecord) -> Result<Record, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut fields = new.fields;

        for connect in &new.connect {
            let relation = entity.relation(connect.relation).ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "unknown relation {} on {}",
                    connect.relation,
                    entity.name()
                ))
            })?;
            let RelationKind::ManyToOne { fk_field, .. } = relation.kind else {
                return Err(StoreError::Corrupt(format!(
                    "connect through non-owning relation {}",
                    connect.relation
                )));
            };
            let target_field = relation.target.field(connect.field).ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "unknown field {} on {}",
                    connect.field,
                    relation.target.name()
                ))
            })?;
            let sql = format!(
                "SELECT id FROM {} WHERE {} = $1",
                relation.target.table(),
                target_field.column
            );
            let query = bind_value(sqlx::query(&sql), target_field.ty, &connect.value, connect.field)?;
            let row = query.fetch_optional(&mut *tx).await?;
            let row = row.ok_or_else(|| StoreError::MissingRelated {
                entity: relation.target.name(),
                field: connect.field,
                value: connect.value.to_string(),
            })?;
            let target_id: i32 = row.try_get("id")?;
            fields.insert(fk_field.to_owned(), Value::from(target_id));
        }

        let record = insert_row(&mut tx, entity, &fields).await?;
        let parent_id = record_id(entity, &record)?;

        for nested in new.nested {
            let relation = entity.relation(nested.relation).ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "unknown relation {} on {}",
                    nested.relation,
                    entity.name()
                ))
            })?;
            let RelationKind::OneToMany { fk_field, .. } = relation.kind else {
                return Err(StoreError::Corrupt(format!(
                    "nested create through owning relation {}",
                    nested.relation
                )));
            };
            for mut row in nested.rows {
                row.insert(fk_field.to_owned(), Value::from(parent_id));
                insert_row(&mut tx, relation.target, &row).await?;
            }
        }

        tx.commit().await?;
        Ok(record)
    }

    async fn update(
        &self,
        entity: Entity,
        id: i32,
        patch: Record,
    ) -> Result<Option<Record>, StoreError> {
        let cols: Vec<Column> = columns(entity)
            .into_iter()
            .filter(|col| col.field != "id" && patch.contains_key(col.field))
            .collect();
        if cols.is_empty() {
            return self.find_one(entity, id).await;
        }
        let sql = update_sql(entity, &cols);
        let mut query = sqlx::query(&sql);
        for col in &cols {
            let value = patch.get(col.field).unwrap_or(&Value::Null);
            query = bind_value(query, col.ty, value, col.field)?;
        }
        let row = query
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)?;
        row.map(|row| row_to_record(entity, &row)).transpose()
    }

    async fn related(
        &self,
        entity: Entity,
        id: i32,
        relation: &RelationDef,
    ) -> Result<Related, StoreError> {
        match relation.kind {
            RelationKind::ManyToOne { fk_field, .. } => {
                let parent = self.find_one(entity, id).await?;
                let target_id = parent
                    .as_ref()
                    .and_then(|record| record.get(fk_field))
                    .and_then(Value::as_i64)
                    .and_then(|fk| i32::try_from(fk).ok());
                match target_id {
                    None => Ok(Related::One(None)),
                    Some(target_id) => {
                        Ok(Related::One(self.find_one(relation.target, target_id).await?))
                    }
                }
            }
            RelationKind::OneToMany { fk_column, .. } => {
                let sql = select_sql(relation.target, Some(fk_column));
                let rows = sqlx::query(&sql).bind(id).fetch_all(&self.pool).await?;
                Ok(Related::Many(
                    rows.iter()
                        .map(|row| row_to_record(relation.target, row))
                        .collect::<Result<_, _>>()?,
                ))
            }
        }
    }
}
