//! In-memory store.
//!
//! Backs the resolver in tests and in development mode. Rows live in
//! per-entity `BTreeMap<i32, Record>` tables behind one `RwLock`, with a
//! monotone id counter standing in for the database's autoincrement
//! sequence. Uniqueness declared in the catalog is enforced on create, and
//! `connect` links are resolved before anything is written so a miss leaves
//! no partial state.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::{Entity, RelationDef, RelationKind};

use super::{Filter, NewRecord, Record, Related, Store, StoreError};

#[derive(Debug, Default)]
struct Tables {
    rows: BTreeMap<Entity, BTreeMap<i32, Record>>,
    next_id: i32,
}

impl Tables {
    fn table(&self, entity: Entity) -> Option<&BTreeMap<i32, Record>> {
        self.rows.get(&entity)
    }

    fn table_mut(&mut self, entity: Entity) -> &mut BTreeMap<i32, Record> {
        self.rows.entry(entity).or_default()
    }

    fn allocate(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Resolve a unique-field lookup on `entity` to the matching record's id
    /// value, if any row matches.
    fn find_by_field(&self, entity: Entity, field: &str, value: &Value) -> Option<&Record> {
        self.table(entity)?
            .values()
            .find(|record| record.get(field) == Some(value))
    }

    fn check_unique(&self, entity: Entity, fields: &Record) -> Result<(), StoreError> {
        for def in entity.fields() {
            if !def.unique || def.name == "id" {
                continue;
            }
            if let Some(value) = fields.get(def.name)
                && !value.is_null()
                && self.find_by_field(entity, def.name, value).is_some()
            {
                return Err(StoreError::Conflict(format!(
                    "{} with {} = {} already exists",
                    entity.name(),
                    def.name,
                    value
                )));
            }
        }
        Ok(())
    }
}

/// An in-memory implementation of the five store primitives.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    /// An empty store. The first assigned identity is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Tables {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Insert fixture rows directly, bypassing create semantics.
    ///
    /// Rows carrying an `id` keep it (the id counter is advanced past it);
    /// rows without one get a fresh identity. Trusts its input: no
    /// uniqueness or shape checks. Returns the ids in input order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidValue` if a provided `id` is not an
    /// integer, or `StoreError::Corrupt` if the lock is poisoned.
    pub fn seed(
        &self,
        entity: Entity,
        rows: impl IntoIterator<Item = Record>,
    ) -> Result<Vec<i32>, StoreError> {
        let mut tables = self.write()?;
        let mut ids = Vec::new();
        for mut row in rows {
            let id = match row.get("id") {
                Some(value) => as_id(value)
                    .ok_or_else(|| StoreError::InvalidValue(format!("seed id {value}")))?,
                None => tables.allocate(),
            };
            tables.next_id = tables.next_id.max(id + 1);
            row.insert("id".to_owned(), Value::from(id));
            tables.table_mut(entity).insert(id, row);
            ids.push(id);
        }
        Ok(ids)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Corrupt("store lock poisoned".to_owned()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Corrupt("store lock poisoned".to_owned()))
    }
}

fn as_id(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|id| i32::try_from(id).ok())
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_one(&self, entity: Entity, id: i32) -> Result<Option<Record>, StoreError> {
        let tables = self.read()?;
        Ok(tables.table(entity).and_then(|table| table.get(&id)).cloned())
    }

    async fn find_many(
        &self,
        entity: Entity,
        filter: Option<&Filter>,
    ) -> Result<Vec<Record>, StoreError> {
        let tables = self.read()?;
        let Some(table) = tables.table(entity) else {
            return Ok(Vec::new());
        };
        Ok(table
            .values()
            .filter(|record| {
                filter.is_none_or(|f| record.get(&f.field) == Some(&f.value))
            })
            .cloned()
            .collect())
    }

    async fn create(&self, entity: Entity, new: NewRecord) -> Result<Record, StoreError> {
        let mut tables = self.write()?;
        let mut fields = new.fields;

        // Resolve connect links up front: a miss must leave no partial write.
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
            let target_id = tables
                .find_by_field(relation.target, connect.field, &connect.value)
                .and_then(|record| record.get("id"))
                .cloned()
                .ok_or_else(|| StoreError::MissingRelated {
                    entity: relation.target.name(),
                    field: connect.field,
                    value: connect.value.to_string(),
                })?;
            fields.insert(fk_field.to_owned(), target_id);
        }

        tables.check_unique(entity, &fields)?;

        let id = tables.allocate();
        fields.insert("id".to_owned(), Value::from(id));
        tables.table_mut(entity).insert(id, fields.clone());

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
                let child_id = tables.allocate();
                row.insert("id".to_owned(), Value::from(child_id));
                row.insert(fk_field.to_owned(), Value::from(id));
                tables.table_mut(relation.target).insert(child_id, row);
            }
        }

        Ok(fields)
    }

    async fn update(
        &self,
        entity: Entity,
        id: i32,
        patch: Record,
    ) -> Result<Option<Record>, StoreError> {
        let mut tables = self.write()?;
        let Some(record) = tables.table_mut(entity).get_mut(&id) else {
            return Ok(None);
        };
        for (key, value) in patch {
            record.insert(key, value);
        }
        Ok(Some(record.clone()))
    }

    async fn related(
        &self,
        entity: Entity,
        id: i32,
        relation: &RelationDef,
    ) -> Result<Related, StoreError> {
        let tables = self.read()?;
        let parent = tables.table(entity).and_then(|table| table.get(&id));

        match relation.kind {
            RelationKind::ManyToOne { fk_field, .. } => {
                let target_id = parent
                    .and_then(|record| record.get(fk_field))
                    .and_then(as_id);
                let Some(target_id) = target_id else {
                    return Ok(Related::One(None));
                };
                Ok(Related::One(
                    tables
                        .table(relation.target)
                        .and_then(|table| table.get(&target_id))
                        .cloned(),
                ))
            }
            RelationKind::OneToMany { fk_field, .. } => {
                if parent.is_none() {
                    return Ok(Related::Many(Vec::new()));
                }
                let fk_value = Value::from(id);
                Ok(Related::Many(
                    tables
                        .table(relation.target)
                        .map(|table| {
                            table
                                .values()
                                .filter(|record| record.get(fk_field) == Some(&fk_value))
                                .cloned()
                                .collect()
                        })
                        .unwrap_or_default(),
                ))
            }
        }
    }
}
