//! In-memory model for demos and tests

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::model::{CrudModel, EntityId, FindManyArgs, Identified, Page};
use crate::view_state::SortDirection;
use crate::ApiError;

/// Schemaless entity held by [`InMemoryModel`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    fn matches(&self, needle: &str) -> bool {
        self.fields.values().any(|value| match value {
            Value::String(s) => s.to_lowercase().contains(needle),
            _ => false,
        })
    }

    fn compare_by(&self, other: &Record, field: &str) -> Ordering {
        let primary = match field {
            "id" => self.id.cmp(&other.id),
            "createdAt" => self.created_at.cmp(&other.created_at),
            _ => compare_values(self.field(field), other.field(field)),
        };
        primary.then(self.id.cmp(&other.id))
    }
}

impl Identified for Record {
    fn id(&self) -> Option<EntityId> {
        Some(EntityId::Number(self.id))
    }
}

/// A [`CrudModel`] over a vector of [`Record`]s
pub struct InMemoryModel {
    name: String,
    records: RwLock<Vec<Record>>,
    next_id: AtomicI64,
    failures: Mutex<VecDeque<ApiError>>,
    find_many_calls: AtomicUsize,
}

impl InMemoryModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            failures: Mutex::new(VecDeque::new()),
            find_many_calls: AtomicUsize::new(0),
        }
    }

    /// Insert records directly, bypassing failure injection
    pub fn seed(&self, rows: impl IntoIterator<Item = Value>) {
        for row in rows {
            if let Value::Object(fields) = row {
                self.insert(fields);
            }
        }
    }

    /// Make the next model call fail with `error`
    pub fn fail_next(&self, error: ApiError) {
        self.failures.lock().push_back(error);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Number of list queries served
    pub fn find_many_calls(&self) -> usize {
        self.find_many_calls.load(AtomicOrdering::SeqCst)
    }

    fn insert(&self, fields: Map<String, Value>) -> Record {
        let record = Record {
            id: self.next_id.fetch_add(1, AtomicOrdering::SeqCst),
            created_at: Utc::now(),
            fields,
        };
        self.records.write().push(record.clone());
        record
    }

    fn injected_failure(&self) -> Result<(), ApiError> {
        match self.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn numeric_id(id: &EntityId) -> Result<i64, ApiError> {
    match id {
        EntityId::Number(n) => Ok(*n),
        EntityId::Text(s) => s
            .parse()
            .map_err(|_| ApiError::new(400, format!("invalid id {s}"))),
    }
}

fn object(values: Value) -> Result<Map<String, Value>, ApiError> {
    match values {
        Value::Object(fields) => Ok(fields),
        _ => Err(ApiError::new(400, "values must be an object")),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl CrudModel for InMemoryModel {
    type Entity = Record;
    type Values = Value;

    async fn create_one(&self, values: Value) -> Result<Record, ApiError> {
        self.injected_failure()?;
        let record = self.insert(object(values)?);
        debug!(entity = %self.name, id = record.id, "record created");
        Ok(record)
    }

    async fn update_one(&self, id: &EntityId, values: Value) -> Result<Record, ApiError> {
        self.injected_failure()?;
        let id = numeric_id(id)?;
        let fields = object(values)?;

        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::not_found(format!("{} {id}", self.name)))?;
        record.fields.extend(fields);
        Ok(record.clone())
    }

    async fn delete_one(&self, id: &EntityId) -> Result<(), ApiError> {
        self.injected_failure()?;
        let id = numeric_id(id)?;

        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(ApiError::not_found(format!("{} {id}", self.name)));
        }
        Ok(())
    }

    async fn find_one(&self, id: &EntityId) -> Result<Record, ApiError> {
        self.injected_failure()?;
        let id = numeric_id(id)?;
        self.records
            .read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("{} {id}", self.name)))
    }

    async fn find_many(&self, args: &FindManyArgs) -> Result<Page<Record>, ApiError> {
        self.find_many_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.injected_failure()?;

        let needle = args.search.as_deref().map(str::to_lowercase);
        let mut matching: Vec<Record> = self
            .records
            .read()
            .iter()
            .filter(|r| needle.as_deref().map_or(true, |n| r.matches(n)))
            .cloned()
            .collect();

        let field = args.order_by.field.as_str();
        matching.sort_by(|a, b| match args.order_by.direction {
            SortDirection::Asc => a.compare_by(b, field),
            SortDirection::Desc => b.compare_by(a, field),
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(args.skip).unwrap_or(usize::MAX))
            .take(args.take as usize)
            .collect();

        Ok(Page { items, total })
    }

    fn entity_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_state::OrderBy;
    use serde_json::json;

    fn model() -> InMemoryModel {
        let model = InMemoryModel::new("Product");
        model.seed([
            json!({"name": "Boots", "price": 120}),
            json!({"name": "Sandals", "price": 40}),
            json!({"name": "Ankle boots", "price": 95}),
        ]);
        model
    }

    fn args(field: &str, direction: SortDirection) -> FindManyArgs {
        FindManyArgs {
            take: 10,
            skip: 0,
            order_by: OrderBy::new(field, direction),
            search: None,
        }
    }

    #[tokio::test]
    async fn test_find_many_sorts_and_pages() {
        let model = model();

        let page = model.find_many(&args("price", SortDirection::Asc)).await.unwrap();
        let prices: Vec<_> = page.items.iter().map(|r| r.field("price").cloned()).collect();
        assert_eq!(prices, vec![Some(json!(40)), Some(json!(95)), Some(json!(120))]);
        assert_eq!(page.total, 3);

        let second = model
            .find_many(&FindManyArgs {
                take: 2,
                skip: 2,
                ..args("id", SortDirection::Asc)
            })
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, 3);
        assert_eq!(second.total, 3);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let model = model();
        let page = model
            .find_many(&FindManyArgs {
                search: Some("BOOTS".into()),
                ..args("id", SortDirection::Asc)
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let model = model();
        let updated = model
            .update_one(&EntityId::Number(2), json!({"price": 35}))
            .await
            .unwrap();
        assert_eq!(updated.field("price"), Some(&json!(35)));
        assert_eq!(updated.field("name"), Some(&json!("Sandals")));

        model.delete_one(&EntityId::Number(2)).await.unwrap();
        let err = model.find_one(&EntityId::Number(2)).await.unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let model = model();
        model.fail_next(ApiError::new(500, "backend down"));

        assert!(model.create_one(json!({"name": "Clogs"})).await.is_err());
        assert!(model.create_one(json!({"name": "Clogs"})).await.is_ok());
        assert_eq!(model.len(), 4);
    }

    #[tokio::test]
    async fn test_non_object_values_rejected() {
        let model = InMemoryModel::new("Product");
        let err = model.create_one(json!(["not", "an", "object"])).await.unwrap_err();
        assert_eq!(err.status, 400);
        assert!(model.is_empty());
    }
}
