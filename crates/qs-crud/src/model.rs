//! The model seam implemented per entity type

use std::fmt;

use async_trait::async_trait;
use qs_core::QueryValue;
use serde::{Deserialize, Serialize};

use crate::view_state::{OrderBy, TableParams};
use crate::ApiError;

/// Identifier of a persisted entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl EntityId {
    /// Read an id back from the query. Flags and lists are not ids.
    pub fn from_query_value(value: &QueryValue) -> Option<Self> {
        match value {
            QueryValue::Number(_) => match value.as_i64() {
                Some(n) => Some(Self::Number(n)),
                None => value.to_scalar_text().map(Self::Text),
            },
            QueryValue::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_query_value(&self) -> QueryValue {
        match self {
            Self::Number(n) => QueryValue::from(*n),
            Self::Text(s) => QueryValue::from(s.as_str()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Entities the hooks can address in the URL
pub trait Identified {
    /// `None` for entities that were never saved
    fn id(&self) -> Option<EntityId>;
}

/// Arguments of a list query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindManyArgs {
    pub take: u32,
    pub skip: u64,
    pub order_by: OrderBy,
    pub search: Option<String>,
}

impl FindManyArgs {
    pub fn from_params(params: TableParams, search: Option<String>) -> Self {
        Self {
            take: params.take,
            skip: params.skip,
            order_by: params.order_by,
            search,
        }
    }

    /// Stable key for the query cache
    pub fn cache_key(&self) -> String {
        format!(
            "take={}&skip={}&order={}:{}&search={}",
            self.take,
            self.skip,
            self.order_by.field,
            self.order_by.direction.as_query(),
            self.search.as_deref().unwrap_or_default()
        )
    }
}

/// One page of a list query
#[derive(Debug, Clone, PartialEq)]
pub struct Page<E> {
    pub items: Vec<E>,
    /// Number of entities matching the query across all pages
    pub total: u64,
}

/// Backend operations for one entity type
#[async_trait]
pub trait CrudModel: Send + Sync {
    /// Entity returned by the backend
    type Entity: Identified + Clone + Send + Sync + 'static;

    /// Form values submitted by the editor
    type Values: Send + 'static;

    async fn create_one(&self, values: Self::Values) -> Result<Self::Entity, ApiError>;

    async fn update_one(&self, id: &EntityId, values: Self::Values) -> Result<Self::Entity, ApiError>;

    async fn delete_one(&self, id: &EntityId) -> Result<(), ApiError>;

    async fn find_one(&self, id: &EntityId) -> Result<Self::Entity, ApiError>;

    async fn find_many(&self, args: &FindManyArgs) -> Result<Page<Self::Entity>, ApiError>;

    /// Human-readable entity name used in notifications
    fn entity_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_state::SortDirection;
    use qs_core::query::{parse, serialize};
    use qs_core::QueryState;

    #[test]
    fn test_id_from_query_value() {
        assert_eq!(EntityId::from_query_value(&QueryValue::from(5)), Some(EntityId::Number(5)));
        assert_eq!(
            EntityId::from_query_value(&QueryValue::from("a1b2")),
            Some(EntityId::Text("a1b2".into()))
        );
        assert_eq!(EntityId::from_query_value(&QueryValue::from(true)), None);
        assert_eq!(EntityId::from_query_value(&QueryValue::from("")), None);
    }

    #[test]
    fn test_numeral_text_id_reads_back_as_number() {
        // Text ids that look like numerals lose their type and leading zeros in the URL.
        let state = QueryState::new().with("id", EntityId::Text("007".into()).to_query_value());
        let read_back = parse(&serialize(&state));
        assert_eq!(
            read_back.get("id").and_then(EntityId::from_query_value),
            Some(EntityId::Number(7))
        );

        let state = QueryState::new().with("id", EntityId::Text("a007".into()).to_query_value());
        let read_back = parse(&serialize(&state));
        assert_eq!(
            read_back.get("id").and_then(EntityId::from_query_value),
            Some(EntityId::Text("a007".into()))
        );
    }

    #[test]
    fn test_cache_key_distinguishes_pages() {
        let order_by = OrderBy::new("createdAt", SortDirection::Desc);
        let first = FindManyArgs {
            take: 10,
            skip: 0,
            order_by: order_by.clone(),
            search: None,
        };
        let second = FindManyArgs { skip: 10, ..first.clone() };

        assert_ne!(first.cache_key(), second.cache_key());
        assert_eq!(first.cache_key(), "take=10&skip=0&order=createdAt:descend&search=");
    }
}
