//! View state derived from the query
//!
//! Nothing here is stored: every read builds a fresh [`CrudViewState`] from
//! the controller's current query.

use qs_core::{QueryState, TableSettings};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::EntityId;

/// Query keys owned by CRUD screens
pub mod keys {
    pub const ADD: &str = "add";
    pub const EDIT: &str = "edit";
    pub const VIEW: &str = "view";
    pub const ID: &str = "id";
    pub const FIELD: &str = "field";
    pub const ORDER: &str = "order";
    pub const PAGE_NUMBER: &str = "pageNumber";
    pub const PAGE_SIZE: &str = "pageSize";
    pub const SEARCH: &str = "search";

    pub const ALL: [&str; 9] = [
        ADD,
        EDIT,
        VIEW,
        ID,
        FIELD,
        ORDER,
        PAGE_NUMBER,
        PAGE_SIZE,
        SEARCH,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse the `order` query value
    pub fn from_query(value: &str) -> Option<Self> {
        match value {
            "ascend" => Some(Self::Asc),
            "descend" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Asc => "ascend",
            Self::Desc => "descend",
        }
    }
}

/// Sort column and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Which editor the screen shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrudMode {
    Idle,
    Adding,
    Editing(EntityId),
    Viewing(EntityId),
}

/// Pagination arguments for the list query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableParams {
    pub take: u32,
    pub skip: u64,
    pub order_by: OrderBy,
}

/// Snapshot of the CRUD keys of the current query
#[derive(Debug, Clone, PartialEq)]
pub struct CrudViewState {
    pub mode: CrudMode,
    /// 1-based
    pub page_number: u64,
    pub page_size: u32,
    /// Sort named by the URL, if any
    pub sort: Option<OrderBy>,
    /// Raw `search` value as stored in the URL
    pub search: Option<String>,
    default_sort_field: String,
}

impl CrudViewState {
    pub fn derive(query: &QueryState, table: &TableSettings) -> Self {
        let query = query.restricted_to(&keys::ALL);

        let page_number = query
            .get(keys::PAGE_NUMBER)
            .and_then(|v| v.as_i64())
            .filter(|n| *n >= 1)
            .and_then(|n| u32::try_from(n).ok())
            .map(u64::from)
            .unwrap_or(1);

        let page_size = query
            .get(keys::PAGE_SIZE)
            .and_then(|v| v.as_i64())
            .filter(|n| *n >= 1)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(table.default_page_size.max(1));

        let sort = match (
            query.get(keys::FIELD).and_then(|v| v.to_scalar_text()),
            query.get(keys::ORDER).and_then(|v| v.as_str()),
        ) {
            (Some(field), Some(order)) if !field.is_empty() => {
                SortDirection::from_query(order).map(|direction| OrderBy::new(field, direction))
            }
            _ => None,
        };

        let search = query
            .get(keys::SEARCH)
            .and_then(|v| v.to_scalar_text())
            .filter(|s| !s.is_empty());

        Self {
            mode: derive_mode(&query),
            page_number,
            page_size,
            sort,
            search,
            default_sort_field: table.default_sort_field.clone(),
        }
    }

    pub fn is_modal_open(&self) -> bool {
        self.mode != CrudMode::Idle
    }

    /// Sort in effect: the URL's, else descending on the default field
    pub fn order_by(&self) -> OrderBy {
        self.sort
            .clone()
            .unwrap_or_else(|| OrderBy::new(self.default_sort_field.clone(), SortDirection::Desc))
    }

    pub fn params(&self) -> TableParams {
        TableParams {
            take: self.page_size,
            skip: self
                .page_number
                .saturating_sub(1)
                .saturating_mul(u64::from(self.page_size)),
            order_by: self.order_by(),
        }
    }
}

// add > edit > view when more than one flag is set.
fn derive_mode(query: &QueryState) -> CrudMode {
    if query.flag(keys::ADD) {
        return CrudMode::Adding;
    }

    let id = query.get(keys::ID).and_then(EntityId::from_query_value);
    let flag = if query.flag(keys::EDIT) {
        keys::EDIT
    } else if query.flag(keys::VIEW) {
        keys::VIEW
    } else {
        return CrudMode::Idle;
    };

    match (flag, id) {
        (keys::EDIT, Some(id)) => CrudMode::Editing(id),
        (_, Some(id)) => CrudMode::Viewing(id),
        (flag, None) => {
            warn!(flag, "mode flag set without an id");
            CrudMode::Idle
        }
    }
}
