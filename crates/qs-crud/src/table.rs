//! Paginated, sortable, searchable list bound to the query

use std::sync::Arc;

use qs_core::{
    AppContext, EventBus, LocationParams, NavigationOutcome, Notification, PushOptions,
    QueryCache, QueryPatch, TableSettings,
};
use tracing::{debug, warn};

use crate::model::{CrudModel, FindManyArgs, Page};
use crate::view_state::{keys, CrudViewState, OrderBy, TableParams};

/// Prefix written in front of search text
pub const SEARCH_PREFIX: char = '~';

/// Pagination and sorter change reported by a table widget
#[derive(Debug, Clone, PartialEq)]
pub struct TableChange {
    pub page_number: u64,
    pub page_size: u32,
    /// `None` when the user cleared the sort
    pub sorter: Option<OrderBy>,
}

/// Table hook for one entity type
pub struct CrudTable<M: CrudModel> {
    location: LocationParams,
    model: Arc<M>,
    cache: Arc<QueryCache>,
    events: Arc<EventBus>,
    table: TableSettings,
    bucket: String,
}

impl<M: CrudModel> CrudTable<M> {
    pub fn new(ctx: &AppContext, location: LocationParams, model: Arc<M>) -> Self {
        let bucket = model.entity_name().to_string();
        Self {
            location,
            model,
            cache: ctx.cache().clone(),
            events: ctx.events().clone(),
            table: ctx.settings().table.clone(),
            bucket,
        }
    }

    /// Cache pages under `bucket` instead of the entity name
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn state(&self) -> CrudViewState {
        CrudViewState::derive(&self.location.query(), &self.table)
    }

    /// `take`, `skip` and `order_by` for the list query
    pub fn params(&self) -> TableParams {
        self.state().params()
    }

    /// Search text: the stored value without its first character
    pub fn search(&self) -> Option<String> {
        self.state()
            .search
            .map(|raw| raw.chars().skip(1).collect::<String>())
            .filter(|text| !text.is_empty())
    }

    /// Store search text and go back to the first page
    pub fn set_search(&self, text: &str) -> NavigationOutcome {
        let text = text.trim();
        let patch = QueryPatch::new().unset(keys::PAGE_NUMBER);
        let patch = if text.is_empty() {
            patch.unset(keys::SEARCH)
        } else {
            patch.set(keys::SEARCH, format!("{SEARCH_PREFIX}{text}"))
        };
        self.location.push(patch, PushOptions::merge())
    }

    /// Write a pagination/sort change. Unrelated keys survive.
    pub fn on_change(&self, change: TableChange) -> NavigationOutcome {
        let patch = QueryPatch::new()
            .set(keys::PAGE_NUMBER, change.page_number.max(1))
            .set(keys::PAGE_SIZE, change.page_size.max(1));

        let patch = match change.sorter {
            Some(sorter) => patch
                .set(keys::FIELD, sorter.field)
                .set(keys::ORDER, sorter.direction.as_query()),
            None => patch.unset(keys::FIELD).unset(keys::ORDER),
        };
        self.location.push(patch, PushOptions::merge())
    }

    /// Arguments of the list query for the current URL
    pub fn find_many_args(&self) -> FindManyArgs {
        FindManyArgs::from_params(self.params(), self.search())
    }

    /// Fetch the current page, from the cache when still valid
    pub async fn fetch(&self) -> Option<Page<M::Entity>> {
        let args = self.find_many_args();
        let key = args.cache_key();

        if let Some(page) = self.cache.get::<Page<M::Entity>>(&self.bucket, &key) {
            debug!(bucket = %self.bucket, key, "page served from cache");
            return Some(page);
        }

        match self.model.find_many(&args).await {
            Ok(page) => {
                self.cache.put(&self.bucket, &key, page.clone());
                Some(page)
            }
            Err(error) => {
                warn!(
                    entity = self.model.entity_name(),
                    status = error.status,
                    %error,
                    "list request failed"
                );
                self.events.publish(Notification::error(error.user_message()));
                None
            }
        }
    }
}
