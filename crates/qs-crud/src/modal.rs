//! Create/edit/view modal driven by query flags

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use qs_core::{
    AppContext, EventBus, LocationParams, NavigationOutcome, Notification, PushOptions,
    QueryCache, QueryPatch, TableSettings,
};
use tracing::{debug, info, warn};

use crate::model::{CrudModel, EntityId, Identified};
use crate::view_state::{keys, CrudMode, CrudViewState};
use crate::ApiError;

/// Result of a mutation started from the modal
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<E> {
    Created(E),
    Updated(E),
    Deleted(EntityId),
    Failed(ApiError),
    /// Nothing to do in the current mode
    Skipped,
}

impl<E> MutationOutcome<E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Updated(_) | Self::Deleted(_))
    }
}

// Counts calls in flight while alive.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MutationFlags {
    creating: AtomicUsize,
    updating: AtomicUsize,
    deleting: AtomicUsize,
}

/// Modal hook for one entity type
pub struct CrudModal<M: CrudModel> {
    location: LocationParams,
    model: Arc<M>,
    cache: Arc<QueryCache>,
    events: Arc<EventBus>,
    table: TableSettings,
    bucket: String,
    flags: MutationFlags,
}

impl<M: CrudModel> CrudModal<M> {
    /// Hook over `model`, caching under the model's entity name
    pub fn new(ctx: &AppContext, location: LocationParams, model: Arc<M>) -> Self {
        let bucket = model.entity_name().to_string();
        Self {
            location,
            model,
            cache: ctx.cache().clone(),
            events: ctx.events().clone(),
            table: ctx.settings().table.clone(),
            bucket,
            flags: MutationFlags::default(),
        }
    }

    /// Invalidate `bucket` after mutations instead of the entity name
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn state(&self) -> CrudViewState {
        CrudViewState::derive(&self.location.query(), &self.table)
    }

    pub fn mode(&self) -> CrudMode {
        self.state().mode
    }

    pub fn is_creating(&self) -> bool {
        self.flags.creating.load(Ordering::SeqCst) > 0
    }

    pub fn is_updating(&self) -> bool {
        self.flags.updating.load(Ordering::SeqCst) > 0
    }

    pub fn is_deleting(&self) -> bool {
        self.flags.deleting.load(Ordering::SeqCst) > 0
    }

    /// Open the editor in create mode
    pub fn add(&self) -> NavigationOutcome {
        self.open(keys::ADD, None)
    }

    /// Open the editor on an existing entity
    pub fn edit(&self, entity: &M::Entity) -> NavigationOutcome {
        match entity.id() {
            Some(id) => self.open(keys::EDIT, Some(id)),
            None => {
                warn!(entity = self.model.entity_name(), "cannot edit an entity without id");
                NavigationOutcome::Unchanged
            }
        }
    }

    /// Open the read-only detail view
    pub fn view(&self, entity: &M::Entity) -> NavigationOutcome {
        match entity.id() {
            Some(id) => self.open(keys::VIEW, Some(id)),
            None => {
                warn!(entity = self.model.entity_name(), "cannot view an entity without id");
                NavigationOutcome::Unchanged
            }
        }
    }

    /// Close the modal, keeping every other key
    pub fn cancel(&self) -> NavigationOutcome {
        let patch = QueryPatch::new()
            .unset(keys::ADD)
            .unset(keys::EDIT)
            .unset(keys::VIEW)
            .unset(keys::ID);
        self.location.push(patch, PushOptions::merge())
    }

    fn open(&self, flag: &str, id: Option<EntityId>) -> NavigationOutcome {
        let mut patch = QueryPatch::new();
        for key in [keys::ADD, keys::EDIT, keys::VIEW] {
            patch = if key == flag {
                patch.set(key, true)
            } else {
                patch.unset(key)
            };
        }
        let patch = patch.set_opt(keys::ID, id.map(|id| id.to_query_value()));
        self.location.push(patch, PushOptions::merge())
    }

    /// Entity addressed by the URL in edit or view mode
    pub async fn current_entity(&self) -> Option<M::Entity> {
        let id = match self.mode() {
            CrudMode::Editing(id) | CrudMode::Viewing(id) => id,
            _ => return None,
        };

        let key = format!("one:{id}");
        if let Some(entity) = self.cache.get::<M::Entity>(&self.bucket, &key) {
            return Some(entity);
        }

        match self.model.find_one(&id).await {
            Ok(entity) => {
                self.cache.put(&self.bucket, &key, entity.clone());
                Some(entity)
            }
            Err(error) => {
                self.fail("load", error);
                None
            }
        }
    }

    /// Submit the editor: create in add mode, update in edit mode
    pub async fn on_finish(&self, values: M::Values) -> MutationOutcome<M::Entity> {
        let query = self.location.query();

        if query.flag(keys::ADD) {
            return self.create(values).await;
        }

        if query.flag(keys::EDIT) {
            return match query.get(keys::ID).and_then(EntityId::from_query_value) {
                Some(id) => self.update(id, values).await,
                None => {
                    warn!(entity = self.model.entity_name(), "edit mode without id, nothing to update");
                    MutationOutcome::Skipped
                }
            };
        }

        debug!("submit outside add/edit mode ignored");
        MutationOutcome::Skipped
    }

    /// Delete an entity without opening the modal
    pub async fn remove(&self, entity: &M::Entity) -> MutationOutcome<M::Entity> {
        let Some(id) = entity.id() else {
            warn!(entity = self.model.entity_name(), "cannot delete an entity without id");
            return MutationOutcome::Skipped;
        };

        let result = {
            let _guard = InFlight::start(&self.flags.deleting);
            self.model.delete_one(&id).await
        };

        match result {
            Ok(()) => {
                self.succeed("deleted");
                MutationOutcome::Deleted(id)
            }
            Err(error) => self.fail("delete", error),
        }
    }

    async fn create(&self, values: M::Values) -> MutationOutcome<M::Entity> {
        let result = {
            let _guard = InFlight::start(&self.flags.creating);
            self.model.create_one(values).await
        };

        match result {
            Ok(entity) => {
                self.succeed("created");
                self.cancel();
                MutationOutcome::Created(entity)
            }
            Err(error) => self.fail("create", error),
        }
    }

    async fn update(&self, id: EntityId, values: M::Values) -> MutationOutcome<M::Entity> {
        let result = {
            let _guard = InFlight::start(&self.flags.updating);
            self.model.update_one(&id, values).await
        };

        match result {
            Ok(entity) => {
                self.succeed("updated");
                self.cancel();
                MutationOutcome::Updated(entity)
            }
            Err(error) => self.fail("update", error),
        }
    }

    fn succeed(&self, action: &str) {
        let name = self.model.entity_name();
        info!(entity = name, action, bucket = %self.bucket, "mutation succeeded");
        self.cache.invalidate(&self.bucket);
        self.events
            .publish(Notification::success(format!("{name} {action}")));
    }

    fn fail(&self, action: &str, error: ApiError) -> MutationOutcome<M::Entity> {
        warn!(
            entity = self.model.entity_name(),
            action,
            status = error.status,
            %error,
            "request failed"
        );
        self.events.publish(Notification::error(error.user_message()));
        MutationOutcome::Failed(error)
    }
}
