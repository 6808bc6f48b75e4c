//! Demo mode
//! Drives a product admin screen and a shopper session against in-memory data

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tracing::{debug, info, warn};

use qs_core::events::events::Navigated;
use qs_core::{
    AppContext, History, Location, LocationSubscriber, MemoryHistory, NavigationKind,
    Notification, NotificationLevel, TabState,
};
use qs_crud::{
    ApiError, CrudModal, CrudTable, InMemoryModel, MutationOutcome, OrderBy, Page, Record,
    SortDirection, TableChange,
};
use qs_session::{AddressDraft, SessionChange, SessionStore, SessionSubscriber};

/// Logs every history change, standing in for a re-render
struct RenderLog;

impl LocationSubscriber for RenderLog {
    fn on_location_change(&self, location: &Location, kind: NavigationKind) {
        info!(?kind, href = %location.href(), "render");
    }
}

struct SessionLog;

impl SessionSubscriber for SessionLog {
    fn on_session_change(&self, change: SessionChange) {
        debug!(?change, "session updated");
    }
}

fn demo_products() -> InMemoryModel {
    let model = InMemoryModel::new("Product");
    model.seed([
        json!({"name": "Trail boots", "price": 12900, "status": "active"}),
        json!({"name": "City sneakers", "price": 8900, "status": "active"}),
        json!({"name": "Rain boots", "price": 4900, "status": "archived"}),
        json!({"name": "Wool socks", "price": 1500, "status": "active"}),
        json!({"name": "Leather sandals", "price": 6900, "status": "active"}),
        json!({"name": "Hiking boots", "price": 15900, "status": "active"}),
        json!({"name": "Slippers", "price": 2900, "status": "archived"}),
    ]);
    model
}

fn log_page(label: &str, page: Option<&Page<Record>>) {
    let Some(page) = page else {
        warn!(label, "no page loaded");
        return;
    };
    let names: Vec<String> = page
        .items
        .iter()
        .filter_map(|r| r.field("name").and_then(|v| v.as_str()).map(String::from))
        .collect();
    info!(label, total = page.total, ?names, "page loaded");
}

/// Run the demo flow
pub async fn run(ctx: Arc<AppContext>, start_url: &str) -> Result<()> {
    let history = Arc::new(MemoryHistory::new(start_url)?);
    let render_log: Arc<dyn LocationSubscriber> = Arc::new(RenderLog);
    history.add_subscriber(render_log.clone());

    ctx.events().on::<Notification, _>(|n| match n.level {
        NotificationLevel::Error | NotificationLevel::Warning => {
            warn!(message = %n.message, "notification")
        }
        _ => info!(message = %n.message, "notification"),
    });
    ctx.events()
        .on::<Navigated, _>(|e| debug!(href = %e.href, mode = ?e.mode, "navigated"));
    ctx.notify_dev_mode();

    let location = ctx.location(history.clone());
    let model = Arc::new(demo_products());
    let table = CrudTable::new(&ctx, location.clone(), model.clone());
    let modal = CrudModal::new(&ctx, location.clone(), model.clone());
    let tabs = TabState::new(location.clone(), &["all", "active", "archived"]);

    // List screen
    log_page("first page", table.fetch().await.as_ref());

    table.on_change(TableChange {
        page_number: 1,
        page_size: 3,
        sorter: Some(OrderBy::new("price", SortDirection::Asc)),
    });
    log_page("cheapest three", table.fetch().await.as_ref());

    table.set_search("boots");
    log_page("search: boots", table.fetch().await.as_ref());

    tabs.select("active");
    info!(tab = ?tabs.active(), "tab selected");

    // Same filter again; no navigation
    let again = table.set_search("boots");
    info!(navigated = again.navigated(), "repeated search");

    // Create
    modal.add();
    match modal.on_finish(json!({"name": "Canvas shoes", "price": 5900})).await {
        MutationOutcome::Created(record) => info!(id = record.id, "created"),
        other => warn!(?other, "create did not succeed"),
    }

    // Failing update keeps the editor open
    if let Some(first) = table.fetch().await.and_then(|p| p.items.into_iter().next()) {
        modal.edit(&first);
        model.fail_next(ApiError::with_messages(
            422,
            vec!["price must be positive".to_string()],
        ));
        let outcome = modal.on_finish(json!({"price": -1})).await;
        info!(failed = !outcome.is_success(), mode = ?modal.mode(), "update attempted");

        let outcome = modal.on_finish(json!({"price": 13900})).await;
        info!(success = outcome.is_success(), mode = ?modal.mode(), "update retried");

        modal.view(&first);
        if let Some(current) = modal.current_entity().await {
            info!(id = current.id, "viewing");
        }
        modal.cancel();

        let removed = modal.remove(&first).await;
        info!(success = removed.is_success(), "removed");
    }
    log_page("after mutations", table.fetch().await.as_ref());

    if history.back() {
        info!(href = %history.href(), "went back");
    }

    // Shopper session
    let session = SessionStore::open(&ctx.settings().session)?;
    let session_log: Arc<dyn SessionSubscriber> = Arc::new(SessionLog);
    session.subscribe(session_log.clone());

    session.add_address(AddressDraft {
        label: "Home".to_string(),
        recipient: "Sam Doe".to_string(),
        line1: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        postal_code: "12345".to_string(),
        country: "US".to_string(),
        ..AddressDraft::default()
    });
    session.record_view("sku-1", "Trail boots");
    session.record_view("sku-4", "Wool socks");
    session.add_to_cart("sku-1", "Trail boots", 12900, 1);
    session.add_to_cart("sku-4", "Wool socks", 1500, 3);

    info!(
        default_address = ?session.default_address().map(|a| a.label),
        recently_viewed = session.recently_viewed().len(),
        items = session.cart_count(),
        total = session.cart_total(),
        "session summary"
    );

    info!(
        navigations = history.navigation_count(),
        href = %history.href(),
        "demo finished"
    );
    Ok(())
}
