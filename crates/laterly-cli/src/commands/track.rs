//! Interaction tracking.

use std::path::Path;

use laterly_core::{Action, ItemCatalog};

use super::Workspace;

pub fn run(
    action: &str,
    item_id: &str,
    items: &Path,
    suggestion: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = ItemCatalog::load(items)?;
    let item = catalog.require(item_id)?;
    let action = Action::from(action.to_string());

    let mut ws = Workspace::open()?;
    let mut log = ws.log()?;
    let ctx = ws.coordinator.current_context();
    ws.coordinator.resume_session(&log, ctx.now);

    let event = match suggestion {
        Some(kind) => ws
            .coordinator
            .track_suggestion_interaction_at(&mut log, action, &item, kind, &ctx),
        None => ws.coordinator.track_interaction_at(&mut log, action, &item, &ctx),
    };
    ws.db
        .append_event(&event, ws.config.recommendations.log_capacity)?;

    println!("tracked {} on {}", event.action, event.item.id);
    Ok(())
}
