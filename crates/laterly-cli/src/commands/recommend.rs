//! Recommendation bundle for a set of items.

use std::path::Path;

use laterly_core::{ItemCatalog, ItemSource, RecommendationBundle};

use super::{print_json, Workspace};

pub fn run(items: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = ItemCatalog::load(items)?;
    let mut ws = Workspace::open()?;
    let log = ws.log()?;

    let ctx = ws.coordinator.current_context();
    ws.coordinator.resume_session(&log, ctx.now);
    let bundle = ws.coordinator.generate_at(&catalog.all_items(), &log, &ctx);

    if json {
        return print_json(&bundle);
    }
    print_bundle(&bundle);
    Ok(())
}

fn label(title: &str, id: &str) -> String {
    if title.is_empty() {
        id.to_string()
    } else {
        format!("{title} [{id}]")
    }
}

fn print_bundle(bundle: &RecommendationBundle) {
    let meta = &bundle.meta;
    println!(
        "Moment: {} ({:.0}%), {} of {} items eligible",
        meta.moment,
        meta.confidence * 100.0,
        meta.scored_items,
        meta.total_items
    );

    println!("\nFor this moment:");
    match &bundle.for_this_moment {
        Some(pick) => {
            println!("  {}", label(&pick.item.title, &pick.item.id));
            println!("  {} - {} (score {:.2})", pick.action, pick.reason, pick.score);
        }
        None => println!("  nothing to suggest"),
    }

    if !bundle.might_need_attention.is_empty() {
        println!("\nMight need attention:");
        for a in &bundle.might_need_attention {
            println!("  {:<40} {} (urgency {:.1})", label(&a.item.title, &a.item.id), a.reason, a.urgency);
        }
    }

    if !bundle.continue_reading.is_empty() {
        println!("\nContinue reading:");
        for c in &bundle.continue_reading {
            println!(
                "  {:<40} {}% done, ~{} min left",
                label(&c.item.title, &c.item.id),
                c.percent_complete,
                c.remaining_minutes
            );
        }
    }

    if !bundle.quick_actions.is_empty() {
        println!("\nQuick actions:");
        for q in &bundle.quick_actions {
            println!("  {}: {}", q.title, q.description);
        }
    }
}
