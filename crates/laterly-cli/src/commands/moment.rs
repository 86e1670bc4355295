//! Moment detection for the current context and session.

use super::{print_json, Workspace};

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = Workspace::open()?;
    let log = ws.log()?;
    let ctx = ws.coordinator.current_context();
    ws.coordinator.resume_session(&log, ctx.now);
    let moment = ws.coordinator.detect_moment(&log, &ctx);

    if json {
        return print_json(&moment);
    }

    println!("Moment:      {} ({:.0}% confident)", moment.moment_type, moment.confidence * 100.0);
    if !moment.indicators.is_empty() {
        println!("Indicators:  {}", moment.indicators.join(", "));
    }
    let rec = &moment.recommendations;
    if !rec.preferred_types.is_empty() {
        println!("Prefers:     {}", rec.preferred_types.join(", "));
    }
    if let Some(max) = rec.max_duration {
        println!("Max length:  {max} min");
    }
    if !rec.avoid.is_empty() {
        println!("Avoids:      {}", rec.avoid.join(", "));
    }
    Ok(())
}
