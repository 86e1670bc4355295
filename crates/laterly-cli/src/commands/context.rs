//! Current usage context.

use super::{print_json, Workspace};

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = Workspace::open()?;
    let ctx = ws.coordinator.current_context();

    if json {
        return print_json(&ctx);
    }

    println!("Time of day:  {}", ctx.time_of_day);
    println!("Day:          {} ({})", ctx.weekday_name(), if ctx.is_weekend() { "weekend" } else { "weekday" });
    println!("Hour:         {}", ctx.hour);
    println!("First visit:  {}", if ctx.is_first_visit { "yes" } else { "no" });
    Ok(())
}
