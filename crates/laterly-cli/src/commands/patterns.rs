//! Learned behavior patterns.

use laterly_core::{Category, TimeOfDay};

use super::{print_json, Workspace};

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open()?;
    let log = ws.log()?;
    let patterns = ws.coordinator.analyze(&log);

    if json {
        return print_json(&patterns);
    }

    println!("Events analyzed: {}", patterns.events_analyzed);
    if patterns.events_analyzed == 0 {
        println!("\nNo behavior recorded yet. Use `laterly track` to record actions.");
        return Ok(());
    }

    println!("\nEngagement by time of day:");
    for tod in TimeOfDay::ALL {
        let energy = patterns.energy(tod);
        match patterns.time_preferences.get(&tod) {
            Some(rate) => println!(
                "  {:<10} rate {:.2} ({} actions)  energy {:.2}",
                tod.as_str(),
                rate.rate(),
                rate.total,
                energy
            ),
            None => println!("  {:<10} no data", tod.as_str()),
        }
    }

    println!("\nContent affinity:");
    for category in Category::ALL {
        println!("  {:<12} {:+.2}", category.as_str(), patterns.affinity(category));
    }

    let s = &patterns.sessions;
    println!(
        "\nSessions: {} (avg {:.1} min, median {:.1} min, usually {:?})",
        s.count, s.average_minutes, s.median_minutes, s.preferred_length
    );

    let r = &patterns.rejections;
    println!("Rejections: {} total, longest streak {}", r.total, r.longest_streak);
    Ok(())
}
