//! Sub-score functions.
//!
//! Each factor is a pure function returning a value in [0, 1]. The engine
//! supplies whatever learned state a factor needs (recent suggestions,
//! rejection counts) as plain arguments.

use crate::context::{Context, TimeOfDay};
use crate::item::{Category, Complexity, Item};
use crate::patterns::UserPatterns;
use crate::session::{FocusLevel, SessionCharacteristics, SessionMode};

/// Category × time-of-day affinity, adjusted for weekends.
///
/// Life and inspiration get ×1.2 on weekends, work gets ×0.7.
pub fn base_score(category: Category, ctx: &Context) -> f64 {
    let base = match (category, ctx.time_of_day) {
        (Category::Work, TimeOfDay::Morning) => 0.9,
        (Category::Work, TimeOfDay::Afternoon) => 0.7,
        (Category::Work, TimeOfDay::Evening) => 0.3,
        (Category::Work, TimeOfDay::Night) => 0.1,
        (Category::Life, TimeOfDay::Morning) => 0.4,
        (Category::Life, TimeOfDay::Afternoon) => 0.6,
        (Category::Life, TimeOfDay::Evening) => 0.9,
        (Category::Life, TimeOfDay::Night) => 0.7,
        (Category::Inspiration, TimeOfDay::Morning) => 0.6,
        (Category::Inspiration, TimeOfDay::Afternoon) => 0.8,
        (Category::Inspiration, TimeOfDay::Evening) => 0.8,
        (Category::Inspiration, TimeOfDay::Night) => 0.6,
    };

    if !ctx.is_weekend() {
        return base;
    }
    let multiplier = match category {
        Category::Work => 0.7,
        Category::Life | Category::Inspiration => 1.2,
    };
    (base * multiplier).min(1.0)
}

/// Staleness score from item age in days.
///
/// - < 1 day: 0.6
/// - [1, 2): 0.8
/// - [2, 3]: 1.0 (sweet spot)
/// - (3, 7]: linear 1.0 → 0.4
/// - > 7: linear 0.4 → 0.1 at 30 days, then flat at 0.1
pub fn staleness_score(age_days: f64) -> f64 {
    if age_days < 1.0 {
        0.6
    } else if age_days < 2.0 {
        0.8
    } else if age_days <= 3.0 {
        1.0
    } else if age_days <= 7.0 {
        1.0 - 0.6 * (age_days - 3.0) / 4.0
    } else {
        let t = ((age_days - 7.0) / 23.0).min(1.0);
        0.1 + 0.3 * (1.0 - t)
    }
}

/// Progress score. Completed items score exactly 0.
pub fn progress_score(progress: f64) -> f64 {
    if progress >= 1.0 {
        0.0
    } else if progress <= 0.0 {
        0.6
    } else if progress < 0.3 {
        0.8
    } else if progress <= 0.7 {
        1.0
    } else {
        0.9
    }
}

/// Penalize categories that were just suggested: `max(0.2, 1 − 0.3n)` where
/// `n` counts occurrences in `recent`.
pub fn variety_score(category: Category, recent: &[Category]) -> f64 {
    let occurrences = recent.iter().filter(|c| **c == category).count();
    if occurrences == 0 {
        1.0
    } else {
        (1.0 - 0.3 * occurrences as f64).max(0.2)
    }
}

/// Minutes the user probably has, from session mode then time of day.
pub fn available_minutes(ctx: &Context, session: &SessionCharacteristics) -> f64 {
    match session.mode {
        SessionMode::Triage => 3.0,
        SessionMode::DeepWork => 20.0,
        SessionMode::Explore | SessionMode::Mixed => match ctx.time_of_day {
            TimeOfDay::Morning => 10.0,
            TimeOfDay::Afternoon => 5.0,
            TimeOfDay::Evening => 15.0,
            TimeOfDay::Night => 5.0,
        },
    }
}

/// How well an item's length fits the available time.
pub fn duration_fit_score(duration_minutes: u32, available_minutes: f64) -> f64 {
    if available_minutes <= 0.0 {
        return 0.2;
    }
    let ratio = duration_minutes as f64 / available_minutes;
    if (0.8..=1.0).contains(&ratio) {
        1.0
    } else if (0.5..0.8).contains(&ratio) {
        0.9
    } else if ratio > 1.0 && ratio <= 1.5 {
        0.6
    } else if ratio < 0.5 {
        0.7
    } else {
        0.2
    }
}

/// Learned fit: slot engagement, category affinity and energy proximity.
pub fn pattern_score(item: &Item, ctx: &Context, patterns: &UserPatterns) -> f64 {
    let mut score = 0.5;

    if patterns.slot_rate(&ctx.slot_key()) > 0.6 {
        score *= 1.3;
    }

    score *= 1.0 + 0.5 * patterns.affinity(item.category);

    let required = item.complexity().required_energy();
    if (required - patterns.energy(ctx.time_of_day)).abs() <= 0.3 {
        score *= 1.2;
    }

    score.clamp(0.0, 1.0)
}

/// `max(0.1, 1 − 0.2n)` for `n` rejections inside the decay window.
pub fn rejection_penalty(recent_rejections: usize) -> f64 {
    (1.0 - 0.2 * recent_rejections as f64).max(0.1)
}

/// Session focus against item complexity.
pub fn energy_match_score(focus: FocusLevel, complexity: Complexity) -> f64 {
    match (focus, complexity) {
        (FocusLevel::High, Complexity::Simple) => 0.6,
        (FocusLevel::High, Complexity::Medium) => 0.8,
        (FocusLevel::High, Complexity::Complex) => 1.0,
        (FocusLevel::Medium, Complexity::Simple) => 0.8,
        (FocusLevel::Medium, Complexity::Medium) => 1.0,
        (FocusLevel::Medium, Complexity::Complex) => 0.7,
        (FocusLevel::Low, Complexity::Simple) => 1.0,
        (FocusLevel::Low, Complexity::Medium) => 0.6,
        (FocusLevel::Low, Complexity::Complex) => 0.3,
    }
}
