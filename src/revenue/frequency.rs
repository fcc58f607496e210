//! Dressing-change frequency normalisation.
//!
//! Orders carry either a numeric `frequency_per_week` or the legacy
//! free-text `frequency` column ("Daily", "2x/week", ...). Both end up as
//! a patches-per-week count of at least one.

use once_cell::sync::Lazy;
use regex::Regex;

/// Value used when the text can't be read.
pub const DEFAULT_PER_WEEK: u32 = 1;

// "2x/week", "2 x week", "3x per week"
static TIMES_PER_WEEK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*x\s*(?:/|per)?\s*week").expect("static pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencySource {
    /// Positive `frequency_per_week` column.
    Numeric,
    /// One of the recognised legacy phrases.
    Text,
    /// Nothing usable, default applied.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyReading {
    pub per_week: u32,
    pub source: FrequencySource,
}

impl FrequencyReading {
    pub fn is_default(&self) -> bool {
        self.source == FrequencySource::Default
    }
}

/// Map legacy frequency text to patches per week.
pub fn patches_per_week(text: Option<&str>) -> FrequencyReading {
    let text = text.unwrap_or("").trim().to_lowercase();

    let known = match text.as_str() {
        "daily" => Some(7),
        // 3.5 rounded up
        "every other day" => Some(4),
        "weekly" => Some(1),
        _ => TIMES_PER_WEEK
            .captures(&text)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .map(|n| n.max(1)),
    };

    match known {
        Some(per_week) => FrequencyReading {
            per_week,
            source: FrequencySource::Text,
        },
        None => FrequencyReading {
            per_week: DEFAULT_PER_WEEK,
            source: FrequencySource::Default,
        },
    }
}

/// Prefer the numeric column when it is positive, else read the text.
pub fn resolve_frequency(frequency_per_week: Option<i64>, text: Option<&str>) -> FrequencyReading {
    match frequency_per_week {
        Some(n) if n > 0 => FrequencyReading {
            per_week: u32::try_from(n).unwrap_or(u32::MAX),
            source: FrequencySource::Numeric,
        },
        _ => patches_per_week(text),
    }
}
