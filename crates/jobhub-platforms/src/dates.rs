//! Posting-date parsing for French and English result pages.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

const ABSOLUTE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

#[derive(Debug, Clone, Copy)]
enum Unit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl Unit {
    fn from_word(word: &str) -> Option<Self> {
        if word.starts_with("min") {
            Some(Self::Minute)
        } else if word.starts_with("heure") || word.starts_with("hour") || word == "h" {
            Some(Self::Hour)
        } else if word.starts_with("jour") || word.starts_with("day") {
            Some(Self::Day)
        } else if word.starts_with("semaine") || word.starts_with("week") {
            Some(Self::Week)
        } else if word.starts_with("mois") || word.starts_with("month") {
            Some(Self::Month)
        } else {
            None
        }
    }

    fn span(self, count: i64) -> Duration {
        let count = count.clamp(0, 100_000);
        match self {
            Self::Minute => Duration::minutes(count),
            Self::Hour => Duration::hours(count),
            Self::Day => Duration::days(count),
            Self::Week => Duration::weeks(count),
            // Months are approximated as 30 days
            Self::Month => Duration::days(count * 30),
        }
    }
}

fn counted_unit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)\s*\+?\s*(minutes?|min|heures?|hours?|h\b|jours?|days?|semaines?|weeks?|mois|months?)")
            .expect("valid regex")
    })
}

fn bare_unit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(minute|heure|hour|jour|day|semaine|week|mois|month)\b")
            .expect("valid regex")
    })
}

/// Parse a posting date as shown on a results page.
///
/// Understands relative phrases ("aujourd'hui", "hier", "il y a 3 jours",
/// "2 weeks ago", "30+ days ago"), ISO timestamps and the absolute formats
/// `%d/%m/%Y`, `%d-%m-%Y` and `%Y-%m-%d`. Returns `None` when nothing
/// matches.
pub fn parse_posted_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = text.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }

    let text = raw.to_lowercase().replace('\u{2019}', "'");

    for format in ABSOLUTE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    if text.contains("just now")
        || text.contains("à l'instant")
        || text.contains("aujourd'hui")
        || text.contains("today")
    {
        return Some(now);
    }
    if text.contains("hier") || text.contains("yesterday") {
        return Some(now - Duration::days(1));
    }

    if let Some(caps) = counted_unit_regex().captures(&text) {
        let count: i64 = caps[1].parse().ok()?;
        let unit = Unit::from_word(&caps[2])?;
        return Some(now - unit.span(count));
    }

    // "il y a une semaine", "a month ago"
    if let Some(caps) = bare_unit_regex().captures(&text) {
        let unit = Unit::from_word(&caps[1])?;
        return Some(now - unit.span(1));
    }

    None
}
