//! Thematic date table — maps a calendar day to an optional event.

use std::path::Path;

use chrono::{Datelike, NaiveDate};

use herald_core::error::{HeraldError, Result};
use herald_core::types::{ThematicEvent, ThematicTable};

/// Read-only table of thematic events, matched by (month, day).
pub struct ThematicCalendar {
    events: Vec<ThematicEvent>,
}

impl ThematicCalendar {
    /// Load the table from a JSON file. A missing file and a malformed one
    /// are distinct errors so the caller can pick its degradation policy.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HeraldError::ConfigNotFound(path.display().to_string()));
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| HeraldError::Config(format!("Failed to read {}: {e}", path.display())))?;
        let table: ThematicTable = serde_json::from_str(&json)
            .map_err(|e| HeraldError::Config(format!("Failed to parse {}: {e}", path.display())))?;
        Ok(Self::from_table(table))
    }

    /// Build a calendar from an already-parsed table. Entries with an
    /// impossible date or an empty name are skipped with a warning.
    pub fn from_table(table: ThematicTable) -> Self {
        let mut events = Vec::with_capacity(table.thematic_dates.len());
        for event in table.thematic_dates {
            if !(1..=12).contains(&event.month)
                || !(1..=31).contains(&event.day)
                || event.name.is_empty()
            {
                tracing::warn!(
                    "Skipping invalid thematic entry: {:02}.{:02} '{}'",
                    event.day,
                    event.month,
                    event.name
                );
                continue;
            }
            events.push(event);
        }
        Self { events }
    }

    /// Calendar with no events. Used when the table file is unavailable and
    /// the caller degrades to "no event today".
    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    /// First event whose (month, day) equals the given date's.
    /// Year is ignored; events recur annually. With duplicate entries the
    /// first in table order wins.
    pub fn match_day(&self, date: NaiveDate) -> Option<&ThematicEvent> {
        self.events
            .iter()
            .find(|e| e.month == date.month() && e.day == date.day())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(month: u32, day: u32, name: &str, screenshot: &str) -> ThematicEvent {
        ThematicEvent {
            month,
            day,
            name: name.into(),
            screenshot: screenshot.into(),
        }
    }

    fn calendar(events: Vec<ThematicEvent>) -> ThematicCalendar {
        ThematicCalendar::from_table(ThematicTable {
            thematic_dates: events,
        })
    }

    #[test]
    fn test_match_on_month_and_day() {
        let cal = calendar(vec![event(10, 31, "Halloween", "h.png")]);

        let hit = cal.match_day(NaiveDate::from_ymd_opt(2026, 10, 31).unwrap());
        assert_eq!(hit.unwrap().name, "Halloween");

        let miss = cal.match_day(NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());
        assert!(miss.is_none());
    }

    #[test]
    fn test_year_is_ignored() {
        let cal = calendar(vec![event(10, 31, "Halloween", "h.png")]);
        for year in [1999, 2024, 2077] {
            let hit = cal.match_day(NaiveDate::from_ymd_opt(year, 10, 31).unwrap());
            assert_eq!(hit.unwrap().name, "Halloween");
        }
    }

    #[test]
    fn test_match_is_deterministic() {
        let cal = calendar(vec![event(6, 6, "Sixes", "6.png")]);
        let date = NaiveDate::from_ymd_opt(2026, 6, 6).unwrap();
        let first = cal.match_day(date).cloned();
        let second = cal.match_day(date).cloned();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_dates_first_wins() {
        let cal = calendar(vec![
            event(10, 31, "Halloween", "h.png"),
            event(10, 31, "Shadow Halloween", "s.png"),
        ]);
        let hit = cal.match_day(NaiveDate::from_ymd_opt(2026, 10, 31).unwrap());
        assert_eq!(hit.unwrap().name, "Halloween");
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let cal = calendar(vec![
            event(13, 1, "Bad month", "x.png"),
            event(1, 32, "Bad day", "x.png"),
            event(1, 1, "", "x.png"),
            event(1, 1, "New Year", "ny.png"),
        ]);
        assert_eq!(cal.len(), 1);
        let hit = cal.match_day(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(hit.unwrap().name, "New Year");
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir()
            .join("herald-test-calendar")
            .join("does-not-exist.json");
        assert!(matches!(
            ThematicCalendar::load(&path),
            Err(HeraldError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = std::env::temp_dir().join("herald-test-calendar");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("malformed.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ThematicCalendar::load(&path),
            Err(HeraldError::Config(_))
        ));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_well_formed_file() {
        let dir = std::env::temp_dir().join("herald-test-calendar");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("table.json");
        std::fs::write(
            &path,
            r#"{"thematic_dates":[{"month":10,"day":31,"name":"Halloween","screenshot":"h.png"}]}"#,
        )
        .unwrap();

        let cal = ThematicCalendar::load(&path).unwrap();
        assert_eq!(cal.len(), 1);

        std::fs::remove_file(&path).ok();
    }
}
