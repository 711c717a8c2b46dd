use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group<T> {
    pub label: String,
    pub items: Vec<T>,
}

/// Stable grouping: labels appear in order of first occurrence and items
/// keep their input order within a label.
pub fn group_by<T, F>(items: impl IntoIterator<Item = T>, mut label_of: F) -> Vec<Group<T>>
where
    F: FnMut(&T) -> String,
{
    let mut groups: Vec<Group<T>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let label = label_of(&item);
        match index.get(&label) {
            Some(&i) => groups[i].items.push(item),
            None => {
                index.insert(label.clone(), groups.len());
                groups.push(Group {
                    label,
                    items: vec![item],
                });
            }
        }
    }
    groups
}

/// Calendar-date bucket: `"Today"`, `"Tomorrow"`, or e.g. `"Saturday, October 18"`.
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if Some(date) == today.checked_add_days(Days::new(1)) {
        "Tomorrow".to_string()
    } else {
        date.format("%A, %B %-d").to_string()
    }
}

/// Bucket a kickoff against `now`, both read as calendar dates in `offset`.
pub fn date_bucket(kickoff: DateTime<Utc>, now: DateTime<Utc>, offset: FixedOffset) -> String {
    day_label(
        kickoff.with_timezone(&offset).date_naive(),
        now.with_timezone(&offset).date_naive(),
    )
}

/// Composite league + round label, e.g. `"Bundesliga / Regular Season - 7"`.
pub fn league_round_label(league: &str, round: &str) -> String {
    let round = round.trim();
    if round.is_empty() {
        league.to_string()
    } else {
        format!("{} / {}", league, round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_group_order_follows_first_appearance() {
        let input = vec![("b", 1), ("a", 2), ("b", 3), ("c", 4), ("a", 5)];
        let groups = group_by(input.clone(), |(l, _)| l.to_string());
        let labels: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a", "c"]);
        let b: Vec<_> = groups[0].items.iter().map(|(_, n)| *n).collect();
        assert_eq!(b, vec![1, 3]);

        // Deterministic across runs.
        assert_eq!(groups, group_by(input, |(l, _)| l.to_string()));
    }

    #[test]
    fn test_group_empty_input() {
        let groups: Vec<Group<u8>> = group_by(Vec::new(), |_| String::new());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_calendar_date_not_proximity() {
        let utc0 = FixedOffset::east_opt(0).unwrap();
        let now = utc(2024, 5, 1, 0, 1);
        assert_eq!(date_bucket(utc(2024, 5, 1, 23, 59), now, utc0), "Today");
        assert_eq!(date_bucket(utc(2024, 5, 2, 0, 1), now, utc0), "Tomorrow");
        assert_eq!(date_bucket(utc(2024, 5, 3, 0, 1), now, utc0), "Friday, May 3");
        assert_eq!(date_bucket(utc(2024, 4, 30, 23, 0), now, utc0), "Tuesday, April 30");
    }

    #[test]
    fn test_bucket_uses_local_calendar() {
        // 22:30 UTC on May 1 is already May 2 at UTC+2.
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = utc(2024, 5, 1, 12, 0);
        assert_eq!(date_bucket(utc(2024, 5, 1, 22, 30), now, cest), "Tomorrow");
    }

    #[test]
    fn test_league_round_label() {
        assert_eq!(
            league_round_label("Bundesliga", "Regular Season - 7"),
            "Bundesliga / Regular Season - 7"
        );
        assert_eq!(league_round_label("Bundesliga", "  "), "Bundesliga");
    }
}
