use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Goals per side. Either may be missing before kickoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: Option<u16>,
    pub away: Option<u16>,
}

impl Score {
    pub fn new(home: u16, away: u16) -> Self {
        Self {
            home: Some(home),
            away: Some(away),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LivePhase {
    FirstHalf,
    HalfTime,
    SecondHalf,
    ExtraTime,
    Penalties,
}

impl LivePhase {
    fn from_status(status: &str) -> Option<Self> {
        match status {
            "1H" => Some(LivePhase::FirstHalf),
            "HT" => Some(LivePhase::HalfTime),
            "2H" => Some(LivePhase::SecondHalf),
            "ET" => Some(LivePhase::ExtraTime),
            "P" => Some(LivePhase::Penalties),
            _ => None,
        }
    }
}

/// What a live match shows in place of a kickoff time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "minute", rename_all = "snake_case")]
pub enum Elapsed {
    Minute(u16),
    HalfTime,
    Penalties,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Prematch {
        kickoff: DateTime<Utc>,
    },
    Live {
        phase: LivePhase,
        elapsed: Elapsed,
        score: Score,
    },
    Finished {
        score: Score,
    },
}

impl Lifecycle {
    pub fn is_live(&self) -> bool {
        matches!(self, Lifecycle::Live { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Lifecycle::Finished { .. })
    }
}

/// Classify a match from this poll's status code alone.
///
/// `1H`/`2H`/`HT`/`ET`/`P` are live, `FT` is finished, and anything else,
/// including a missing status, is prematch.
pub fn classify(
    status: Option<&str>,
    elapsed_minutes: Option<u16>,
    score: Score,
    kickoff: DateTime<Utc>,
) -> Lifecycle {
    let status = status.map(str::trim).unwrap_or_default();

    if status == "FT" {
        return Lifecycle::Finished { score };
    }

    match LivePhase::from_status(status) {
        Some(phase) => {
            let elapsed = match (phase, elapsed_minutes) {
                (LivePhase::HalfTime, _) => Elapsed::HalfTime,
                (LivePhase::Penalties, _) => Elapsed::Penalties,
                (_, Some(minute)) => Elapsed::Minute(minute),
                (_, None) => Elapsed::Unknown,
            };
            Lifecycle::Live {
                phase,
                elapsed,
                score,
            }
        }
        None => Lifecycle::Prematch { kickoff },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 18, 13, 30, 0).unwrap()
    }

    #[test]
    fn test_live_status_codes() {
        for code in ["1H", "2H", "HT", "ET", "P"] {
            let l = classify(Some(code), Some(50), Score::new(1, 0), kickoff());
            assert!(l.is_live(), "status {code}");
        }
    }

    #[test]
    fn test_finished_carries_final_score() {
        let l = classify(Some("FT"), Some(90), Score::new(2, 2), kickoff());
        assert_eq!(
            l,
            Lifecycle::Finished {
                score: Score::new(2, 2)
            }
        );
    }

    #[test]
    fn test_unknown_or_missing_status_is_prematch() {
        for status in [None, Some("NS"), Some("TBD"), Some("PST"), Some("AET"), Some("")] {
            let l = classify(status, None, Score::default(), kickoff());
            assert_eq!(l, Lifecycle::Prematch { kickoff: kickoff() }, "status {status:?}");
        }
    }

    #[test]
    fn test_elapsed_indicator() {
        let minute = classify(Some("2H"), Some(67), Score::new(1, 1), kickoff());
        assert!(matches!(
            minute,
            Lifecycle::Live {
                phase: LivePhase::SecondHalf,
                elapsed: Elapsed::Minute(67),
                ..
            }
        ));

        let ht = classify(Some("HT"), Some(45), Score::new(0, 0), kickoff());
        assert!(matches!(ht, Lifecycle::Live { elapsed: Elapsed::HalfTime, .. }));

        let pens = classify(Some("P"), Some(120), Score::new(1, 1), kickoff());
        assert!(matches!(pens, Lifecycle::Live { elapsed: Elapsed::Penalties, .. }));

        let no_clock = classify(Some("1H"), None, Score::new(0, 0), kickoff());
        assert!(matches!(no_clock, Lifecycle::Live { elapsed: Elapsed::Unknown, .. }));
    }

    #[test]
    fn test_each_poll_reclassifies_from_scratch() {
        let live = classify(Some("2H"), Some(80), Score::new(1, 0), kickoff());
        assert!(live.is_live());
        let later = classify(Some("FT"), Some(90), Score::new(1, 0), kickoff());
        assert!(later.is_finished());
        let reverted = classify(None, None, Score::default(), kickoff());
        assert!(matches!(reverted, Lifecycle::Prematch { .. }));
    }
}
