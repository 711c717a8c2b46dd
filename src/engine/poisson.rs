//! Independent-Poisson score model.
//!
//! Turns a pair of expected-goals values into the per-market percentages a
//! [`ProbabilityModel`] carries: 1X2, double chance, goals totals and
//! Asian handicaps for both sides.

use super::markets::{Side, GOALS_LINES};
use super::probability::{self, ProbabilityModel};

/// Goals per side covered by the grid (0..=MAX_GOALS).
const MAX_GOALS: u32 = 9;

/// Handicap ladder, in half-goal steps from -2.5 to +2.5.
fn handicap_ladder() -> impl Iterator<Item = f64> {
    (-5..=5).map(|i| i as f64 * 0.5)
}

/// Handicap line as bookmakers print it: `-1`, `0`, `+1.5`.
pub fn format_line(line: f64) -> String {
    if line == 0.0 {
        "0".to_string()
    } else if line > 0.0 {
        format!("+{}", line)
    } else {
        format!("{}", line)
    }
}

fn poisson_pmf(goals: u32, lambda: f64) -> f64 {
    let numer = lambda.powi(goals as i32) * (-lambda).exp();
    let denom = (1..=goals).fold(1.0_f64, |acc, k| acc * k as f64).max(1.0);
    numer / denom
}

/// Joint scoreline probabilities, normalised over the truncated grid.
pub struct ScoreGrid {
    cells: Vec<(u32, u32, f64)>,
}

impl ScoreGrid {
    pub fn new(xg_home: f64, xg_away: f64) -> Option<Self> {
        if !xg_home.is_finite() || !xg_away.is_finite() || xg_home < 0.0 || xg_away < 0.0 {
            return None;
        }

        let mut cells = Vec::with_capacity(((MAX_GOALS + 1) * (MAX_GOALS + 1)) as usize);
        for h in 0..=MAX_GOALS {
            for a in 0..=MAX_GOALS {
                cells.push((h, a, poisson_pmf(h, xg_home) * poisson_pmf(a, xg_away)));
            }
        }

        let total: f64 = cells.iter().map(|(_, _, p)| p).sum();
        if total <= 0.0 {
            return None;
        }
        for cell in &mut cells {
            cell.2 /= total;
        }
        Some(Self { cells })
    }

    /// Total probability of scorelines matching `pred`.
    pub fn mass(&self, pred: impl Fn(u32, u32) -> bool) -> f64 {
        self.cells
            .iter()
            .filter(|(h, a, _)| pred(*h, *a))
            .map(|(_, _, p)| p)
            .sum()
    }

    /// Push-adjusted win probability for `side` at handicap `line`.
    /// `None` when the line can only push.
    pub fn handicap(&self, side: Side, line: f64) -> Option<f64> {
        let margin = |h: u32, a: u32| {
            let d = h as f64 - a as f64;
            match side {
                Side::Home => d + line,
                Side::Away => -d + line,
            }
        };
        let win = self.mass(|h, a| margin(h, a) > 1e-9);
        let push = self.mass(|h, a| margin(h, a).abs() <= 1e-9);
        let live = 1.0 - push;
        if live <= 1e-12 {
            return None;
        }
        Some(win / live)
    }
}

fn pct(p: f64) -> f64 {
    (p * 1000.0).round() / 10.0
}

/// Build a percentage model from expected goals. `None` for invalid input.
pub fn outcome_model(xg_home: f64, xg_away: f64) -> Option<ProbabilityModel> {
    let grid = ScoreGrid::new(xg_home, xg_away)?;
    let mut model = ProbabilityModel::new();

    let home = grid.mass(|h, a| h > a);
    let draw = grid.mass(|h, a| h == a);
    let away = grid.mass(|h, a| h < a);
    model.insert(probability::HOME, pct(home));
    model.insert(probability::DRAW, pct(draw));
    model.insert(probability::AWAY, pct(away));
    model.insert(probability::HOME_OR_DRAW, pct(home + draw));
    model.insert(probability::DRAW_OR_AWAY, pct(draw + away));

    for line in GOALS_LINES {
        let over = grid.mass(|h, a| (h + a) as f64 > line);
        model.insert(probability::over_code(line), pct(over));
        model.insert(probability::under_code(line), pct(1.0 - over));
    }

    for side in [Side::Home, Side::Away] {
        for line in handicap_ladder() {
            if let Some(p) = grid.handicap(side, line) {
                model.insert(format!("{}{}", side.label(), format_line(line)), pct(p));
            }
        }
    }

    Some(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(-1.0), "-1");
        assert_eq!(format_line(0.0), "0");
        assert_eq!(format_line(1.5), "+1.5");
        assert_eq!(format_line(-2.5), "-2.5");
    }

    #[test]
    fn test_1x2_sums_to_100() {
        let m = outcome_model(1.8, 1.1).unwrap();
        let sum = m.get("1").unwrap() + m.get("X").unwrap() + m.get("2").unwrap();
        assert!((sum - 100.0).abs() <= 0.2, "sum={sum}");
        assert!(m.get("1").unwrap() > m.get("2").unwrap());
    }

    #[test]
    fn test_double_chance_is_sum_of_parts() {
        let m = outcome_model(1.4, 1.4).unwrap();
        let one_x = m.get("1").unwrap() + m.get("X").unwrap();
        assert!((m.get("1X").unwrap() - one_x).abs() <= 0.15);
    }

    #[test]
    fn test_goals_lines_are_complementary() {
        let m = outcome_model(1.6, 1.2).unwrap();
        for line in GOALS_LINES {
            let over = m.get(&probability::over_code(line)).unwrap();
            let under = m.get(&probability::under_code(line)).unwrap();
            assert!((over + under - 100.0).abs() <= 0.15, "line={line}");
        }
        assert!(m.get("Over1.5").unwrap() > m.get("Over3.5").unwrap());
    }

    #[test]
    fn test_handicap_level_line_excludes_draws() {
        // Level ball at home: the draw is refunded, so p = P(home) / (1 - P(draw)).
        let grid = ScoreGrid::new(1.5, 1.5).unwrap();
        let p = grid.handicap(Side::Home, 0.0).unwrap();
        assert!((p - 0.5).abs() < 1e-9);

        let m = outcome_model(2.0, 1.0).unwrap();
        assert!(m.get("Home0").unwrap() > m.get("1").unwrap());
        assert!(m.get("Home-1.5").unwrap() < m.get("Home-0.5").unwrap());
        // Home -0.5 is the home win.
        assert_eq!(m.get("Home-0.5"), m.get("1"));
    }

    #[test]
    fn test_invalid_expected_goals() {
        assert!(outcome_model(f64::NAN, 1.0).is_none());
        assert!(outcome_model(-0.2, 1.0).is_none());
    }

    #[test]
    fn test_poisson_pmf_zero_lambda() {
        assert_eq!(poisson_pmf(0, 0.0), 1.0);
        assert_eq!(poisson_pmf(2, 0.0), 0.0);
        assert!(outcome_model(0.0, 0.0).is_some());
    }
}
