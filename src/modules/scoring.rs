use serde::{Deserialize, Serialize};

use crate::modules::models::category::Category;

/// Points awarded by finishing position, index 0 is the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointScale(pub Vec<f64>);

impl PointScale {
    pub fn from_json(json: &str) -> serde_json::Result<PointScale> {
        serde_json::from_str::<Vec<f64>>(json).map(PointScale)
    }

    /// points for a 1-based position, 0 past the end of the scale
    pub fn points_for(&self, position: i32) -> f64 {
        if position < 1 {
            return 0.0;
        }
        self.0.get(position as usize - 1).copied().unwrap_or(0.0)
    }

    /// points shared out between the first `finishers` positions
    pub fn total_for(&self, finishers: usize) -> f64 {
        self.0.iter().take(finishers).sum()
    }
}

/// Bonus for the driver who set the fastest lap of a race.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FastestLapBonus {
    None,
    Flat(f64),
    /// `before` up to and including `split_point`, `after` past it
    Split { split_point: i32, before: f64, after: f64 },
}

impl FastestLapBonus {
    pub fn from_category(category: &Category) -> FastestLapBonus {
        match (category.fastest_lap_points, category.split_point) {
            (None, _) => FastestLapBonus::None,
            (Some(points), None) => FastestLapBonus::Flat(points),
            (Some(before), Some(split_point)) => FastestLapBonus::Split {
                split_point,
                before,
                after: category.fastest_lap_points_after_split.unwrap_or(0.0),
            },
        }
    }

    pub fn points_for(&self, position: i32) -> f64 {
        match *self {
            FastestLapBonus::None => 0.0,
            FastestLapBonus::Flat(points) => points,
            FastestLapBonus::Split {
                split_point,
                before,
                after,
            } => {
                if position <= split_point {
                    before
                } else {
                    after
                }
            }
        }
    }
}

/// How a session is scored.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionScoring {
    pub scale: PointScale,
    pub bonus: FastestLapBonus,
}

impl SessionScoring {
    pub fn race(scale: PointScale, category: &Category) -> SessionScoring {
        SessionScoring {
            scale,
            bonus: FastestLapBonus::from_category(category),
        }
    }

    pub fn qualifying(scale: PointScale) -> SessionScoring {
        SessionScoring {
            scale,
            bonus: FastestLapBonus::None,
        }
    }

    /// # points earned
    /// points for a classified position plus the fastest lap bonus. results
    /// without a position earn nothing, fastest lap included
    ///
    /// ## Arguments
    /// * `position` - the class position, None for non-finishers
    /// * `fastest_lap` - whether the driver set the fastest lap
    ///
    /// ## Returns
    /// * `f64` - the points earned
    pub fn points_earned(&self, position: Option<i32>, fastest_lap: bool) -> f64 {
        match position {
            Some(position) if position >= 1 => {
                let bonus = if fastest_lap { self.bonus.points_for(position) } else { 0.0 };
                self.scale.points_for(position) + bonus
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(fastest_lap: Option<f64>, split_point: Option<i32>, after: Option<f64>) -> Category {
        Category {
            id: 1,
            championship_id: 1,
            name: "GT3".to_string(),
            split_point,
            fastest_lap_points: fastest_lap,
            fastest_lap_points_after_split: after,
        }
    }

    #[test]
    fn point_scale_reads_json() {
        let scale = PointScale::from_json("[25, 18, 15.5]").unwrap();
        assert_eq!(scale.points_for(1), 25.0);
        assert_eq!(scale.points_for(3), 15.5);
        assert_eq!(scale.points_for(4), 0.0);
        assert_eq!(scale.points_for(0), 0.0);
        assert!(PointScale::from_json("[\"a\"]").is_err());
    }

    #[test]
    fn flat_bonus_goes_to_fastest_driver_only() {
        let scoring = SessionScoring::race(PointScale(vec![25.0, 18.0, 15.0]), &category(Some(1.0), None, None));

        assert_eq!(scoring.points_earned(Some(2), true), 19.0);
        assert_eq!(scoring.points_earned(Some(2), false), 18.0);
        assert_eq!(scoring.points_earned(None, true), 0.0);
    }

    #[test]
    fn split_bonus_depends_on_position() {
        let scoring = SessionScoring::race(
            PointScale(vec![25.0, 18.0, 15.0, 12.0]),
            &category(Some(2.0), Some(2), Some(1.0)),
        );

        assert_eq!(scoring.points_earned(Some(2), true), 20.0);
        assert_eq!(scoring.points_earned(Some(3), true), 16.0);
    }

    #[test]
    fn qualifying_never_carries_a_bonus() {
        let scoring = SessionScoring::qualifying(PointScale(vec![3.0, 2.0, 1.0]));
        assert_eq!(scoring.points_earned(Some(1), true), 3.0);
    }

    #[test]
    fn session_total_is_scale_plus_bonus() {
        let scale = PointScale(vec![25.0, 18.0, 15.0, 12.0, 10.0]);
        let scoring = SessionScoring::race(scale.clone(), &category(Some(1.0), None, None));

        let finishers = 4;
        let total: f64 = (1..=finishers)
            .map(|position| scoring.points_earned(Some(position), position == 3))
            .chain(std::iter::once(scoring.points_earned(None, false)))
            .sum();

        assert_eq!(total, scale.total_for(finishers as usize) + 1.0);
    }
}
