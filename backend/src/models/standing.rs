use chrono::Datelike;
use serde::Deserialize;

use super::{require_non_blank, StandingId, TeamId};

/// A team's position in a league table for one season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub id: StandingId,
    pub team_id: TeamId,
    pub liga: String,
    /// Season year.
    pub periode: i32,
    pub position: i32,
    pub points: i32,
}

/// Payload for inserting or replacing a standing row.
///
/// `(team_id, liga, periode)` identifies the row; an existing row gets its
/// `position` and `points` overwritten.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStanding {
    pub team_id: TeamId,
    pub liga: String,
    pub periode: i32,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub points: i32,
}

impl NewStanding {
    pub fn validate(&self) -> Result<(), String> {
        require_non_blank("liga", &self.liga)?;
        validate_periode(self.periode)?;
        if self.position < 0 {
            return Err("position must not be negative".to_string());
        }
        Ok(())
    }

    pub fn into_standing(self, id: StandingId) -> Standing {
        Standing {
            id,
            team_id: self.team_id,
            liga: self.liga.trim().to_string(),
            periode: self.periode,
            position: self.position,
            points: self.points,
        }
    }

    pub fn same_slot(&self, standing: &Standing) -> bool {
        standing.team_id == self.team_id
            && standing.periode == self.periode
            && standing.liga == self.liga.trim()
    }
}

/// Filter for listing a league table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingQuery {
    pub liga: String,
    pub periode: i32,
}

impl StandingQuery {
    /// Build a query, defaulting the season to the current year.
    pub fn new(liga: impl Into<String>, periode: Option<i32>) -> Self {
        Self {
            liga: liga.into().trim().to_string(),
            periode: periode.unwrap_or_else(current_season),
        }
    }
}

pub fn current_season() -> i32 {
    chrono::Utc::now().year()
}

fn validate_periode(periode: i32) -> Result<(), String> {
    if !(1800..=9999).contains(&periode) {
        return Err(format!("periode {} is not a valid season year", periode));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_to_current_season() {
        let query = StandingQuery::new(" Liga 1 ", None);
        assert_eq!(query.liga, "Liga 1");
        assert_eq!(query.periode, current_season());

        let query = StandingQuery::new("Liga 1", Some(2019));
        assert_eq!(query.periode, 2019);
    }

    #[test]
    fn test_new_standing_validation() {
        let mut payload = NewStanding {
            team_id: TeamId::new(1),
            liga: "Liga 1".into(),
            periode: 2019,
            position: 1,
            points: 68,
        };
        assert!(payload.validate().is_ok());

        payload.periode = 19;
        assert!(payload.validate().unwrap_err().contains("periode"));

        payload.periode = 2019;
        payload.position = -3;
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_same_slot_ignores_position() {
        let payload = NewStanding {
            team_id: TeamId::new(1),
            liga: "Liga 1 ".into(),
            periode: 2019,
            position: 4,
            points: 10,
        };
        let existing = payload.clone().into_standing(StandingId::new(9));
        let mut moved = payload.clone();
        moved.position = 1;
        assert!(moved.same_slot(&existing));

        moved.periode = 2020;
        assert!(!moved.same_slot(&existing));
    }
}
