use serde::Deserialize;

use super::{require_non_blank, unix_now, ImageSet, PlayerId, TeamId};

pub const DEFAULT_NATION: &str = "Indonesia";
pub const MAX_BACKNUMBER: i32 = 99;

/// A player, optionally attached to a team.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub shortname: String,
    pub fullname: String,
    pub backnumber: i32,
    /// Height in centimetres.
    pub height: i32,
    /// Weight in kilograms.
    pub weight: i32,
    pub nation: String,
    pub team_id: Option<TeamId>,
    pub created_on: i64,
    pub images: ImageSet,
    pub is_deleted: bool,
}

fn default_nation() -> String {
    DEFAULT_NATION.to_string()
}

/// Payload for creating a player.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlayer {
    pub shortname: String,
    pub fullname: String,
    pub backnumber: i32,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub weight: i32,
    #[serde(default = "default_nation")]
    pub nation: String,
}

fn validate_backnumber(backnumber: i32) -> Result<(), String> {
    if !(0..=MAX_BACKNUMBER).contains(&backnumber) {
        return Err(format!("backnumber must be between 0 and {}", MAX_BACKNUMBER));
    }
    Ok(())
}

fn validate_measure(field: &str, value: i32) -> Result<(), String> {
    if value < 0 {
        return Err(format!("{} must not be negative", field));
    }
    Ok(())
}

impl NewPlayer {
    pub fn validate(&self) -> Result<(), String> {
        require_non_blank("shortname", &self.shortname)?;
        require_non_blank("fullname", &self.fullname)?;
        validate_backnumber(self.backnumber)?;
        validate_measure("height", self.height)?;
        validate_measure("weight", self.weight)?;
        Ok(())
    }

    pub fn into_player(self, id: PlayerId) -> Player {
        let nation = if self.nation.trim().is_empty() {
            default_nation()
        } else {
            self.nation.trim().to_string()
        };

        Player {
            id,
            shortname: self.shortname.trim().to_string(),
            fullname: self.fullname.trim().to_string(),
            backnumber: self.backnumber,
            height: self.height,
            weight: self.weight,
            nation,
            team_id: self.team_id,
            created_on: unix_now(),
            images: ImageSet::default(),
            is_deleted: false,
        }
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerUpdate {
    pub shortname: Option<String>,
    pub fullname: Option<String>,
    pub backnumber: Option<i32>,
    pub team_id: Option<TeamId>,
    pub height: Option<i32>,
    pub weight: Option<i32>,
    pub nation: Option<String>,
}

impl PlayerUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref shortname) = self.shortname {
            require_non_blank("shortname", shortname)?;
        }
        if let Some(ref fullname) = self.fullname {
            require_non_blank("fullname", fullname)?;
        }
        if let Some(backnumber) = self.backnumber {
            validate_backnumber(backnumber)?;
        }
        if let Some(height) = self.height {
            validate_measure("height", height)?;
        }
        if let Some(weight) = self.weight {
            validate_measure("weight", weight)?;
        }
        Ok(())
    }

    pub fn apply(self, player: &mut Player) {
        if let Some(shortname) = self.shortname {
            player.shortname = shortname.trim().to_string();
        }
        if let Some(fullname) = self.fullname {
            player.fullname = fullname.trim().to_string();
        }
        if let Some(backnumber) = self.backnumber {
            player.backnumber = backnumber;
        }
        if let Some(team_id) = self.team_id {
            player.team_id = Some(team_id);
        }
        if let Some(height) = self.height {
            player.height = height;
        }
        if let Some(weight) = self.weight {
            player.weight = weight;
        }
        if let Some(nation) = self.nation {
            player.nation = nation.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_defaults() {
        let payload: NewPlayer = serde_json::from_str(
            r#"{"shortname":"Messi","fullname":"Lionel Messi","backnumber":10}"#,
        )
        .unwrap();
        assert_eq!(payload.nation, DEFAULT_NATION);
        assert_eq!(payload.height, 0);
        assert_eq!(payload.team_id, None);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_backnumber_range() {
        let mut payload: NewPlayer = serde_json::from_str(
            r#"{"shortname":"X","fullname":"Player X","backnumber":100}"#,
        )
        .unwrap();
        assert!(payload.validate().unwrap_err().contains("backnumber"));
        payload.backnumber = 99;
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let update = PlayerUpdate {
            weight: Some(-1),
            ..Default::default()
        };
        assert!(update.validate().unwrap_err().contains("weight"));
    }

    #[test]
    fn test_blank_nation_falls_back_to_default() {
        let payload = NewPlayer {
            shortname: "Egy".into(),
            fullname: "Egy Maulana".into(),
            backnumber: 7,
            team_id: Some(TeamId::new(2)),
            height: 170,
            weight: 60,
            nation: " ".into(),
        };
        let player = payload.into_player(PlayerId::new(1));
        assert_eq!(player.nation, DEFAULT_NATION);
        assert_eq!(player.team_id, Some(TeamId::new(2)));
    }

    #[test]
    fn test_update_moves_player_to_other_team() {
        let mut player = NewPlayer {
            shortname: "Evan".into(),
            fullname: "Evan Dimas".into(),
            backnumber: 6,
            team_id: Some(TeamId::new(1)),
            height: 0,
            weight: 0,
            nation: DEFAULT_NATION.into(),
        }
        .into_player(PlayerId::new(3));

        PlayerUpdate {
            team_id: Some(TeamId::new(4)),
            backnumber: Some(8),
            ..Default::default()
        }
        .apply(&mut player);

        assert_eq!(player.team_id, Some(TeamId::new(4)));
        assert_eq!(player.backnumber, 8);
        assert_eq!(player.fullname, "Evan Dimas");
    }
}
