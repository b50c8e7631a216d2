use serde::Deserialize;

use super::{require_non_blank, unix_now, ImageSet, TeamId};

/// A club in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub shortname: String,
    pub fullname: String,
    /// League name, e.g. "La Liga".
    pub liga: String,
    pub stadion: String,
    pub website: String,
    /// Founding date as unix seconds.
    pub birthday: i64,
    pub created_on: i64,
    pub images: ImageSet,
    pub is_deleted: bool,
}

/// Payload for creating a team.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    pub shortname: String,
    pub fullname: String,
    pub liga: String,
    /// Required in the payload, may be empty.
    pub stadion: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub birthday: i64,
}

impl NewTeam {
    pub fn validate(&self) -> Result<(), String> {
        require_non_blank("shortname", &self.shortname)?;
        require_non_blank("fullname", &self.fullname)?;
        require_non_blank("liga", &self.liga)?;
        Ok(())
    }

    /// Build the stored row once the repository has assigned an id.
    pub fn into_team(self, id: TeamId) -> Team {
        Team {
            id,
            shortname: self.shortname.trim().to_string(),
            fullname: self.fullname.trim().to_string(),
            liga: self.liga.trim().to_string(),
            stadion: self.stadion,
            website: self.website,
            birthday: self.birthday,
            created_on: unix_now(),
            images: ImageSet::default(),
            is_deleted: false,
        }
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamUpdate {
    pub shortname: Option<String>,
    pub fullname: Option<String>,
    pub liga: Option<String>,
    pub stadion: Option<String>,
    pub website: Option<String>,
    pub birthday: Option<i64>,
}

impl TeamUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref shortname) = self.shortname {
            require_non_blank("shortname", shortname)?;
        }
        if let Some(ref fullname) = self.fullname {
            require_non_blank("fullname", fullname)?;
        }
        if let Some(ref liga) = self.liga {
            require_non_blank("liga", liga)?;
        }
        Ok(())
    }

    pub fn apply(self, team: &mut Team) {
        if let Some(shortname) = self.shortname {
            team.shortname = shortname.trim().to_string();
        }
        if let Some(fullname) = self.fullname {
            team.fullname = fullname.trim().to_string();
        }
        if let Some(liga) = self.liga {
            team.liga = liga.trim().to_string();
        }
        if let Some(stadion) = self.stadion {
            team.stadion = stadion;
        }
        if let Some(website) = self.website {
            team.website = website;
        }
        if let Some(birthday) = self.birthday {
            team.birthday = birthday;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_team() -> NewTeam {
        NewTeam {
            shortname: " FCB ".into(),
            fullname: "Barcelona FC".into(),
            liga: "La Liga".into(),
            stadion: "Camp Nou".into(),
            website: String::new(),
            birthday: 0,
        }
    }

    #[test]
    fn test_new_team_defaults_from_json() {
        let payload: NewTeam = serde_json::from_str(
            r#"{"shortname":"PSS","fullname":"PSS Sleman","liga":"Liga 1","stadion":""}"#,
        )
        .unwrap();
        assert_eq!(payload.stadion, "");
        assert_eq!(payload.website, "");
        assert_eq!(payload.birthday, 0);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_new_team_without_stadion_is_rejected() {
        let result = serde_json::from_str::<NewTeam>(
            r#"{"shortname":"PSS","fullname":"PSS Sleman","liga":"Liga 1"}"#,
        );
        assert!(result.unwrap_err().to_string().contains("stadion"));
    }

    #[test]
    fn test_new_team_requires_liga() {
        let mut payload = new_team();
        payload.liga = "".into();
        assert!(payload.validate().unwrap_err().contains("liga"));
    }

    #[test]
    fn test_into_team_trims_names() {
        let team = new_team().into_team(TeamId::new(5));
        assert_eq!(team.id.value(), 5);
        assert_eq!(team.shortname, "FCB");
        assert!(!team.is_deleted);
        assert!(team.created_on > 0);
    }

    #[test]
    fn test_update_applies_only_given_fields() {
        let mut team = new_team().into_team(TeamId::new(1));
        TeamUpdate {
            stadion: Some("Estadi Olimpic".into()),
            birthday: Some(-2240524800),
            ..Default::default()
        }
        .apply(&mut team);

        assert_eq!(team.stadion, "Estadi Olimpic");
        assert_eq!(team.birthday, -2240524800);
        assert_eq!(team.fullname, "Barcelona FC");
    }

    #[test]
    fn test_update_rejects_blank_fullname() {
        let update = TeamUpdate {
            fullname: Some(" ".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
