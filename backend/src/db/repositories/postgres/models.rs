use diesel::prelude::*;

use super::schema::{players, standings, team_favorites, teams};
use crate::models::{
    FavoriteId, ImageSet, Player, PlayerId, Standing, StandingId, Team, TeamFavorite, TeamId,
    UserId,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = teams)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TeamRow {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
    pub liga: String,
    pub stadion: String,
    pub website: String,
    pub birthday: i64,
    pub created_on: i64,
    pub image: Option<String>,
    pub image_icon: Option<String>,
    pub image_thumb: Option<String>,
    pub is_deleted: bool,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: TeamId(row.id),
            shortname: row.shortname,
            fullname: row.fullname,
            liga: row.liga,
            stadion: row.stadion,
            website: row.website,
            birthday: row.birthday,
            created_on: row.created_on,
            images: ImageSet {
                image: row.image,
                image_icon: row.image_icon,
                image_thumb: row.image_thumb,
            },
            is_deleted: row.is_deleted,
        }
    }
}

/// Insert and full-update payload for `teams`. `treat_none_as_null` makes
/// a cleared image slot write NULL on update.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = teams)]
#[diesel(treat_none_as_null = true)]
pub struct TeamChangeset {
    pub shortname: String,
    pub fullname: String,
    pub liga: String,
    pub stadion: String,
    pub website: String,
    pub birthday: i64,
    pub created_on: i64,
    pub image: Option<String>,
    pub image_icon: Option<String>,
    pub image_thumb: Option<String>,
    pub is_deleted: bool,
}

impl From<&Team> for TeamChangeset {
    fn from(team: &Team) -> Self {
        Self {
            shortname: team.shortname.clone(),
            fullname: team.fullname.clone(),
            liga: team.liga.clone(),
            stadion: team.stadion.clone(),
            website: team.website.clone(),
            birthday: team.birthday,
            created_on: team.created_on,
            image: team.images.image.clone(),
            image_icon: team.images.image_icon.clone(),
            image_thumb: team.images.image_thumb.clone(),
            is_deleted: team.is_deleted,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = players)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlayerRow {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
    pub backnumber: i32,
    pub height: i32,
    pub weight: i32,
    pub nation: String,
    pub team_id: Option<i64>,
    pub created_on: i64,
    pub image: Option<String>,
    pub image_icon: Option<String>,
    pub image_thumb: Option<String>,
    pub is_deleted: bool,
}

impl From<PlayerRow> for Player {
    fn from(row: PlayerRow) -> Self {
        Player {
            id: PlayerId(row.id),
            shortname: row.shortname,
            fullname: row.fullname,
            backnumber: row.backnumber,
            height: row.height,
            weight: row.weight,
            nation: row.nation,
            team_id: row.team_id.map(TeamId),
            created_on: row.created_on,
            images: ImageSet {
                image: row.image,
                image_icon: row.image_icon,
                image_thumb: row.image_thumb,
            },
            is_deleted: row.is_deleted,
        }
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = players)]
#[diesel(treat_none_as_null = true)]
pub struct PlayerChangeset {
    pub shortname: String,
    pub fullname: String,
    pub backnumber: i32,
    pub height: i32,
    pub weight: i32,
    pub nation: String,
    pub team_id: Option<i64>,
    pub created_on: i64,
    pub image: Option<String>,
    pub image_icon: Option<String>,
    pub image_thumb: Option<String>,
    pub is_deleted: bool,
}

impl From<&Player> for PlayerChangeset {
    fn from(player: &Player) -> Self {
        Self {
            shortname: player.shortname.clone(),
            fullname: player.fullname.clone(),
            backnumber: player.backnumber,
            height: player.height,
            weight: player.weight,
            nation: player.nation.clone(),
            team_id: player.team_id.map(|t| t.value()),
            created_on: player.created_on,
            image: player.images.image.clone(),
            image_icon: player.images.image_icon.clone(),
            image_thumb: player.images.image_thumb.clone(),
            is_deleted: player.is_deleted,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = team_favorites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FavoriteRow {
    pub id: i64,
    pub user_id: i64,
    pub team_id: i64,
    pub is_deleted: bool,
    pub created_on: i64,
}

impl From<FavoriteRow> for TeamFavorite {
    fn from(row: FavoriteRow) -> Self {
        TeamFavorite {
            id: FavoriteId(row.id),
            user_id: UserId(row.user_id),
            team_id: TeamId(row.team_id),
            is_deleted: row.is_deleted,
            created_on: row.created_on,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = team_favorites)]
pub struct NewFavoriteRow {
    pub user_id: i64,
    pub team_id: i64,
    pub is_deleted: bool,
    pub created_on: i64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = standings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StandingRow {
    pub id: i64,
    pub team_id: i64,
    pub liga: String,
    pub periode: i32,
    pub position: i32,
    pub points: i32,
}

impl From<StandingRow> for Standing {
    fn from(row: StandingRow) -> Self {
        Standing {
            id: StandingId(row.id),
            team_id: TeamId(row.team_id),
            liga: row.liga,
            periode: row.periode,
            position: row.position,
            points: row.points,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = standings)]
pub struct NewStandingRow {
    pub team_id: i64,
    pub liga: String,
    pub periode: i32,
    pub position: i32,
    pub points: i32,
}
