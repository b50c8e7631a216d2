//! Catalog business rules on top of the repository traits.
//!
//! Every function takes `&dyn FullRepository` so the same logic runs on the
//! local and postgres backends. Validation failures and missing entities are
//! reported as [`ServiceError`] variants that the HTTP layer maps to status
//! codes.

use std::collections::HashMap;

use super::repository::{FullRepository, RepositoryError};
use crate::models::{
    ImageSet, NewPlayer, NewStanding, NewTeam, Page, PageRequest, Player, PlayerId, PlayerUpdate,
    Standing, StandingQuery, Team, TeamFavorite, TeamId, TeamUpdate, UserId,
};
use crate::search::SearchQuery;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Team not found")]
    TeamNotFound,

    #[error("Player not found")]
    PlayerNotFound,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ValidationError { message, .. } => ServiceError::BadRequest(message),
            other => ServiceError::Repository(other),
        }
    }
}

/// A player together with its (visible) team.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDetail {
    pub player: Player,
    pub team: Option<Team>,
}

/// A standing row together with its team.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingEntry {
    pub standing: Standing,
    pub team: Team,
}

pub async fn health_check(repo: &dyn FullRepository) -> ServiceResult<bool> {
    Ok(repo.health_check().await?)
}

// =========================================================
// Teams
// =========================================================

async fn visible_team(repo: &dyn FullRepository, id: TeamId) -> ServiceResult<Team> {
    repo.get_team(id).await?.ok_or(ServiceError::TeamNotFound)
}

pub async fn create_team(repo: &dyn FullRepository, team: NewTeam) -> ServiceResult<Team> {
    team.validate().map_err(ServiceError::BadRequest)?;
    let team = repo.insert_team(team).await?;
    log::info!("created team {} ({})", team.id, team.fullname);
    Ok(team)
}

pub async fn get_team(repo: &dyn FullRepository, id: TeamId) -> ServiceResult<Team> {
    visible_team(repo, id).await
}

pub async fn update_team(
    repo: &dyn FullRepository,
    id: TeamId,
    update: TeamUpdate,
) -> ServiceResult<Team> {
    update.validate().map_err(ServiceError::BadRequest)?;
    let mut team = visible_team(repo, id).await?;
    update.apply(&mut team);
    repo.save_team(&team).await.map_err(not_found_as(ServiceError::TeamNotFound))?;
    Ok(team)
}

pub async fn delete_team(repo: &dyn FullRepository, id: TeamId) -> ServiceResult<()> {
    if !repo.soft_delete_team(id).await? {
        return Err(ServiceError::TeamNotFound);
    }
    log::info!("soft-deleted team {}", id);
    Ok(())
}

/// Visible teams of a league, newest first. The league name is required.
pub async fn list_teams(
    repo: &dyn FullRepository,
    liga: Option<&str>,
    page: PageRequest,
) -> ServiceResult<Page<Team>> {
    let liga = required_text(liga, "league must not be empty")?;
    Ok(repo.list_teams(Some(liga), page).await?)
}

pub async fn search_teams(
    repo: &dyn FullRepository,
    query: &SearchQuery,
) -> ServiceResult<Page<Team>> {
    if query.is_empty() {
        return Ok(Page::no_match(query.page));
    }
    Ok(repo.search_teams(query).await?)
}

/// Record newly stored image files on a team. Slots missing from `images`
/// keep their previous value.
pub async fn set_team_images(
    repo: &dyn FullRepository,
    id: TeamId,
    images: ImageSet,
) -> ServiceResult<Team> {
    let mut team = visible_team(repo, id).await?;
    team.images.merge(images);
    repo.save_team(&team).await.map_err(not_found_as(ServiceError::TeamNotFound))?;
    Ok(team)
}

// =========================================================
// Players
// =========================================================

async fn visible_player(repo: &dyn FullRepository, id: PlayerId) -> ServiceResult<Player> {
    repo.get_player(id).await?.ok_or(ServiceError::PlayerNotFound)
}

async fn detail(repo: &dyn FullRepository, player: Player) -> ServiceResult<PlayerDetail> {
    let team = match player.team_id {
        Some(team_id) => repo.get_team(team_id).await?,
        None => None,
    };
    Ok(PlayerDetail { player, team })
}

/// Attach teams to a page of players with a single team lookup.
async fn hydrate(
    repo: &dyn FullRepository,
    players: Page<Player>,
) -> ServiceResult<Page<PlayerDetail>> {
    let mut ids: Vec<TeamId> = players.items.iter().filter_map(|p| p.team_id).collect();
    ids.sort();
    ids.dedup();

    let teams: HashMap<TeamId, Team> = repo
        .get_teams(&ids)
        .await?
        .into_iter()
        .map(|team| (team.id, team))
        .collect();

    Ok(players.map(|player| {
        let team = player.team_id.and_then(|id| teams.get(&id).cloned());
        PlayerDetail { player, team }
    }))
}

pub async fn create_player(
    repo: &dyn FullRepository,
    player: NewPlayer,
) -> ServiceResult<PlayerDetail> {
    player.validate().map_err(ServiceError::BadRequest)?;
    if let Some(team_id) = player.team_id {
        visible_team(repo, team_id).await?;
    }
    let player = repo.insert_player(player).await?;
    log::info!("created player {} ({})", player.id, player.fullname);
    detail(repo, player).await
}

pub async fn get_player(repo: &dyn FullRepository, id: PlayerId) -> ServiceResult<PlayerDetail> {
    let player = visible_player(repo, id).await?;
    detail(repo, player).await
}

pub async fn update_player(
    repo: &dyn FullRepository,
    id: PlayerId,
    update: PlayerUpdate,
) -> ServiceResult<PlayerDetail> {
    update.validate().map_err(ServiceError::BadRequest)?;
    let mut player = visible_player(repo, id).await?;
    if let Some(team_id) = update.team_id {
        visible_team(repo, team_id).await?;
    }
    update.apply(&mut player);
    repo.save_player(&player)
        .await
        .map_err(not_found_as(ServiceError::PlayerNotFound))?;
    detail(repo, player).await
}

pub async fn delete_player(repo: &dyn FullRepository, id: PlayerId) -> ServiceResult<()> {
    if !repo.soft_delete_player(id).await? {
        return Err(ServiceError::PlayerNotFound);
    }
    log::info!("soft-deleted player {}", id);
    Ok(())
}

/// Visible players of a team, newest first. The team id is required.
pub async fn list_players(
    repo: &dyn FullRepository,
    team_id: Option<TeamId>,
    page: PageRequest,
) -> ServiceResult<Page<PlayerDetail>> {
    let team_id =
        team_id.ok_or_else(|| ServiceError::BadRequest("team must not be empty".to_string()))?;
    let players = repo.list_players(Some(team_id), page).await?;
    hydrate(repo, players).await
}

pub async fn search_players(
    repo: &dyn FullRepository,
    query: &SearchQuery,
) -> ServiceResult<Page<PlayerDetail>> {
    if query.is_empty() {
        return Ok(Page::no_match(query.page));
    }
    let players = repo.search_players(query).await?;
    hydrate(repo, players).await
}

pub async fn set_player_images(
    repo: &dyn FullRepository,
    id: PlayerId,
    images: ImageSet,
) -> ServiceResult<PlayerDetail> {
    let mut player = visible_player(repo, id).await?;
    player.images.merge(images);
    repo.save_player(&player)
        .await
        .map_err(not_found_as(ServiceError::PlayerNotFound))?;
    detail(repo, player).await
}

// =========================================================
// Favorites
// =========================================================

/// Favorite a team for `user_id`.
///
/// A pair that was unfavorited before gets its existing row revived, so a
/// pair never owns more than one row.
pub async fn favorite_team(
    repo: &dyn FullRepository,
    user_id: UserId,
    team_id: TeamId,
) -> ServiceResult<TeamFavorite> {
    visible_team(repo, team_id).await?;

    match repo.find_favorite(user_id, team_id).await? {
        Some(favorite) if favorite.is_active() => Err(ServiceError::BadRequest(
            "Team is already in the favorite list".to_string(),
        )),
        Some(mut favorite) => {
            favorite.revive();
            repo.save_favorite(&favorite).await?;
            log::debug!("user {} re-favorited team {}", user_id, team_id);
            Ok(favorite)
        }
        None => match repo.insert_favorite(user_id, team_id).await {
            Ok(favorite) => Ok(favorite),
            // Lost a race against a concurrent insert for the same pair.
            Err(RepositoryError::Conflict { .. }) => Err(ServiceError::BadRequest(
                "Team is already in the favorite list".to_string(),
            )),
            Err(e) => Err(e.into()),
        },
    }
}

pub async fn unfavorite_team(
    repo: &dyn FullRepository,
    user_id: UserId,
    team_id: TeamId,
) -> ServiceResult<()> {
    match repo.find_favorite(user_id, team_id).await? {
        Some(mut favorite) if favorite.is_active() => {
            favorite.is_deleted = true;
            repo.save_favorite(&favorite).await?;
            log::debug!("user {} unfavorited team {}", user_id, team_id);
            Ok(())
        }
        _ => Err(ServiceError::BadRequest(
            "Team was never favorited".to_string(),
        )),
    }
}

/// Favorite teams of a user, newest favorite first.
pub async fn list_favorite_teams(
    repo: &dyn FullRepository,
    user_id: UserId,
    page: PageRequest,
) -> ServiceResult<Page<Team>> {
    let favorites = repo.list_favorites(user_id, page).await?;
    let ids: Vec<TeamId> = favorites.items.iter().map(|f| f.team_id).collect();
    let mut teams: HashMap<TeamId, Team> = repo
        .get_teams(&ids)
        .await?
        .into_iter()
        .map(|team| (team.id, team))
        .collect();

    let ordered: Vec<Team> = ids.iter().filter_map(|id| teams.remove(id)).collect();
    Ok(Page::new(ordered, favorites.request(), favorites.total))
}

// =========================================================
// Standings
// =========================================================

pub async fn upsert_standing(
    repo: &dyn FullRepository,
    standing: NewStanding,
) -> ServiceResult<StandingEntry> {
    standing.validate().map_err(ServiceError::BadRequest)?;
    let team = visible_team(repo, standing.team_id).await?;
    let standing = repo.upsert_standing(standing).await?;
    Ok(StandingEntry { standing, team })
}

/// League table for `liga` (required) and a season.
pub async fn list_standings(
    repo: &dyn FullRepository,
    liga: Option<&str>,
    periode: Option<i32>,
) -> ServiceResult<Vec<StandingEntry>> {
    let liga = required_text(liga, "liga must not be empty")?;
    let query = StandingQuery::new(liga, periode);
    let standings = repo.list_standings(&query).await?;

    let ids: Vec<TeamId> = standings.iter().map(|s| s.team_id).collect();
    let teams: HashMap<TeamId, Team> = repo
        .get_teams(&ids)
        .await?
        .into_iter()
        .map(|team| (team.id, team))
        .collect();

    Ok(standings
        .into_iter()
        .filter_map(|standing| {
            let team = teams.get(&standing.team_id)?.clone();
            Some(StandingEntry { standing, team })
        })
        .collect())
}

fn required_text<'a>(value: Option<&'a str>, message: &str) -> ServiceResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::BadRequest(message.to_string()))
}

/// Map a repository `NotFound` (row deleted between read and write) to a
/// domain error.
fn not_found_as(err: ServiceError) -> impl FnOnce(RepositoryError) -> ServiceError {
    move |e| {
        if e.is_not_found() {
            err
        } else {
            e.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::search::{CursorBounds, SortKey};

    fn team(fullname: &str, liga: &str) -> NewTeam {
        NewTeam {
            shortname: fullname.chars().take(3).collect(),
            fullname: fullname.into(),
            liga: liga.into(),
            stadion: String::new(),
            website: String::new(),
            birthday: 0,
        }
    }

    fn player(fullname: &str, team_id: Option<TeamId>) -> NewPlayer {
        NewPlayer {
            shortname: fullname.into(),
            fullname: fullname.into(),
            backnumber: 10,
            team_id,
            height: 170,
            weight: 65,
            nation: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_team_rejects_blank_fullname() {
        let repo = LocalRepository::new();
        let err = create_team(&repo, team("   ", "Liga 1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_deleted_team_reads_as_not_found() {
        let repo = LocalRepository::new();
        let t = create_team(&repo, team("Arema", "Liga 1")).await.unwrap();
        delete_team(&repo, t.id).await.unwrap();

        assert!(matches!(
            get_team(&repo, t.id).await,
            Err(ServiceError::TeamNotFound)
        ));
        assert!(matches!(
            delete_team(&repo, t.id).await,
            Err(ServiceError::TeamNotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_teams_requires_league() {
        let repo = LocalRepository::new();
        let err = list_teams(&repo, Some("  "), PageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_player_with_unknown_team_is_rejected() {
        let repo = LocalRepository::new();
        let err = create_player(&repo, player("Evan Dimas", Some(TeamId(42))))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TeamNotFound));
    }

    #[tokio::test]
    async fn test_player_detail_embeds_team_and_default_nation() {
        let repo = LocalRepository::new();
        let t = create_team(&repo, team("Persija Jakarta", "Liga 1")).await.unwrap();
        let created = create_player(&repo, player("Evan Dimas", Some(t.id)))
            .await
            .unwrap();
        assert_eq!(created.player.nation, "Indonesia");
        assert_eq!(created.team.as_ref().map(|t| t.id), Some(t.id));

        delete_team(&repo, t.id).await.unwrap();
        let fetched = get_player(&repo, created.player.id).await.unwrap();
        assert!(fetched.team.is_none());
    }

    #[tokio::test]
    async fn test_refavorite_revives_existing_row() {
        let repo = LocalRepository::new();
        let t = create_team(&repo, team("Arema", "Liga 1")).await.unwrap();
        let user = UserId(7);

        let first = favorite_team(&repo, user, t.id).await.unwrap();
        assert!(matches!(
            favorite_team(&repo, user, t.id).await,
            Err(ServiceError::BadRequest(_))
        ));
        unfavorite_team(&repo, user, t.id).await.unwrap();
        assert!(matches!(
            unfavorite_team(&repo, user, t.id).await,
            Err(ServiceError::BadRequest(_))
        ));

        let revived = favorite_team(&repo, user, t.id).await.unwrap();
        assert_eq!(revived.id, first.id);
        assert_eq!(repo.favorite_row_count(), 1);

        let listed = list_favorite_teams(&repo, user, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].id, t.id);
    }

    #[tokio::test]
    async fn test_favorites_hide_deleted_teams() {
        let repo = LocalRepository::new();
        let a = create_team(&repo, team("Arema", "Liga 1")).await.unwrap();
        let b = create_team(&repo, team("Bali United", "Liga 1")).await.unwrap();
        let user = UserId(1);
        favorite_team(&repo, user, a.id).await.unwrap();
        favorite_team(&repo, user, b.id).await.unwrap();
        delete_team(&repo, a.id).await.unwrap();

        let listed = list_favorite_teams(&repo, user, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].id, b.id);
    }

    #[tokio::test]
    async fn test_empty_keyword_short_circuits() {
        let repo = LocalRepository::new();
        create_team(&repo, team("Arema", "Liga 1")).await.unwrap();
        let query = SearchQuery::new(
            Some("?!"),
            SortKey::Match,
            CursorBounds::default(),
            PageRequest::default(),
        )
        .unwrap();
        let page = search_teams(&repo, &query).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(!page.has_next());
        assert!(!page.has_prev());
    }

    #[tokio::test]
    async fn test_standings_follow_position_and_skip_deleted_teams() {
        let repo = LocalRepository::new();
        let a = create_team(&repo, team("Arema", "Liga 1")).await.unwrap();
        let b = create_team(&repo, team("Bali United", "Liga 1")).await.unwrap();
        let c = create_team(&repo, team("Persib", "Liga 1")).await.unwrap();
        for (team_id, position) in [(a.id, 2), (b.id, 1), (c.id, 3)] {
            upsert_standing(
                &repo,
                NewStanding {
                    team_id,
                    liga: "Liga 1".into(),
                    periode: 2019,
                    position,
                    points: 60 - position,
                },
            )
            .await
            .unwrap();
        }
        delete_team(&repo, c.id).await.unwrap();

        let table = list_standings(&repo, Some("Liga 1"), Some(2019)).await.unwrap();
        let ids: Vec<TeamId> = table.iter().map(|e| e.team.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_standing_for_missing_team_is_rejected() {
        let repo = LocalRepository::new();
        let err = upsert_standing(
            &repo,
            NewStanding {
                team_id: TeamId(99),
                liga: "Liga 1".into(),
                periode: 2019,
                position: 1,
                points: 3,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::TeamNotFound));
    }
}
