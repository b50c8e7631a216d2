//! In-memory repository.
//!
//! Backs the default build and every test. All state lives behind one
//! `parking_lot::RwLock`, so a mutation is atomic with respect to other
//! requests. Ids are handed out from per-table counters starting at 1.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::repository::{
    ErrorContext, FavoriteRepository, PlayerRepository, RepositoryError, RepositoryResult,
    StandingRepository, TeamRepository,
};
use crate::models::{
    FavoriteId, NewPlayer, NewStanding, NewTeam, Page, PageRequest, Player, PlayerId, Standing,
    StandingId, StandingQuery, Team, TeamFavorite, TeamId, UserId,
};
use crate::search::{self, SearchQuery};

#[derive(Debug, Default)]
struct LocalState {
    teams: BTreeMap<i64, Team>,
    players: BTreeMap<i64, Player>,
    favorites: BTreeMap<i64, TeamFavorite>,
    standings: BTreeMap<i64, Standing>,
    next_team_id: i64,
    next_player_id: i64,
    next_favorite_id: i64,
    next_standing_id: i64,
}

fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl LocalState {
    fn visible_team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id.value()).filter(|t| !t.is_deleted)
    }

    fn visible_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id.value()).filter(|p| !p.is_deleted)
    }
}

/// In-memory implementation of every repository trait.
#[derive(Debug, Default)]
pub struct LocalRepository {
    state: RwLock<LocalState>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored teams, including soft-deleted ones.
    pub fn team_count(&self) -> usize {
        self.state.read().teams.len()
    }

    /// Number of stored favorite rows, including unfavorited ones.
    pub fn favorite_row_count(&self) -> usize {
        self.state.read().favorites.len()
    }
}

#[async_trait]
impl TeamRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }

    async fn insert_team(&self, team: NewTeam) -> RepositoryResult<Team> {
        let mut state = self.state.write();
        let id = bump(&mut state.next_team_id);
        let team = team.into_team(TeamId::new(id));
        state.teams.insert(id, team.clone());
        log::debug!("local: inserted team {}", id);
        Ok(team)
    }

    async fn get_team(&self, id: TeamId) -> RepositoryResult<Option<Team>> {
        Ok(self.state.read().visible_team(id).cloned())
    }

    async fn get_teams(&self, ids: &[TeamId]) -> RepositoryResult<Vec<Team>> {
        let state = self.state.read();
        let wanted: HashSet<TeamId> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| state.visible_team(id).cloned())
            .collect())
    }

    async fn save_team(&self, team: &Team) -> RepositoryResult<()> {
        let mut state = self.state.write();
        match state.teams.get_mut(&team.id.value()) {
            Some(existing) if !existing.is_deleted => {
                *existing = team.clone();
                Ok(())
            }
            _ => Err(RepositoryError::not_found_with_context(
                "Team not found",
                ErrorContext::new("save_team")
                    .with_entity("team")
                    .with_entity_id(team.id),
            )),
        }
    }

    async fn soft_delete_team(&self, id: TeamId) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        match state.teams.get_mut(&id.value()) {
            Some(team) if !team.is_deleted => {
                team.is_deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_teams(
        &self,
        liga: Option<&str>,
        page: PageRequest,
    ) -> RepositoryResult<Page<Team>> {
        let state = self.state.read();
        let teams: Vec<Team> = state
            .teams
            .values()
            .rev()
            .filter(|t| !t.is_deleted)
            .filter(|t| liga.map_or(true, |l| t.liga == l))
            .cloned()
            .collect();
        Ok(Page::from_vec(teams, page))
    }

    async fn search_teams(&self, query: &SearchQuery) -> RepositoryResult<Page<Team>> {
        let state = self.state.read();
        Ok(search::apply(query, state.teams.values().cloned()))
    }
}

#[async_trait]
impl PlayerRepository for LocalRepository {
    async fn insert_player(&self, player: NewPlayer) -> RepositoryResult<Player> {
        let mut state = self.state.write();
        if let Some(team_id) = player.team_id {
            if state.visible_team(team_id).is_none() {
                return Err(RepositoryError::ValidationError {
                    message: format!("team {} does not exist", team_id),
                    context: ErrorContext::new("insert_player").with_entity("team"),
                });
            }
        }
        let id = bump(&mut state.next_player_id);
        let player = player.into_player(PlayerId::new(id));
        state.players.insert(id, player.clone());
        log::debug!("local: inserted player {}", id);
        Ok(player)
    }

    async fn get_player(&self, id: PlayerId) -> RepositoryResult<Option<Player>> {
        Ok(self.state.read().visible_player(id).cloned())
    }

    async fn save_player(&self, player: &Player) -> RepositoryResult<()> {
        let mut state = self.state.write();
        match state.players.get_mut(&player.id.value()) {
            Some(existing) if !existing.is_deleted => {
                *existing = player.clone();
                Ok(())
            }
            _ => Err(RepositoryError::not_found_with_context(
                "Player not found",
                ErrorContext::new("save_player")
                    .with_entity("player")
                    .with_entity_id(player.id),
            )),
        }
    }

    async fn soft_delete_player(&self, id: PlayerId) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        match state.players.get_mut(&id.value()) {
            Some(player) if !player.is_deleted => {
                player.is_deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_players(
        &self,
        team_id: Option<TeamId>,
        page: PageRequest,
    ) -> RepositoryResult<Page<Player>> {
        let state = self.state.read();
        let players: Vec<Player> = state
            .players
            .values()
            .rev()
            .filter(|p| !p.is_deleted)
            .filter(|p| team_id.map_or(true, |t| p.team_id == Some(t)))
            .cloned()
            .collect();
        Ok(Page::from_vec(players, page))
    }

    async fn search_players(&self, query: &SearchQuery) -> RepositoryResult<Page<Player>> {
        let state = self.state.read();
        Ok(search::apply(query, state.players.values().cloned()))
    }
}

#[async_trait]
impl FavoriteRepository for LocalRepository {
    async fn find_favorite(
        &self,
        user_id: UserId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<TeamFavorite>> {
        let state = self.state.read();
        Ok(state
            .favorites
            .values()
            .find(|f| f.user_id == user_id && f.team_id == team_id)
            .cloned())
    }

    async fn insert_favorite(
        &self,
        user_id: UserId,
        team_id: TeamId,
    ) -> RepositoryResult<TeamFavorite> {
        let mut state = self.state.write();
        if state
            .favorites
            .values()
            .any(|f| f.user_id == user_id && f.team_id == team_id)
        {
            return Err(RepositoryError::conflict_with_context(
                "favorite already exists",
                ErrorContext::new("insert_favorite")
                    .with_entity("favorite")
                    .with_details(format!("user_id={}, team_id={}", user_id, team_id)),
            ));
        }
        let id = bump(&mut state.next_favorite_id);
        let favorite = TeamFavorite::new(FavoriteId::new(id), user_id, team_id);
        state.favorites.insert(id, favorite.clone());
        Ok(favorite)
    }

    async fn save_favorite(&self, favorite: &TeamFavorite) -> RepositoryResult<()> {
        let mut state = self.state.write();
        let existing = state.favorites.get_mut(&favorite.id.value()).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                "Favorite not found",
                ErrorContext::new("save_favorite")
                    .with_entity("favorite")
                    .with_entity_id(favorite.id),
            )
        })?;
        existing.is_deleted = favorite.is_deleted;
        existing.created_on = favorite.created_on;
        Ok(())
    }

    async fn list_favorites(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> RepositoryResult<Page<TeamFavorite>> {
        let state = self.state.read();
        let mut favorites: Vec<TeamFavorite> = state
            .favorites
            .values()
            .filter(|f| f.user_id == user_id && f.is_active())
            .filter(|f| state.visible_team(f.team_id).is_some())
            .cloned()
            .collect();
        favorites.sort_by(|a, b| b.created_on.cmp(&a.created_on).then(b.id.cmp(&a.id)));
        Ok(Page::from_vec(favorites, page))
    }
}

#[async_trait]
impl StandingRepository for LocalRepository {
    async fn upsert_standing(&self, standing: NewStanding) -> RepositoryResult<Standing> {
        let mut state = self.state.write();
        if let Some(existing) = state
            .standings
            .values_mut()
            .find(|s| standing.same_slot(s))
        {
            existing.position = standing.position;
            existing.points = standing.points;
            return Ok(existing.clone());
        }

        let id = bump(&mut state.next_standing_id);
        let standing = standing.into_standing(StandingId::new(id));
        state.standings.insert(id, standing.clone());
        Ok(standing)
    }

    async fn list_standings(&self, query: &StandingQuery) -> RepositoryResult<Vec<Standing>> {
        let state = self.state.read();
        let mut standings: Vec<Standing> = state
            .standings
            .values()
            .filter(|s| s.liga == query.liga && s.periode == query.periode)
            .filter(|s| state.visible_team(s.team_id).is_some())
            .cloned()
            .collect();
        standings.sort_by_key(|s| (s.position, s.id));
        Ok(standings)
    }
}
