//! Repository traits for catalog storage.
//!
//! Storage is split per aggregate (teams, players, favorites, standings).
//! [`FullRepository`] bundles them so the HTTP layer can hold a single
//! `Arc<dyn FullRepository>`.
//!
//! Read operations only ever return visible rows: soft-deleted teams and
//! players behave as if they did not exist.
//!
//! # Thread Safety
//! Implementations must be `Send + Sync` to work with async Rust.

use async_trait::async_trait;

use crate::models::{
    NewPlayer, NewStanding, NewTeam, Page, PageRequest, Player, PlayerId, Standing,
    StandingQuery, Team, TeamFavorite, TeamId, UserId,
};
use crate::search::SearchQuery;

pub mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Verify the storage backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Insert a new team and return it with its assigned id.
    async fn insert_team(&self, team: NewTeam) -> RepositoryResult<Team>;

    /// Fetch a visible team.
    async fn get_team(&self, id: TeamId) -> RepositoryResult<Option<Team>>;

    /// Fetch the visible teams among `ids`, in no particular order.
    async fn get_teams(&self, ids: &[TeamId]) -> RepositoryResult<Vec<Team>>;

    /// Persist every mutable column of an existing team.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the team does not exist or is deleted
    async fn save_team(&self, team: &Team) -> RepositoryResult<()>;

    /// Soft-delete a team. Returns `false` when there was no visible team.
    async fn soft_delete_team(&self, id: TeamId) -> RepositoryResult<bool>;

    /// Visible teams, optionally restricted to one league, newest first.
    async fn list_teams(
        &self,
        liga: Option<&str>,
        page: PageRequest,
    ) -> RepositoryResult<Page<Team>>;

    /// Keyword search over team full names.
    async fn search_teams(&self, query: &SearchQuery) -> RepositoryResult<Page<Team>>;
}

#[async_trait]
pub trait PlayerRepository: Send + Sync {
    async fn insert_player(&self, player: NewPlayer) -> RepositoryResult<Player>;

    async fn get_player(&self, id: PlayerId) -> RepositoryResult<Option<Player>>;

    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the player does not exist or is deleted
    async fn save_player(&self, player: &Player) -> RepositoryResult<()>;

    async fn soft_delete_player(&self, id: PlayerId) -> RepositoryResult<bool>;

    /// Visible players, optionally restricted to one team, newest first.
    async fn list_players(
        &self,
        team_id: Option<TeamId>,
        page: PageRequest,
    ) -> RepositoryResult<Page<Player>>;

    async fn search_players(&self, query: &SearchQuery) -> RepositoryResult<Page<Player>>;
}

#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// The favorite row for a pair, whether active or not.
    async fn find_favorite(
        &self,
        user_id: UserId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<TeamFavorite>>;

    /// Insert a favorite for a pair that has no row yet.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` - If a row for the pair already exists
    async fn insert_favorite(
        &self,
        user_id: UserId,
        team_id: TeamId,
    ) -> RepositoryResult<TeamFavorite>;

    /// Persist `is_deleted` and `created_on` of an existing favorite.
    async fn save_favorite(&self, favorite: &TeamFavorite) -> RepositoryResult<()>;

    /// Active favorites of a user whose team is still visible, newest favorite first.
    async fn list_favorites(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> RepositoryResult<Page<TeamFavorite>>;
}

#[async_trait]
pub trait StandingRepository: Send + Sync {
    /// Insert a standing, or overwrite position and points of the row with
    /// the same `(team_id, liga, periode)`.
    async fn upsert_standing(&self, standing: NewStanding) -> RepositoryResult<Standing>;

    /// A league table ordered by position, restricted to visible teams.
    async fn list_standings(&self, query: &StandingQuery) -> RepositoryResult<Vec<Standing>>;
}

/// Every repository capability the application needs.
pub trait FullRepository:
    TeamRepository + PlayerRepository + FavoriteRepository + StandingRepository
{
}

impl<T> FullRepository for T where
    T: TeamRepository + PlayerRepository + FavoriteRepository + StandingRepository
{
}
