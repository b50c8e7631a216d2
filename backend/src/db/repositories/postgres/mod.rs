//! Postgres repository implementation using Diesel.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::dsl::case_when;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::{Integer, Text};
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    ErrorContext, FavoriteRepository, PlayerRepository, RepositoryError, RepositoryResult,
    StandingRepository, TeamRepository,
};
use crate::models::{
    unix_now, NewPlayer, NewStanding, NewTeam, Page, PageRequest, Player, PlayerId, Standing,
    StandingQuery, Team, TeamFavorite, TeamId, UserId,
};
use crate::search::{SearchQuery, SortKey};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

diesel::define_sql_function!(fn lower(x: Text) -> Text);

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
    /// Retry attempts for transient failures.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds; doubles with each retry.
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from the environment variables listed in the
    /// module docs.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;
        let defaults = Self::default();

        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed catalog repository.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }
        log::info!(
            "postgres repository ready (pool max={}, min={})",
            config.max_pool_size,
            config.min_pool_size
        );

        Ok(Self { pool, config })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        if !applied.is_empty() {
            log::info!("applied {} migration(s)", applied.len());
        }
        Ok(())
    }

    /// Run `f` on a pooled connection inside `spawn_blocking`, retrying
    /// retryable failures with exponential backoff.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    log::warn!("retrying database operation (attempt {})", attempt + 1);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn page_window(page: PageRequest) -> (i64, i64) {
    (page.offset() as i64, page.limit() as i64)
}

/// Run a ranked keyword search against `teams` or `players`.
///
/// Both tables share the `id`, `fullname` and `is_deleted` columns, so one
/// expansion serves both. Rows are filtered by a case-insensitive substring
/// match and the cursor bounds, then ordered to agree with
/// [`crate::search::compare`].
macro_rules! ranked_search {
    ($conn:expr, $query:expr, $table:ident, $row:ty) => {{
        let query: &SearchQuery = $query;
        let patterns = query.like_patterns();
        let filtered = || {
            let mut q = $table::table
                .filter($table::is_deleted.eq(false))
                .filter($table::fullname.ilike(patterns.contains.clone()))
                .into_boxed();
            if let Some(next_id) = query.bounds.next_id {
                q = q.filter($table::id.lt(next_id));
            }
            if let Some(last_id) = query.bounds.last_id {
                q = q.filter($table::id.gt(last_id));
            }
            q
        };

        let total: i64 = filtered()
            .count()
            .get_result($conn)
            .map_err(map_diesel_error)?;

        let rank = case_when(
            $table::fullname.ilike(patterns.exact.clone()),
            0.into_sql::<Integer>(),
        )
        .when(
            $table::fullname.ilike(patterns.prefix.clone()),
            1.into_sql::<Integer>(),
        )
        .when(
            $table::fullname.ilike(patterns.contains.clone()),
            2.into_sql::<Integer>(),
        )
        .when(
            $table::fullname.ilike(patterns.suffix.clone()),
            3.into_sql::<Integer>(),
        )
        .otherwise(4.into_sql::<Integer>());

        let ordered = match query.sort {
            SortKey::Match => filtered().order((rank.asc(), $table::id.asc())),
            SortKey::IdAsc => filtered().order($table::id.asc()),
            SortKey::IdDesc => filtered().order($table::id.desc()),
            SortKey::NameAsc => {
                filtered().order((lower($table::fullname).asc(), $table::id.asc()))
            }
            SortKey::NameDesc => {
                filtered().order((lower($table::fullname).desc(), $table::id.desc()))
            }
        };

        let (offset, limit) = page_window(query.page);
        let rows: Vec<$row> = ordered
            .offset(offset)
            .limit(limit)
            .select(<$row>::as_select())
            .load($conn)
            .map_err(map_diesel_error)?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            query.page,
            total as u64,
        ))
    }};
}

#[async_trait]
impl TeamRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn insert_team(&self, team: NewTeam) -> RepositoryResult<Team> {
        self.with_conn(move |conn| {
            // Build through the domain type so trimming matches the local backend.
            let draft = team.into_team(TeamId(0));
            let row: TeamRow = diesel::insert_into(teams::table)
                .values(TeamChangeset::from(&draft))
                .returning(TeamRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(row.into())
        })
        .await
    }

    async fn get_team(&self, id: TeamId) -> RepositoryResult<Option<Team>> {
        self.with_conn(move |conn| {
            teams::table
                .filter(teams::id.eq(id.value()))
                .filter(teams::is_deleted.eq(false))
                .select(TeamRow::as_select())
                .first::<TeamRow>(conn)
                .optional()
                .map(|row| row.map(Team::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn get_teams(&self, ids: &[TeamId]) -> RepositoryResult<Vec<Team>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = ids.iter().map(|id| id.value()).collect();
        self.with_conn(move |conn| {
            let rows = teams::table
                .filter(teams::id.eq_any(&ids))
                .filter(teams::is_deleted.eq(false))
                .select(TeamRow::as_select())
                .load::<TeamRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Team::from).collect())
        })
        .await
    }

    async fn save_team(&self, team: &Team) -> RepositoryResult<()> {
        let id = team.id;
        let changes = TeamChangeset::from(team);
        self.with_conn(move |conn| {
            let updated = diesel::update(
                teams::table
                    .filter(teams::id.eq(id.value()))
                    .filter(teams::is_deleted.eq(false)),
            )
            .set(&changes)
            .execute(conn)
            .map_err(map_diesel_error)?;

            if updated == 0 {
                return Err(RepositoryError::not_found_with_context(
                    "Team not found",
                    ErrorContext::new("save_team")
                        .with_entity("team")
                        .with_entity_id(id),
                ));
            }
            Ok(())
        })
        .await
    }

    async fn soft_delete_team(&self, id: TeamId) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            diesel::update(
                teams::table
                    .filter(teams::id.eq(id.value()))
                    .filter(teams::is_deleted.eq(false)),
            )
            .set(teams::is_deleted.eq(true))
            .execute(conn)
            .map(|n| n > 0)
            .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_teams(
        &self,
        liga: Option<&str>,
        page: PageRequest,
    ) -> RepositoryResult<Page<Team>> {
        let liga = liga.map(str::to_string);
        self.with_conn(move |conn| {
            let filtered = || {
                let mut q = teams::table
                    .filter(teams::is_deleted.eq(false))
                    .into_boxed();
                if let Some(ref liga) = liga {
                    q = q.filter(teams::liga.eq(liga.clone()));
                }
                q
            };

            let total: i64 = filtered()
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;
            let (offset, limit) = page_window(page);
            let rows = filtered()
                .order(teams::id.desc())
                .offset(offset)
                .limit(limit)
                .select(TeamRow::as_select())
                .load::<TeamRow>(conn)
                .map_err(map_diesel_error)?;

            Ok(Page::new(
                rows.into_iter().map(Team::from).collect(),
                page,
                total as u64,
            ))
        })
        .await
    }

    async fn search_teams(&self, query: &SearchQuery) -> RepositoryResult<Page<Team>> {
        if query.is_empty() {
            return Ok(Page::no_match(query.page));
        }
        let query = query.clone();
        self.with_conn(move |conn| ranked_search!(conn, &query, teams, TeamRow))
            .await
    }
}

fn ensure_team_visible(conn: &mut PgConnection, team_id: TeamId) -> RepositoryResult<()> {
    let exists: bool = diesel::select(diesel::dsl::exists(
        teams::table
            .filter(teams::id.eq(team_id.value()))
            .filter(teams::is_deleted.eq(false)),
    ))
    .get_result(conn)
    .map_err(map_diesel_error)?;

    if exists {
        Ok(())
    } else {
        Err(RepositoryError::ValidationError {
            message: format!("team {} does not exist", team_id),
            context: ErrorContext::new("ensure_team_visible").with_entity("team"),
        })
    }
}

#[async_trait]
impl PlayerRepository for PostgresRepository {
    async fn insert_player(&self, player: NewPlayer) -> RepositoryResult<Player> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                if let Some(team_id) = player.team_id {
                    ensure_team_visible(tx, team_id)?;
                }
                let draft = player.into_player(PlayerId(0));
                let row: PlayerRow = diesel::insert_into(players::table)
                    .values(PlayerChangeset::from(&draft))
                    .returning(PlayerRow::as_returning())
                    .get_result(tx)
                    .map_err(map_diesel_error)?;
                Ok(row.into())
            })
        })
        .await
    }

    async fn get_player(&self, id: PlayerId) -> RepositoryResult<Option<Player>> {
        self.with_conn(move |conn| {
            players::table
                .filter(players::id.eq(id.value()))
                .filter(players::is_deleted.eq(false))
                .select(PlayerRow::as_select())
                .first::<PlayerRow>(conn)
                .optional()
                .map(|row| row.map(Player::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn save_player(&self, player: &Player) -> RepositoryResult<()> {
        let id = player.id;
        let changes = PlayerChangeset::from(player);
        self.with_conn(move |conn| {
            let updated = diesel::update(
                players::table
                    .filter(players::id.eq(id.value()))
                    .filter(players::is_deleted.eq(false)),
            )
            .set(&changes)
            .execute(conn)
            .map_err(map_diesel_error)?;

            if updated == 0 {
                return Err(RepositoryError::not_found_with_context(
                    "Player not found",
                    ErrorContext::new("save_player")
                        .with_entity("player")
                        .with_entity_id(id),
                ));
            }
            Ok(())
        })
        .await
    }

    async fn soft_delete_player(&self, id: PlayerId) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            diesel::update(
                players::table
                    .filter(players::id.eq(id.value()))
                    .filter(players::is_deleted.eq(false)),
            )
            .set(players::is_deleted.eq(true))
            .execute(conn)
            .map(|n| n > 0)
            .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_players(
        &self,
        team_id: Option<TeamId>,
        page: PageRequest,
    ) -> RepositoryResult<Page<Player>> {
        self.with_conn(move |conn| {
            let filtered = || {
                let mut q = players::table
                    .filter(players::is_deleted.eq(false))
                    .into_boxed();
                if let Some(team_id) = team_id {
                    q = q.filter(players::team_id.eq(team_id.value()));
                }
                q
            };

            let total: i64 = filtered()
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;
            let (offset, limit) = page_window(page);
            let rows = filtered()
                .order(players::id.desc())
                .offset(offset)
                .limit(limit)
                .select(PlayerRow::as_select())
                .load::<PlayerRow>(conn)
                .map_err(map_diesel_error)?;

            Ok(Page::new(
                rows.into_iter().map(Player::from).collect(),
                page,
                total as u64,
            ))
        })
        .await
    }

    async fn search_players(&self, query: &SearchQuery) -> RepositoryResult<Page<Player>> {
        if query.is_empty() {
            return Ok(Page::no_match(query.page));
        }
        let query = query.clone();
        self.with_conn(move |conn| ranked_search!(conn, &query, players, PlayerRow))
            .await
    }
}

#[async_trait]
impl FavoriteRepository for PostgresRepository {
    async fn find_favorite(
        &self,
        user_id: UserId,
        team_id: TeamId,
    ) -> RepositoryResult<Option<TeamFavorite>> {
        self.with_conn(move |conn| {
            team_favorites::table
                .filter(team_favorites::user_id.eq(user_id.value()))
                .filter(team_favorites::team_id.eq(team_id.value()))
                .select(FavoriteRow::as_select())
                .first::<FavoriteRow>(conn)
                .optional()
                .map(|row| row.map(TeamFavorite::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn insert_favorite(
        &self,
        user_id: UserId,
        team_id: TeamId,
    ) -> RepositoryResult<TeamFavorite> {
        self.with_conn(move |conn| {
            let row: FavoriteRow = diesel::insert_into(team_favorites::table)
                .values(NewFavoriteRow {
                    user_id: user_id.value(),
                    team_id: team_id.value(),
                    is_deleted: false,
                    created_on: unix_now(),
                })
                .returning(FavoriteRow::as_returning())
                .get_result(conn)
                .map_err(|e| {
                    map_diesel_error(e).with_operation("insert_favorite")
                })?;
            Ok(row.into())
        })
        .await
    }

    async fn save_favorite(&self, favorite: &TeamFavorite) -> RepositoryResult<()> {
        let favorite = favorite.clone();
        self.with_conn(move |conn| {
            let updated = diesel::update(team_favorites::table.find(favorite.id.value()))
                .set((
                    team_favorites::is_deleted.eq(favorite.is_deleted),
                    team_favorites::created_on.eq(favorite.created_on),
                ))
                .execute(conn)
                .map_err(map_diesel_error)?;

            if updated == 0 {
                return Err(RepositoryError::not_found_with_context(
                    "Favorite not found",
                    ErrorContext::new("save_favorite")
                        .with_entity("favorite")
                        .with_entity_id(favorite.id),
                ));
            }
            Ok(())
        })
        .await
    }

    async fn list_favorites(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> RepositoryResult<Page<TeamFavorite>> {
        self.with_conn(move |conn| {
            let filtered = || {
                team_favorites::table
                    .inner_join(teams::table)
                    .filter(team_favorites::user_id.eq(user_id.value()))
                    .filter(team_favorites::is_deleted.eq(false))
                    .filter(teams::is_deleted.eq(false))
                    .into_boxed()
            };

            let total: i64 = filtered()
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;
            let (offset, limit) = page_window(page);
            let rows = filtered()
                .order((
                    team_favorites::created_on.desc(),
                    team_favorites::id.desc(),
                ))
                .offset(offset)
                .limit(limit)
                .select(FavoriteRow::as_select())
                .load::<FavoriteRow>(conn)
                .map_err(map_diesel_error)?;

            Ok(Page::new(
                rows.into_iter().map(TeamFavorite::from).collect(),
                page,
                total as u64,
            ))
        })
        .await
    }
}

#[async_trait]
impl StandingRepository for PostgresRepository {
    async fn upsert_standing(&self, standing: NewStanding) -> RepositoryResult<Standing> {
        self.with_conn(move |conn| {
            let row: StandingRow = diesel::insert_into(standings::table)
                .values(NewStandingRow {
                    team_id: standing.team_id.value(),
                    liga: standing.liga.trim().to_string(),
                    periode: standing.periode,
                    position: standing.position,
                    points: standing.points,
                })
                .on_conflict((standings::team_id, standings::liga, standings::periode))
                .do_update()
                .set((
                    standings::position.eq(excluded(standings::position)),
                    standings::points.eq(excluded(standings::points)),
                ))
                .returning(StandingRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(row.into())
        })
        .await
    }

    async fn list_standings(&self, query: &StandingQuery) -> RepositoryResult<Vec<Standing>> {
        let query = query.clone();
        self.with_conn(move |conn| {
            let rows = standings::table
                .inner_join(teams::table)
                .filter(standings::liga.eq(&query.liga))
                .filter(standings::periode.eq(query.periode))
                .filter(teams::is_deleted.eq(false))
                .order((standings::position.asc(), standings::id.asc()))
                .select(StandingRow::as_select())
                .load::<StandingRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Standing::from).collect())
        })
        .await
    }
}
