//! HTTP handlers for the REST API.
//!
//! Each handler parses its request, delegates to [`crate::db::services`] and
//! shapes the result into a DTO. Errors travel as [`AppError`].

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        State,
    },
    Json,
};

use super::dto::{
    page_request, parse_int, DetailResponse, FavoriteRequest, HealthResponse, ListResponse,
    MessageResponse, PageQuery, PlayerDto, PlayerListQuery, ResultResponse, SearchParams,
    StandingDto, StandingParams, TeamDto, TeamListQuery, TokenRequest, TokenResponse, STATUS_OK,
};
use super::error::{AppError, MSG_NOT_FOUND};
use super::extract::{InternalAuth, JsonBody, PathParam, QueryParams, RequireUser};
use super::state::AppState;
use crate::db::services as db_services;
use crate::models::{
    ImageSet, ImageSlot, NewPlayer, NewStanding, NewTeam, PageRequest, PlayerId, PlayerUpdate,
    TeamId, TeamUpdate,
};
use crate::search::SearchQuery;
use crate::storage::{FileStorage, ImageOwner};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn page_of(state: &AppState, page: Option<&str>, count: Option<&str>) -> Result<PageRequest, AppError> {
    page_request(page, count, state.default_per_page(), state.max_per_page())
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Verify the repository answers and the storage directory is present.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let database = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let storage = match tokio::fs::metadata(state.storage.root()).await {
        Ok(meta) if meta.is_dir() => "available".to_string(),
        Ok(_) => "not a directory".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: STATUS_OK,
        database,
        storage,
    }))
}

/// Fallback for unknown routes and missing files.
pub async fn not_found() -> AppError {
    AppError::NotFound(MSG_NOT_FOUND.to_string())
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

// =============================================================================
// Teams
// =============================================================================

/// GET /team?league=&page=&count=
///
/// Visible teams of a league, newest first.
pub async fn list_teams(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<TeamListQuery>,
) -> HandlerResult<ListResponse<TeamDto>> {
    let page = page_of(&state, query.page.as_deref(), query.count.as_deref())?;
    let teams =
        db_services::list_teams(state.repository.as_ref(), query.league.as_deref(), page).await?;

    Ok(Json(ListResponse::list(
        teams.map(|team| TeamDto::new(&team, &state.storage)),
    )))
}

/// GET /team/{id}
pub async fn get_team(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> HandlerResult<DetailResponse<TeamDto>> {
    let team = db_services::get_team(state.repository.as_ref(), TeamId::new(id)).await?;
    Ok(Json(DetailResponse::new(TeamDto::new(&team, &state.storage))))
}

/// POST /team (internal)
pub async fn create_team(
    State(state): State<AppState>,
    _auth: InternalAuth,
    JsonBody(payload): JsonBody<NewTeam>,
) -> HandlerResult<DetailResponse<TeamDto>> {
    let team = db_services::create_team(state.repository.as_ref(), payload).await?;
    Ok(Json(DetailResponse::new(TeamDto::new(&team, &state.storage))))
}

/// PUT /team/{id} (internal)
///
/// Partial update; absent fields keep their value.
pub async fn update_team(
    State(state): State<AppState>,
    _auth: InternalAuth,
    PathParam(id): PathParam<i64>,
    JsonBody(update): JsonBody<TeamUpdate>,
) -> HandlerResult<DetailResponse<TeamDto>> {
    let team = db_services::update_team(state.repository.as_ref(), TeamId::new(id), update).await?;
    Ok(Json(DetailResponse::new(TeamDto::new(&team, &state.storage))))
}

/// DELETE /team/{id} (internal)
pub async fn delete_team(
    State(state): State<AppState>,
    _auth: InternalAuth,
    PathParam(id): PathParam<i64>,
) -> HandlerResult<MessageResponse> {
    db_services::delete_team(state.repository.as_ref(), TeamId::new(id)).await?;
    Ok(Json(MessageResponse::ok("Delete team success")))
}

/// POST /team/{id}/image (internal)
///
/// Multipart upload with any of the `image`, `image_icon` and `image_thumb`
/// parts. Slots not present in the upload keep their current file.
pub async fn upload_team_images(
    State(state): State<AppState>,
    _auth: InternalAuth,
    PathParam(id): PathParam<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> HandlerResult<DetailResponse<TeamDto>> {
    let repo = state.repository.as_ref();
    let id = TeamId::new(id);
    db_services::get_team(repo, id).await?;

    let images = store_images(&state.storage, ImageOwner::Team, multipart?).await?;
    let team = match db_services::set_team_images(repo, id, images.clone()).await {
        Ok(team) => team,
        Err(e) => {
            discard_images(&state.storage, ImageOwner::Team, &images).await;
            return Err(e.into());
        }
    };
    Ok(Json(DetailResponse::new(TeamDto::new(&team, &state.storage))))
}

// =============================================================================
// Players
// =============================================================================

/// GET /player?team=&page=&count=
///
/// Visible players of a team, newest first, each with its team embedded.
pub async fn list_players(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PlayerListQuery>,
) -> HandlerResult<ListResponse<PlayerDto>> {
    let page = page_of(&state, query.page.as_deref(), query.count.as_deref())?;
    let team = parse_int::<i64>("team", query.team.as_deref())?.map(TeamId::new);
    let players = db_services::list_players(state.repository.as_ref(), team, page).await?;

    Ok(Json(ListResponse::list(
        players.map(|detail| PlayerDto::new(&detail, &state.storage)),
    )))
}

/// GET /player/{id}
pub async fn get_player(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> HandlerResult<DetailResponse<PlayerDto>> {
    let detail = db_services::get_player(state.repository.as_ref(), PlayerId::new(id)).await?;
    Ok(Json(DetailResponse::new(PlayerDto::new(&detail, &state.storage))))
}

/// POST /player (internal)
pub async fn create_player(
    State(state): State<AppState>,
    _auth: InternalAuth,
    JsonBody(payload): JsonBody<NewPlayer>,
) -> HandlerResult<DetailResponse<PlayerDto>> {
    let detail = db_services::create_player(state.repository.as_ref(), payload).await?;
    Ok(Json(DetailResponse::new(PlayerDto::new(&detail, &state.storage))))
}

/// PUT /player/{id} (internal)
pub async fn update_player(
    State(state): State<AppState>,
    _auth: InternalAuth,
    PathParam(id): PathParam<i64>,
    JsonBody(update): JsonBody<PlayerUpdate>,
) -> HandlerResult<DetailResponse<PlayerDto>> {
    let detail =
        db_services::update_player(state.repository.as_ref(), PlayerId::new(id), update).await?;
    Ok(Json(DetailResponse::new(PlayerDto::new(&detail, &state.storage))))
}

/// DELETE /player/{id} (internal)
pub async fn delete_player(
    State(state): State<AppState>,
    _auth: InternalAuth,
    PathParam(id): PathParam<i64>,
) -> HandlerResult<MessageResponse> {
    db_services::delete_player(state.repository.as_ref(), PlayerId::new(id)).await?;
    Ok(Json(MessageResponse::ok("Delete player success")))
}

/// POST /player/{id}/image (internal)
pub async fn upload_player_images(
    State(state): State<AppState>,
    _auth: InternalAuth,
    PathParam(id): PathParam<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> HandlerResult<DetailResponse<PlayerDto>> {
    let repo = state.repository.as_ref();
    let id = PlayerId::new(id);
    db_services::get_player(repo, id).await?;

    let images = store_images(&state.storage, ImageOwner::Player, multipart?).await?;
    let detail = match db_services::set_player_images(repo, id, images.clone()).await {
        Ok(detail) => detail,
        Err(e) => {
            discard_images(&state.storage, ImageOwner::Player, &images).await;
            return Err(e.into());
        }
    };
    Ok(Json(DetailResponse::new(PlayerDto::new(&detail, &state.storage))))
}

/// Save every image part of an upload and collect the stored names.
///
/// Each slot may appear at most once. On any failure the files already
/// stored for this upload are removed again.
async fn store_images(
    storage: &FileStorage,
    owner: ImageOwner,
    mut multipart: Multipart,
) -> Result<ImageSet, AppError> {
    let mut images = ImageSet::default();

    match read_image_parts(storage, owner, &mut multipart, &mut images).await {
        Ok(0) => Err(AppError::bad_request(
            "Upload must contain an image, image_icon or image_thumb file",
        )),
        Ok(_) => Ok(images),
        Err(e) => {
            discard_images(storage, owner, &images).await;
            Err(e)
        }
    }
}

/// Store parts into `images` and return how many were stored.
async fn read_image_parts(
    storage: &FileStorage,
    owner: ImageOwner,
    multipart: &mut Multipart,
    images: &mut ImageSet,
) -> Result<usize, AppError> {
    let mut stored = 0usize;

    while let Some(field) = multipart.next_field().await? {
        let Some(slot) = field.name().and_then(ImageSlot::from_field_name) else {
            continue;
        };
        if images.get(slot).is_some() {
            return Err(AppError::BadRequest(format!(
                "Upload contains more than one {} file",
                slot.field_name()
            )));
        }
        let original = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| slot.field_name().to_string());
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            continue;
        }

        let filename = storage.save(owner.subdir(slot), &original, &bytes).await?;
        tracing::info!(subdir = owner.subdir(slot), %filename, "stored upload");
        images.set(slot, filename);
        stored += 1;
    }

    Ok(stored)
}

/// Remove the files of an upload that will not be recorded.
async fn discard_images(storage: &FileStorage, owner: ImageOwner, images: &ImageSet) {
    for slot in ImageSlot::ALL {
        let Some(filename) = images.get(slot) else {
            continue;
        };
        if let Err(e) = storage.remove(owner.subdir(slot), filename).await {
            tracing::warn!(error = %e, "could not remove discarded upload");
        }
    }
}

// =============================================================================
// Search
// =============================================================================

fn search_query(state: &AppState, params: &SearchParams) -> Result<SearchQuery, AppError> {
    let page = page_of(state, params.page.as_deref(), params.count.as_deref())?;
    Ok(SearchQuery::new(
        params.keyword.as_deref(),
        params.sort_key()?,
        params.bounds()?,
        page,
    )?)
}

/// GET /search/team?keyword=&sort=&next_id=&last_id=&page=&count=
///
/// Keyword search over team names. `sort` is one of `match` (default),
/// `id`, `-id`, `name`, `-name`.
pub async fn search_teams(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchParams>,
) -> HandlerResult<ListResponse<TeamDto>> {
    let query = search_query(&state, &params)?;
    let teams = db_services::search_teams(state.repository.as_ref(), &query).await?;

    Ok(Json(ListResponse::search(
        teams.map(|team| TeamDto::new(&team, &state.storage)),
    )))
}

/// GET /search/player
///
/// Same parameters as `/search/team`, matched against player names.
pub async fn search_players(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchParams>,
) -> HandlerResult<ListResponse<PlayerDto>> {
    let query = search_query(&state, &params)?;
    let players = db_services::search_players(state.repository.as_ref(), &query).await?;

    Ok(Json(ListResponse::search(
        players.map(|detail| PlayerDto::new(&detail, &state.storage)),
    )))
}

// =============================================================================
// Favorites
// =============================================================================

/// POST /team/favorite
pub async fn favorite_team(
    State(state): State<AppState>,
    RequireUser(claims): RequireUser,
    JsonBody(request): JsonBody<FavoriteRequest>,
) -> HandlerResult<MessageResponse> {
    let team_id = request.team_id()?;
    db_services::favorite_team(state.repository.as_ref(), claims.user_id, team_id).await?;
    Ok(Json(MessageResponse::ok("favorite team success")))
}

/// DELETE /team/favorite, POST /team/unfavorite
pub async fn unfavorite_team(
    State(state): State<AppState>,
    RequireUser(claims): RequireUser,
    JsonBody(request): JsonBody<FavoriteRequest>,
) -> HandlerResult<MessageResponse> {
    let team_id = request.team_id()?;
    db_services::unfavorite_team(state.repository.as_ref(), claims.user_id, team_id).await?;
    Ok(Json(MessageResponse::ok("Unfavorite team success")))
}

/// GET /team/favorite?page=&count=
///
/// The caller's favorite teams, most recently favorited first.
pub async fn list_favorite_teams(
    State(state): State<AppState>,
    RequireUser(claims): RequireUser,
    QueryParams(query): QueryParams<PageQuery>,
) -> HandlerResult<ListResponse<TeamDto>> {
    let page = page_of(&state, query.page.as_deref(), query.count.as_deref())?;
    let teams =
        db_services::list_favorite_teams(state.repository.as_ref(), claims.user_id, page).await?;

    Ok(Json(ListResponse::list(
        teams.map(|team| TeamDto::new(&team, &state.storage)),
    )))
}

// =============================================================================
// Standings
// =============================================================================

/// GET /standing?liga=&periode=
///
/// League table ordered by position. `periode` defaults to the current year.
pub async fn list_standings(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<StandingParams>,
) -> HandlerResult<ResultResponse<StandingDto>> {
    let periode = parse_int::<i32>("periode", params.periode.as_deref())?;
    let entries =
        db_services::list_standings(state.repository.as_ref(), params.liga.as_deref(), periode)
            .await?;

    Ok(Json(ResultResponse::new(
        entries
            .iter()
            .map(|entry| StandingDto::new(entry, &state.storage))
            .collect(),
    )))
}

/// POST /standing (internal)
///
/// Insert or replace the row for `(team_id, liga, periode)`.
pub async fn upsert_standing(
    State(state): State<AppState>,
    _auth: InternalAuth,
    JsonBody(payload): JsonBody<NewStanding>,
) -> HandlerResult<DetailResponse<StandingDto>> {
    let entry = db_services::upsert_standing(state.repository.as_ref(), payload).await?;
    Ok(Json(DetailResponse::new(StandingDto::new(&entry, &state.storage))))
}

// =============================================================================
// Tokens
// =============================================================================

/// POST /internal/token (internal)
///
/// Issue a bearer token for `user_id` with the given role.
pub async fn issue_token(
    State(state): State<AppState>,
    _auth: InternalAuth,
    JsonBody(request): JsonBody<TokenRequest>,
) -> HandlerResult<TokenResponse> {
    let (token, claims) = state.signer.issue(request.user_id, request.role);
    tracing::info!(user_id = %claims.user_id, role = %claims.role, "issued token");

    Ok(Json(TokenResponse {
        status: STATUS_OK,
        token,
        user_id: claims.user_id,
        role: claims.role,
        scopes: claims
            .role
            .scopes()
            .iter()
            .map(|scope| scope.as_str().to_string())
            .collect(),
        expires_at: claims.expires_at,
    }))
}
