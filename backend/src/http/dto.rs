//! Data Transfer Objects for the HTTP API.
//!
//! Entities are rendered with their stored image names resolved to public
//! URLs. Query parameters arrive as strings and are parsed here so that a
//! malformed number is a 400 with the usual error body.

use serde::{Deserialize, Serialize};

use super::error::AppError;
use crate::auth::Role;
use crate::db::{PlayerDetail, StandingEntry};
use crate::models::{ImageSet, ImageSlot, Page, PageRequest, Team, TeamId, UserId};
use crate::search::{CursorBounds, SortKey};
use crate::storage::{FileStorage, ImageOwner};

pub const STATUS_OK: u16 = 200;
pub const STATUS_NO_CONTENT: u16 = 204;

// =============================================================================
// Entities
// =============================================================================

/// Public URLs of the three image slots, `""` when a slot is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrls {
    pub image: String,
    pub image_icon: String,
    pub image_thumb: String,
}

impl ImageUrls {
    pub fn resolve(storage: &FileStorage, owner: ImageOwner, images: &ImageSet) -> Self {
        let url = |slot: ImageSlot| storage.url(owner.subdir(slot), images.get(slot));
        Self {
            image: url(ImageSlot::Image),
            image_icon: url(ImageSlot::Icon),
            image_thumb: url(ImageSlot::Thumb),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDto {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
    pub liga: String,
    pub stadion: String,
    pub website: String,
    pub birthday: i64,
    #[serde(flatten)]
    pub images: ImageUrls,
}

impl TeamDto {
    pub fn new(team: &Team, storage: &FileStorage) -> Self {
        Self {
            id: team.id.value(),
            shortname: team.shortname.clone(),
            fullname: team.fullname.clone(),
            liga: team.liga.clone(),
            stadion: team.stadion.clone(),
            website: team.website.clone(),
            birthday: team.birthday,
            images: ImageUrls::resolve(storage, ImageOwner::Team, &team.images),
        }
    }
}

/// Team as embedded in a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTeamDto {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
    pub liga: String,
    pub stadion: String,
    #[serde(flatten)]
    pub images: ImageUrls,
}

impl PlayerTeamDto {
    pub fn new(team: &Team, storage: &FileStorage) -> Self {
        Self {
            id: team.id.value(),
            shortname: team.shortname.clone(),
            fullname: team.fullname.clone(),
            liga: team.liga.clone(),
            stadion: team.stadion.clone(),
            images: ImageUrls::resolve(storage, ImageOwner::Team, &team.images),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDto {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
    pub backnumber: i32,
    pub height: i32,
    pub weight: i32,
    pub nation: String,
    pub team: Option<PlayerTeamDto>,
    #[serde(flatten)]
    pub images: ImageUrls,
}

impl PlayerDto {
    pub fn new(detail: &PlayerDetail, storage: &FileStorage) -> Self {
        let player = &detail.player;
        Self {
            id: player.id.value(),
            shortname: player.shortname.clone(),
            fullname: player.fullname.clone(),
            backnumber: player.backnumber,
            height: player.height,
            weight: player.weight,
            nation: player.nation.clone(),
            team: detail.team.as_ref().map(|team| PlayerTeamDto::new(team, storage)),
            images: ImageUrls::resolve(storage, ImageOwner::Player, &player.images),
        }
    }
}

/// Team as embedded in a standing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingTeamDto {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
    pub website: String,
    pub birthday: i64,
    #[serde(flatten)]
    pub images: ImageUrls,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingDto {
    pub position: i32,
    pub points: i32,
    pub periode: i32,
    pub liga: String,
    pub team: StandingTeamDto,
}

impl StandingDto {
    pub fn new(entry: &StandingEntry, storage: &FileStorage) -> Self {
        let team = &entry.team;
        Self {
            position: entry.standing.position,
            points: entry.standing.points,
            periode: entry.standing.periode,
            liga: entry.standing.liga.clone(),
            team: StandingTeamDto {
                id: team.id.value(),
                shortname: team.shortname.clone(),
                fullname: team.fullname.clone(),
                website: team.website.clone(),
                birthday: team.birthday,
                images: ImageUrls::resolve(storage, ImageOwner::Team, &team.images),
            },
        }
    }
}

// =============================================================================
// Response bodies
// =============================================================================

/// Paginated list body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub status: u16,
    pub has_next: bool,
    pub has_prev: bool,
    pub total: u64,
    pub result: Vec<T>,
}

impl<T> ListResponse<T> {
    /// List body; `status` is 204 when the page is empty.
    pub fn list(page: Page<T>) -> Self {
        let status = if page.is_empty() {
            STATUS_NO_CONTENT
        } else {
            STATUS_OK
        };
        Self::with_status(page, status)
    }

    /// Search body; `status` is always 200.
    pub fn search(page: Page<T>) -> Self {
        Self::with_status(page, STATUS_OK)
    }

    fn with_status(page: Page<T>, status: u16) -> Self {
        Self {
            status,
            has_next: page.has_next(),
            has_prev: page.has_prev(),
            total: page.total,
            result: page.items,
        }
    }
}

/// Unpaginated list body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse<T> {
    pub status: u16,
    pub result: Vec<T>,
}

impl<T> ResultResponse<T> {
    pub fn new(result: Vec<T>) -> Self {
        let status = if result.is_empty() {
            STATUS_NO_CONTENT
        } else {
            STATUS_OK
        };
        Self { status, result }
    }
}

/// Single entity body: `{"status": 200, ...entity fields}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailResponse<T> {
    pub status: u16,
    #[serde(flatten)]
    pub item: T,
}

impl<T> DetailResponse<T> {
    pub fn new(item: T) -> Self {
        Self {
            status: STATUS_OK,
            item,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub status: u16,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: u16,
    pub database: String,
    pub storage: String,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteRequest {
    #[serde(default)]
    pub team_id: Option<i64>,
}

impl FavoriteRequest {
    pub fn team_id(&self) -> Result<TeamId, AppError> {
        self.team_id
            .map(TeamId::new)
            .ok_or_else(|| AppError::bad_request("team_id must not be empty"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub user_id: UserId,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub status: u16,
    pub token: String,
    pub user_id: UserId,
    pub role: Role,
    pub scopes: Vec<String>,
    pub expires_at: i64,
}

// =============================================================================
// Query parameters
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamListQuery {
    pub league: Option<String>,
    pub page: Option<String>,
    pub count: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerListQuery {
    pub team: Option<String>,
    pub page: Option<String>,
    pub count: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub count: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
    pub sort: Option<String>,
    pub next_id: Option<String>,
    pub last_id: Option<String>,
    pub page: Option<String>,
    pub count: Option<String>,
}

impl SearchParams {
    pub fn sort_key(&self) -> Result<SortKey, AppError> {
        Ok(self.sort.as_deref().unwrap_or_default().trim().parse()?)
    }

    pub fn bounds(&self) -> Result<CursorBounds, AppError> {
        Ok(CursorBounds {
            next_id: parse_int("next_id", self.next_id.as_deref())?,
            last_id: parse_int("last_id", self.last_id.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StandingParams {
    pub liga: Option<String>,
    pub periode: Option<String>,
}

/// Parse an optional integer parameter. Absent or blank means `None`.
pub fn parse_int<T: std::str::FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::bad_request(format!("{} must be an integer", name))),
    }
}

/// Build a [`PageRequest`] from the `page` / `count` parameters.
pub fn page_request(
    page: Option<&str>,
    count: Option<&str>,
    default_per_page: u32,
    max_per_page: u32,
) -> Result<PageRequest, AppError> {
    let page = parse_int::<u32>("page", page)?.unwrap_or(1);
    let count = parse_int::<u32>("count", count)?.unwrap_or(default_per_page);
    PageRequest::new(page, count, max_per_page).map_err(AppError::BadRequest)
}
