//! Domain model for the soccer catalog.
//!
//! Entities are flat rows mirroring the storage tables. Each entity module
//! also holds the create/update payloads accepted by the service layer and
//! their validation rules.

pub mod favorite;
pub mod macros;
pub mod pagination;
pub mod player;
pub mod standing;
pub mod team;

pub use favorite::TeamFavorite;
pub use pagination::{Page, PageRequest};
pub use player::{NewPlayer, Player, PlayerUpdate};
pub use standing::{NewStanding, Standing, StandingQuery};
pub use team::{NewTeam, Team, TeamUpdate};

crate::define_id_type!(i64, TeamId);
crate::define_id_type!(i64, PlayerId);
crate::define_id_type!(i64, FavoriteId);
crate::define_id_type!(i64, StandingId);
crate::define_id_type!(i64, UserId);

/// Current time as unix seconds, used for `created_on` columns.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// The three image slots every team and player carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    Image,
    Icon,
    Thumb,
}

impl ImageSlot {
    pub const ALL: [ImageSlot; 3] = [ImageSlot::Image, ImageSlot::Icon, ImageSlot::Thumb];

    /// Multipart field name and JSON key for this slot.
    pub fn field_name(&self) -> &'static str {
        match self {
            ImageSlot::Image => "image",
            ImageSlot::Icon => "image_icon",
            ImageSlot::Thumb => "image_thumb",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.field_name() == name)
    }
}

/// Stored image file names for an entity. `None` means never uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet {
    pub image: Option<String>,
    pub image_icon: Option<String>,
    pub image_thumb: Option<String>,
}

impl ImageSet {
    pub fn get(&self, slot: ImageSlot) -> Option<&str> {
        match slot {
            ImageSlot::Image => self.image.as_deref(),
            ImageSlot::Icon => self.image_icon.as_deref(),
            ImageSlot::Thumb => self.image_thumb.as_deref(),
        }
    }

    pub fn set(&mut self, slot: ImageSlot, filename: String) {
        match slot {
            ImageSlot::Image => self.image = Some(filename),
            ImageSlot::Icon => self.image_icon = Some(filename),
            ImageSlot::Thumb => self.image_thumb = Some(filename),
        }
    }

    /// Overlay every slot that is set in `other`.
    pub fn merge(&mut self, other: ImageSet) {
        for slot in ImageSlot::ALL {
            if let Some(name) = other.get(slot) {
                self.set(slot, name.to_string());
            }
        }
    }
}

pub(crate) fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(())
    }
}
