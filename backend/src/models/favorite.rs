use super::{unix_now, FavoriteId, TeamId, UserId};

/// A user's favorite team. One row per `(user_id, team_id)` pair;
/// unfavoriting flips `is_deleted` instead of removing the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamFavorite {
    pub id: FavoriteId,
    pub user_id: UserId,
    pub team_id: TeamId,
    pub is_deleted: bool,
    pub created_on: i64,
}

impl TeamFavorite {
    pub fn new(id: FavoriteId, user_id: UserId, team_id: TeamId) -> Self {
        Self {
            id,
            user_id,
            team_id,
            is_deleted: false,
            created_on: unix_now(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Bring an unfavorited row back.
    pub fn revive(&mut self) {
        self.is_deleted = false;
        self.created_on = unix_now();
    }
}
