use uuid::Uuid;

pub mod challenge;
pub mod errors;
pub mod event;
pub mod instance;
pub mod solve;

pub use challenge::*;
pub use errors::*;
pub use event::*;
pub use instance::*;
pub use solve::*;

/// Common identifier type
pub type Id = Uuid;

/// Points type for scoring
pub type Points = i64;

/// Opaque container runtime handle
pub type ContainerRef = String;

/// Pre-authenticated request identity (session/auth layers live outside the core)
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Id,
    pub team_id: Id,
    pub is_admin: bool,
}

impl Actor {
    pub fn new(user_id: Uuid, team_id: Uuid) -> Self {
        Self {
            user_id,
            team_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: Uuid, team_id: Uuid) -> Self {
        Self {
            user_id,
            team_id,
            is_admin: true,
        }
    }
}
