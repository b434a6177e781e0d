//! Record-level ownership checks for mutating resource operations.

use uuid::Uuid;

use crate::auth::AuthError;
use crate::models::city::City;
use crate::models::media::Media;

/// A resource that records the identity that created it.
pub trait Owned {
    fn owner(&self) -> Uuid;

    /// Human-readable resource kind, used in error messages.
    fn kind(&self) -> &'static str;
}

impl Owned for City {
    fn owner(&self) -> Uuid {
        self.created_by
    }

    fn kind(&self) -> &'static str {
        "city"
    }
}

impl Owned for Media {
    fn owner(&self) -> Uuid {
        self.user
    }

    fn kind(&self) -> &'static str {
        "media file"
    }
}

/// Succeeds only when `requester` created `resource`.
pub fn ensure_owner<R: Owned>(resource: &R, requester: Uuid) -> Result<(), AuthError> {
    if resource.owner() == requester {
        Ok(())
    } else {
        Err(AuthError::Forbidden(format!(
            "User does not own this {}",
            resource.kind()
        )))
    }
}
