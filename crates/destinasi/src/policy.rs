//! Row-level authorization.
//!
//! A superadmin may do anything. An admin may act on the destinations they
//! are PIC of, and on the testimonials attached to those destinations.
//! Categories and user accounts are superadmin-only. Anyone, signed in or
//! not, may leave a testimonial on an existing destination.

use crate::error::{Error, Result};
use crate::models::{Destination, Role, User};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User id.
    pub id: i64,
    /// User role.
    pub role: Role,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether ownership checks are bypassed.
    #[must_use]
    pub fn is_superadmin(&self) -> bool {
        self.role.is_superadmin()
    }

    /// Whether this actor owns or may manage a record with this PIC.
    #[must_use]
    pub fn manages(&self, pic_id: i64) -> bool {
        self.is_superadmin() || self.id == pic_id
    }

    /// The PIC filter for list views: `None` means everything.
    #[must_use]
    pub fn scope(&self) -> Option<i64> {
        if self.is_superadmin() {
            None
        } else {
            Some(self.id)
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role)
    }
}

/// Require that the actor may view, edit or delete this destination.
///
/// # Errors
///
/// Returns [`Error::Forbidden`] if the actor is neither superadmin nor PIC.
pub fn authorize_destination(actor: &Actor, destination: &Destination) -> Result<()> {
    if actor.manages(destination.pic_id) {
        Ok(())
    } else {
        Err(Error::forbidden("not the PIC of this destination"))
    }
}

/// Resolve the PIC for a destination write.
///
/// A superadmin may assign any PIC; everyone else is pinned to themselves,
/// whatever the request asked for.
#[must_use]
pub fn pinned_pic(actor: &Actor, requested: Option<i64>) -> Option<i64> {
    if actor.is_superadmin() {
        requested
    } else {
        Some(actor.id)
    }
}

/// Require that the actor may view, edit or delete a testimonial whose
/// destination has the given PIC.
///
/// # Errors
///
/// Returns [`Error::Forbidden`] if the actor does not manage the destination.
pub fn authorize_testimonial(actor: &Actor, destination_pic_id: i64) -> Result<()> {
    if actor.manages(destination_pic_id) {
        Ok(())
    } else {
        Err(Error::forbidden(
            "not the PIC of this testimonial's destination",
        ))
    }
}

/// Require that the actor may move a testimonial onto a destination with the
/// given PIC. Admins cannot re-home testimonials onto destinations they do not
/// manage.
///
/// # Errors
///
/// Returns [`Error::Forbidden`] if the actor does not manage the target.
pub fn authorize_testimonial_target(actor: &Actor, target_pic_id: i64) -> Result<()> {
    if actor.manages(target_pic_id) {
        Ok(())
    } else {
        Err(Error::forbidden("not the PIC of the target destination"))
    }
}

/// Require a superadmin.
///
/// # Errors
///
/// Returns [`Error::Forbidden`] for any other role.
pub fn require_superadmin(actor: &Actor) -> Result<()> {
    if actor.is_superadmin() {
        Ok(())
    } else {
        Err(Error::forbidden("superadmin role required"))
    }
}

/// Users an actor may pick as PIC on the destination form.
#[must_use]
pub fn selectable_pics(actor: &Actor, all: Vec<User>) -> Vec<User> {
    if actor.is_superadmin() {
        all
    } else {
        all.into_iter().filter(|u| u.id == actor.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn destination(pic_id: i64) -> Destination {
        Destination {
            id: "d-1".to_string(),
            pic_id,
            name: "Danau Sentarum".to_string(),
            thumb_image: None,
            imagekit_file_id: None,
            content: String::new(),
            facility: String::new(),
            lat: 0.8,
            lon: 112.1,
            address: None,
            operating_hours: None,
            published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            avg_rating: 0.0,
            total_reviews: 0,
            categories: Vec::new(),
            pic: None,
            distance: None,
            image_url: None,
        }
    }

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            name: format!("user {id}"),
            email: format!("u{id}@example.com"),
            role,
            phone_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_admin_edits_own_destination() {
        let actor = Actor::new(7, Role::Admin);
        assert!(authorize_destination(&actor, &destination(7)).is_ok());
    }

    #[test]
    fn test_admin_editing_other_destination_is_forbidden() {
        let actor = Actor::new(7, Role::Admin);
        let err = authorize_destination(&actor, &destination(8)).unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_superadmin_edits_any_destination() {
        let actor = Actor::new(1, Role::Superadmin);
        assert!(authorize_destination(&actor, &destination(8)).is_ok());
    }

    #[test]
    fn test_pic_is_pinned_for_admin() {
        let admin = Actor::new(7, Role::Admin);
        assert_eq!(pinned_pic(&admin, Some(99)), Some(7));
        assert_eq!(pinned_pic(&admin, None), Some(7));

        let superadmin = Actor::new(1, Role::Superadmin);
        assert_eq!(pinned_pic(&superadmin, Some(99)), Some(99));
        assert_eq!(pinned_pic(&superadmin, None), None);
    }

    #[test]
    fn test_testimonial_authorization_follows_destination_owner() {
        let admin = Actor::new(7, Role::Admin);
        assert!(authorize_testimonial(&admin, 7).is_ok());
        assert!(authorize_testimonial(&admin, 8).unwrap_err().is_forbidden());
        assert!(authorize_testimonial_target(&admin, 8).is_err());
    }

    #[test]
    fn test_require_superadmin() {
        assert!(require_superadmin(&Actor::new(1, Role::Superadmin)).is_ok());
        assert!(require_superadmin(&Actor::new(2, Role::Admin)).is_err());
    }

    #[test]
    fn test_scope() {
        assert_eq!(Actor::new(1, Role::Superadmin).scope(), None);
        assert_eq!(Actor::new(2, Role::Admin).scope(), Some(2));
    }

    #[test]
    fn test_selectable_pics() {
        let users = vec![user(1, Role::Superadmin), user(2, Role::Admin)];
        let admin = Actor::new(2, Role::Admin);
        let picks = selectable_pics(&admin, users.clone());
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].id, 2);

        let superadmin = Actor::from(&users[0]);
        assert_eq!(selectable_pics(&superadmin, users).len(), 2);
    }
}
