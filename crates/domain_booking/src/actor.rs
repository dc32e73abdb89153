//! Who is acting on a booking

use serde::{Deserialize, Serialize};

use core_kernel::UserId;

/// An authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    /// Admins may read every booking
    pub is_admin: bool,
}

impl Actor {
    pub fn user(id: UserId) -> Self {
        Self { id, is_admin: false }
    }

    pub fn admin(id: UserId) -> Self {
        Self { id, is_admin: true }
    }
}

/// Well-known user ids created by the startup bootstrap
///
/// `system` is recorded as the actor of webhook-driven changes; `admin` is the
/// operator account that can view every booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemActors {
    pub system: UserId,
    pub admin: UserId,
}

impl SystemActors {
    pub fn new(system: UserId, admin: UserId) -> Self {
        Self { system, admin }
    }

    /// Whether `actor` has admin visibility
    pub fn is_admin(&self, actor: &Actor) -> bool {
        actor.is_admin || actor.id == self.admin
    }
}
