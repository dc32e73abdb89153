//! Startup bootstrap for well-known actors
//!
//! The booking core records the system actor on webhook-driven cancellations
//! and treats the admin actor as able to see every booking. Both must exist as
//! users before the first booking references them.

use tracing::{info, instrument};
use uuid::Uuid;

use domain_booking::SystemActors;

use crate::error::DatabaseError;
use crate::pool::DatabasePool;
use crate::repositories::user::{NewUser, UserRepository, UserRole};

/// Creates the system and admin users if they are missing
///
/// Idempotent: existing rows are left untouched, so a changed display name in
/// the database survives restarts.
#[instrument(skip(pool))]
pub async fn ensure_system_actors(
    pool: &DatabasePool,
    actors: &SystemActors,
) -> Result<(), DatabaseError> {
    let users = UserRepository::new(pool.clone());

    let created_system = users
        .insert_if_absent(&sentinel(actors.system.into(), "system", UserRole::System))
        .await?;
    let created_admin = users
        .insert_if_absent(&sentinel(actors.admin.into(), "admin", UserRole::Admin))
        .await?;

    info!(
        system_user = %actors.system,
        admin_user = %actors.admin,
        created_system,
        created_admin,
        "System actors ensured"
    );
    Ok(())
}

fn sentinel(user_id: Uuid, name: &str, role: UserRole) -> NewUser {
    NewUser {
        user_id,
        email: format!("{name}@boat-charter.internal"),
        display_name: name.to_string(),
        role,
    }
}
