/*!
 * # Authentication and Authorization Module
 *
 * Credentials are the `users` table written by the importer, each with one
 * `user_profiles` row carrying the role. This module verifies a login against
 * those credentials and exposes the role model used by the query services.
 */

pub mod password;
pub mod rbac;
pub mod user;
pub mod user_profile;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::errors::ServiceError;

pub use password::PasswordHasher;
pub use rbac::{Permission, Role};

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub is_superuser: bool,
}

/// Verifies logins against the imported credentials
#[derive(Clone)]
pub struct AuthService {
    db: Arc<DatabaseConnection>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            hasher: PasswordHasher::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Returns `None` for an unknown username or a wrong password.
    ///
    /// A credential without a profile (an account created outside the
    /// importer) authenticates as `Guest`, or `Admin` if it is a superuser.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthenticatedUser>, ServiceError> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .find_also_related(user_profile::Entity)
            .one(&*self.db)
            .await?;

        let Some((user, profile)) = found else {
            debug!("unknown username");
            return Ok(None);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            debug!("password mismatch");
            return Ok(None);
        }

        let (role, full_name) = match profile {
            Some(profile) => (profile.role, profile.full_name),
            None if user.is_superuser => (Role::Admin, user.username.clone()),
            None => (Role::Guest, user.username.clone()),
        };

        Ok(Some(AuthenticatedUser {
            user_id: user.id,
            username: user.username,
            full_name,
            role,
            is_superuser: user.is_superuser,
        }))
    }
}
