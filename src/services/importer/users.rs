use std::path::Path;

use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, Set, SqlErr};
use tracing::{debug, info};

use super::csv_source::CsvTable;
use super::summary::ImportSummary;
use crate::auth::{user, user_profile, PasswordHasher, Role};
use crate::errors::ServiceError;

pub const ROLE: &str = "Роль сотрудника";
pub const FULL_NAME: &str = "ФИО";
pub const LOGIN: &str = "Логин";
pub const PASSWORD: &str = "Пароль";

const REQUIRED: &[&str] = &[ROLE, FULL_NAME, LOGIN, PASSWORD];

/// Imports credentials and profiles. A login that already exists aborts the
/// whole import.
pub async fn import_users<C: ConnectionTrait>(
    db: &C,
    path: &Path,
    hasher: &PasswordHasher,
    summary: &mut ImportSummary,
) -> Result<(), ServiceError> {
    let table = CsvTable::read_with_headers(path).await?;
    table.require_columns(REQUIRED)?;

    let mut count = 0u64;
    for row in table.rows() {
        let (Some(login), Some(password)) = (row.get(LOGIN), row.get(PASSWORD)) else {
            debug!(line = row.line(), "skipping user row without login or password");
            summary.skipped_users += 1;
            continue;
        };

        let role = Role::from_label(row.text(ROLE));
        let elevated = role.has_elevated_privileges();

        let credential = user::ActiveModel {
            username: Set(login.to_string()),
            email: Set(login.to_string()),
            password_hash: Set(hasher.hash(password)?),
            is_staff: Set(elevated),
            is_superuser: Set(elevated),
            imported: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| duplicate_login(e, login))?;

        user_profile::ActiveModel {
            user_id: Set(credential.id),
            role: Set(role),
            full_name: Set(row.text(FULL_NAME).to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        debug!(login, %role, "imported user");
        count += 1;
    }

    summary.users = count;
    info!("  Imported users: {}", count);

    Ok(())
}

fn duplicate_login(err: DbErr, login: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::DuplicateCredential(login.to_string())
        }
        _ => ServiceError::DatabaseError(err),
    }
}
