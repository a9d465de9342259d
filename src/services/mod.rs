use crate::auth::{Permission, Role};
use crate::errors::ServiceError;

// Bulk CSV import
pub mod importer;

// Catalog and order management over the imported data
pub mod catalog;
pub mod orders;

/// `Forbidden` unless `role` grants `permission`; `action` completes
/// "role 'x' may not ...".
pub(crate) fn authorize(
    role: Role,
    permission: Permission,
    action: &str,
) -> Result<(), ServiceError> {
    if role.has_permission(permission) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!("role '{}' may not {}", role, action)))
    }
}
