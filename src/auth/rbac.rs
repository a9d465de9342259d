/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Every user profile carries exactly one role. What a role may do is a pure
 * function of the role itself, see [`Role::permissions`].
 */

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role stored on a user profile
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "client")]
    Client,
    #[sea_orm(string_value = "guest")]
    Guest,
}

/// Capability granted by a role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    /// Browse the product list
    ViewCatalog,
    /// Search, filter and sort the product list
    SearchCatalog,
    ViewOrders,
    ManageProducts,
    ManageOrders,
    /// Staff and superuser flags on the credential
    SystemAdmin,
}

const GUEST_PERMISSIONS: &[Permission] = &[Permission::ViewCatalog];

const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::ViewCatalog,
    Permission::SearchCatalog,
    Permission::ViewOrders,
];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ViewCatalog,
    Permission::SearchCatalog,
    Permission::ViewOrders,
    Permission::ManageProducts,
    Permission::ManageOrders,
    Permission::SystemAdmin,
];

impl Role {
    /// Maps a role label from the user export. The misspelled
    /// "Авторизированный клиент" occurs in real exports and is accepted.
    /// Anything unrecognised becomes `Guest`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Администратор" => Role::Admin,
            "Менеджер" => Role::Manager,
            "Авторизованный клиент" | "Авторизированный клиент" => Role::Client,
            "Гость" => Role::Guest,
            _ => Role::Guest,
        }
    }

    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Role::Admin => ADMIN_PERMISSIONS,
            Role::Manager => MANAGER_PERMISSIONS,
            Role::Client | Role::Guest => GUEST_PERMISSIONS,
        }
    }

    pub fn has_permission(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Whether credentials holding this role get staff and superuser flags.
    pub fn has_elevated_privileges(self) -> bool {
        self.has_permission(Permission::SystemAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case("Администратор", Role::Admin)]
    #[case("Менеджер", Role::Manager)]
    #[case("Авторизованный клиент", Role::Client)]
    #[case("Авторизированный клиент", Role::Client)]
    #[case("Гость", Role::Guest)]
    #[case("Директор", Role::Guest)]
    #[case("", Role::Guest)]
    fn labels_map_to_roles(#[case] label: &str, #[case] expected: Role) {
        assert_eq!(Role::from_label(label), expected);
    }

    #[test]
    fn only_admin_is_elevated() {
        assert!(Role::Admin.has_elevated_privileges());
        assert!(!Role::Manager.has_elevated_privileges());
        assert!(!Role::Client.has_elevated_privileges());
        assert!(!Role::Guest.has_elevated_privileges());
    }

    #[test]
    fn managers_search_but_do_not_edit() {
        assert!(Role::Manager.has_permission(Permission::SearchCatalog));
        assert!(Role::Manager.has_permission(Permission::ViewOrders));
        assert!(!Role::Manager.has_permission(Permission::ManageProducts));
        assert!(!Role::Client.has_permission(Permission::SearchCatalog));
    }

    #[test]
    fn parses_cli_role_names() {
        assert_eq!(Role::from_str("manager").unwrap(), Role::Manager);
        assert_eq!(Role::from_str("ADMIN").unwrap(), Role::Admin);
        assert!(Role::from_str("owner").is_err());
    }
}
