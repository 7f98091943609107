use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Store staff roles, ordered by privilege. The authorization gate is the
/// comparison `caller >= required`; there is no per-permission table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
pub enum Role {
    #[strum(serialize = "Viewer")]
    Viewer,
    #[strum(serialize = "Grocery Keeper")]
    #[serde(rename = "Grocery Keeper")]
    GroceryKeeper,
    #[strum(serialize = "Admin")]
    Admin,
}

impl Role {
    /// Whether a caller holding this role may perform an operation that
    /// requires `required`.
    pub fn allows(self, required: Role) -> bool {
        self >= required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn privilege_order_is_viewer_keeper_admin() {
        assert!(Role::Viewer < Role::GroceryKeeper);
        assert!(Role::GroceryKeeper < Role::Admin);
    }

    #[test]
    fn admin_allows_everything() {
        for required in Role::iter() {
            assert!(Role::Admin.allows(required));
        }
    }

    #[test]
    fn viewer_cannot_mutate() {
        assert!(Role::Viewer.allows(Role::Viewer));
        assert!(!Role::Viewer.allows(Role::GroceryKeeper));
        assert!(!Role::Viewer.allows(Role::Admin));
    }

    #[test]
    fn keeper_cannot_cancel() {
        assert!(Role::GroceryKeeper.allows(Role::GroceryKeeper));
        assert!(!Role::GroceryKeeper.allows(Role::Admin));
    }

    #[test]
    fn display_names_round_trip() {
        for role in Role::iter() {
            let name = role.to_string();
            assert_eq!(Role::from_str(&name).unwrap(), role);
        }
        assert_eq!(
            Role::from_str("Grocery Keeper").unwrap(),
            Role::GroceryKeeper
        );
    }
}
