//! Role permissions using bitflags.
//!
//! Each role type grants a fixed permission set. Two families matter for person
//! visibility:
//! - Layer permissions (bits 1-2): read the people of a whole layer
//! - Group permissions (bits 3-4): read the people of one group only

use bitflags::bitflags;

bitflags! {
    /// Permissions granted by a role type.
    ///
    /// Written as `"LAYER_READ | LOGIN"` in the type table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    #[serde(transparent)]
    pub struct RolePermissions: u64 {
        /// Administer the type table and global settings
        const ADMIN          = 1 << 0;
        /// Read and write all people and groups of the role's layer
        const LAYER_FULL     = 1 << 1;
        /// Read all people of the role's layer
        const LAYER_READ     = 1 << 2;
        /// Read and write the people of the role's group
        const GROUP_FULL     = 1 << 3;
        /// Read the people of the role's group
        const GROUP_READ     = 1 << 4;
        /// List people who share their contact data
        const CONTACT_DATA   = 1 << 5;
        /// Holder may log in
        const LOGIN          = 1 << 6;
    }
}

impl RolePermissions {
    /// Any permission that implies reading a whole layer.
    pub const LAYER_READ_ANY: Self = Self::LAYER_FULL.union(Self::LAYER_READ);

    /// Any permission that implies reading one group's members.
    pub const GROUP_READ_ANY: Self = Self::GROUP_FULL.union(Self::GROUP_READ);

    /// Whether the holder may read every person of the role's layer.
    #[must_use]
    pub const fn grants_layer_read(self) -> bool {
        self.intersects(Self::LAYER_READ_ANY)
    }

    /// Whether the holder may read the members of the role's group.
    #[must_use]
    pub const fn grants_group_read(self) -> bool {
        self.intersects(Self::GROUP_READ_ANY)
    }

    /// Whether the holder may list people who share their contact data.
    #[must_use]
    pub const fn grants_contact_data(self) -> bool {
        self.contains(Self::CONTACT_DATA)
    }
}

impl Default for RolePermissions {
    fn default() -> Self {
        Self::empty()
    }
}
