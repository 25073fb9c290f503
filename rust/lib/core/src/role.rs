//! Roles and the capability sets derived from them.
//!
//! The host page supplies a role string — either a raw key (`admin`,
//! `write`, ...) or its localized display label. Both forms normalize
//! to the same [`Role`] before permission lookup.

use serde::{Deserialize, Serialize};

/// Account role. `Unknown` keeps the raw string so it round-trips
/// through display untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    Write,
    WriteMaterial,
    WriteQuality,
    Read,
    Unknown(String),
}

impl Role {
    /// Normalize a raw role key or its localized display label.
    pub fn parse(raw: &str) -> Role {
        match raw.trim() {
            "admin" | "管理员" => Role::Admin,
            "write" | "只写用户" => Role::Write,
            "write_material" | "物料/设备录入" => Role::WriteMaterial,
            "write_quality" | "品质录入" => Role::WriteQuality,
            "read" | "只读用户" => Role::Read,
            other => Role::Unknown(other.to_string()),
        }
    }

    /// The raw key the server recognizes.
    pub fn as_key(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Write => "write",
            Role::WriteMaterial => "write_material",
            Role::WriteQuality => "write_quality",
            Role::Read => "read",
            Role::Unknown(raw) => raw,
        }
    }

    /// Localized label for table output. Unknown roles print as-is.
    pub fn display_name(&self) -> &str {
        match self {
            Role::Admin => "管理员",
            Role::Write => "只写用户",
            Role::WriteMaterial => "物料/设备录入",
            Role::WriteQuality => "品质录入",
            Role::Read => "只读用户",
            Role::Unknown(raw) => raw,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Capability flags derived from a role. Pure data — every mutating
/// operation re-checks the relevant flag before touching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    pub view_materials: bool,
    pub manage_materials: bool,
    pub view_equipment: bool,
    pub manage_equipment: bool,
    pub view_quality: bool,
    pub manage_quality: bool,
    pub manage_batch_status: bool,
    pub manage_batch_segment: bool,
    pub create_batch: bool,
    pub duplicate_batch: bool,
}

impl PermissionSet {
    /// Static role → capability table.
    ///
    /// Bulk cascading delete deliberately has no flag here: it is gated
    /// on `Role::Admin` at the call site.
    pub fn resolve(role: &Role) -> PermissionSet {
        match role {
            Role::Admin | Role::Write => PermissionSet {
                view_materials: true,
                manage_materials: true,
                view_equipment: true,
                manage_equipment: true,
                view_quality: true,
                manage_quality: true,
                manage_batch_status: true,
                manage_batch_segment: true,
                create_batch: true,
                duplicate_batch: true,
            },
            Role::WriteMaterial => PermissionSet {
                view_materials: true,
                manage_materials: true,
                view_equipment: true,
                manage_equipment: true,
                view_quality: false,
                manage_quality: false,
                manage_batch_status: true,
                manage_batch_segment: true,
                create_batch: true,
                duplicate_batch: false,
            },
            Role::WriteQuality => PermissionSet {
                view_quality: true,
                manage_quality: true,
                ..PermissionSet::default()
            },
            Role::Read => PermissionSet {
                view_materials: true,
                view_equipment: true,
                view_quality: true,
                ..PermissionSet::default()
            },
            // Read-safe default for roles this build does not know.
            Role::Unknown(_) => PermissionSet {
                view_quality: true,
                ..PermissionSet::default()
            },
        }
    }
}
