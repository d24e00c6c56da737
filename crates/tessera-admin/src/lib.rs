//! # Tessera Admin Registry
//!
//! Role hierarchy plus a closed permission set. Only the entry points that
//! bypass the vote consult this crate: admin management and direct
//! parameter edits. Staking and governance never see roles.
//!
//! ## Default Permission Floors
//!
//! | Role | view_dashboard | manage_users | execute_functions | manage_params | manage_admins |
//! |------|:-:|:-:|:-:|:-:|:-:|
//! | User | x | | | | |
//! | Admin | x | x | x | x | grantable |
//! | SuperAdmin | x | x | x | x | x |

pub mod permissions;
pub mod registry;

pub use permissions::PermissionSet;
pub use registry::{AdminRegistry, AdminUser};
