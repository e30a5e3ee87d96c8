//! Develop interdependent local npm packages together.
//!
//! A `workspace.json` maps dependency names to local directories. Installing a
//! module links (or copies) those directories into its `node_modules` and
//! leaves every other dependency to `npm`.

pub mod classify;
pub mod clean;
pub mod descriptor;
pub mod error;
pub mod install;
pub mod link_target;
pub mod package_manager;
pub mod runtime;
pub mod walker;

pub use clean::clean;
pub use error::WorkspaceError;
pub use install::{InstallOptions, InstallSession, Installer};
