//! rostersync core library: domain types, identity resolution, roster
//! loading, settings, errors.
//!
//! - [`types`]: newtypes and roster records
//! - [`identity`]: name → agent id → workspace
//! - [`roster`]: roster file loading
//! - [`config`]: [`Settings`] and the derived [`RosterLayout`]
//! - [`error`]: [`RosterError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod identity;
pub mod roster;
pub mod types;

pub use config::{Attachment, RosterLayout, Settings, MARKER_DOCUMENT};
pub use error::{ConfigError, RosterError};
pub use roster::{RejectedEntry, Roster};
pub use types::{AgentId, ContainerPath, ResolvedIdentity, RosterEntry};
