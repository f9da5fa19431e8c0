//! `digest-core`: configuration, data model and the no-access channel memo
//! shared by every other crate in the workspace.

pub mod config;
pub mod error;
pub mod no_access;
pub mod types;

pub use config::DigestConfig;
pub use error::{DigestError, Result};
pub use no_access::{NoAccessSet, NoAccessStore};
pub use types::{Author, Channel, ChannelId, ChannelKind, ChannelMessageBatch, Message, MessageId};
