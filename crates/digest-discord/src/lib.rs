//! `digest-discord`: Discord REST plumbing for the daily digest.
//!
//! - [`directory`]: list a guild's channels and apply exclusion rules
//! - [`history`]: page backwards through one channel until the day boundary
//! - [`webhook`]: split the digest into 2000-char chunks and post them

pub mod client;
pub mod directory;
pub mod error;
pub mod history;
pub mod webhook;

pub use client::DiscordClient;
pub use directory::ChannelFilter;
pub use error::DiscordError;
pub use history::{local_day_boundary, start_of_day};
pub use webhook::{split_chunks, DeliveryReport, WebhookClient};
