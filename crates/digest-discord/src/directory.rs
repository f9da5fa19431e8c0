use std::collections::HashSet;

use tracing::{debug, warn};

use digest_core::config::FilterConfig;
use digest_core::{Channel, ChannelId, ChannelKind, NoAccessSet};

use crate::client::DiscordClient;
use crate::error::DiscordError;

/// Static exclusion rules for the channel directory.
#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
    ignored_names: HashSet<String>,
    ignored_ids: HashSet<ChannelId>,
}

impl ChannelFilter {
    pub fn new<N, I>(names: N, ids: I) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            ignored_names: names.into_iter().map(Into::into).collect(),
            ignored_ids: ids.into_iter().map(|id| ChannelId(id.into())).collect(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.ignored_names.clone(), config.ignored_ids.clone())
    }

    /// Whether a channel should be scanned: text only, not excluded by name
    /// or id, and not already known to be unreadable.
    pub fn allows(&self, channel: &Channel, no_access: &NoAccessSet) -> bool {
        channel.kind == ChannelKind::Text
            && !self.ignored_names.contains(&channel.name)
            && !self.ignored_ids.contains(&channel.id)
            && !no_access.contains(&channel.id)
    }
}

impl DiscordClient {
    /// List the guild's channels that should be scanned, in the order the API
    /// returns them.
    ///
    /// A non-success status is an error: without a directory there is nothing
    /// to do.
    pub async fn fetch_channels(
        &self,
        guild_id: &str,
        filter: &ChannelFilter,
        no_access: &NoAccessSet,
    ) -> Result<Vec<Channel>, DiscordError> {
        let resp = self
            .get(&format!("/guilds/{guild_id}/channels"))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "channel directory request failed");
            return Err(DiscordError::DirectoryFetch {
                status: status.as_u16(),
            });
        }

        let channels: Vec<Channel> = resp
            .json()
            .await
            .map_err(|e| DiscordError::Parse(e.to_string()))?;
        let total = channels.len();

        let kept: Vec<Channel> = channels
            .into_iter()
            .filter(|c| filter.allows(c, no_access))
            .collect();

        debug!(total, kept = kept.len(), "channel directory filtered");
        Ok(kept)
    }
}
