//! One digest run: directory → per-channel history → save no-access list →
//! summarize → deliver.
//!
//! Everything runs sequentially; only a failed directory fetch aborts the run.

use chrono::Local;
use tracing::{info, warn};

use digest_agent::{DigestComposer, OpenAiProvider, PromptTemplate};
use digest_core::{ChannelMessageBatch, DigestConfig, NoAccessStore};
use digest_discord::{ChannelFilter, DeliveryReport, DiscordClient, DiscordError, WebhookClient};

/// What a run did, for the final log line and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub channels_scanned: usize,
    pub messages_collected: usize,
    pub newly_blocked: usize,
    pub digest: Option<String>,
    /// `None` when nothing was posted (no digest, or dry run).
    pub delivery: Option<DeliveryReport>,
}

pub struct DigestRun {
    discord: DiscordClient,
    webhook: WebhookClient,
    composer: DigestComposer,
    store: NoAccessStore,
    filter: ChannelFilter,
    guild_id: String,
    title: String,
    dry_run: bool,
}

impl DigestRun {
    pub fn from_config(config: &DigestConfig, prompt: PromptTemplate) -> Self {
        let provider = OpenAiProvider::from_config(&config.summarizer);
        Self {
            discord: DiscordClient::from_config(&config.discord, &config.throttle),
            webhook: WebhookClient::from_config(&config.discord, &config.throttle),
            composer: DigestComposer::new(
                Box::new(provider),
                prompt,
                config.summarizer.model.clone(),
            )
            .with_max_tokens(config.summarizer.max_tokens),
            store: NoAccessStore::new(&config.state.no_access_path),
            filter: ChannelFilter::from_config(&config.filter),
            guild_id: config.discord.guild_id.clone(),
            title: config.digest.title.clone(),
            dry_run: false,
        }
    }

    /// Print the digest to stdout instead of posting it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn execute(&self) -> Result<RunSummary, DiscordError> {
        let mut summary = RunSummary::default();

        info!(path = %self.store.path().display(), "loading no-access channels");
        let mut no_access = self.store.load();
        let known_blocked = no_access.len();
        info!(count = known_blocked, "channels in no-access list");

        info!(guild_id = %self.guild_id, "fetching channels");
        let channels = self
            .discord
            .fetch_channels(&self.guild_id, &self.filter, &no_access)
            .await?;
        info!(count = channels.len(), "found text channels (excluding ignored)");

        let mut batches = Vec::with_capacity(channels.len());
        for channel in &channels {
            info!(channel = %channel.name, "fetching channel");
            let messages = self
                .discord
                .fetch_today_messages(channel, &mut no_access)
                .await;
            info!(channel = %channel.name, count = messages.len(), "messages today");
            batches.push(ChannelMessageBatch::new(channel.name.clone(), messages));
        }
        summary.channels_scanned = channels.len();
        summary.newly_blocked = no_access.len() - known_blocked;

        if let Err(e) = self.store.save(&no_access) {
            warn!(path = %self.store.path().display(), error = %e, "failed to save no-access list");
        }

        summary.messages_collected = batches.iter().map(ChannelMessageBatch::len).sum();
        info!(total = summary.messages_collected, "messages across all channels");
        if summary.messages_collected == 0 {
            info!("no messages to summarize");
            return Ok(summary);
        }

        info!("generating summary");
        let Some(digest) = self.composer.compose(&batches).await else {
            warn!("failed to generate summary");
            return Ok(summary);
        };

        let post = format!(
            "{}\n{}\n\n{}",
            self.title,
            Local::now().format("%a %b %d %Y"),
            digest
        );
        summary.digest = Some(digest);

        if self.dry_run {
            info!("dry run: printing digest instead of posting");
            println!("{post}");
        } else {
            info!("sending to webhook");
            summary.delivery = Some(self.webhook.send_chunked(&post).await);
        }

        info!("done");
        Ok(summary)
    }
}
