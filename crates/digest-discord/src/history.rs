//! Day-window message fetch: pages backwards through a channel's history and
//! stops at the first message older than the day boundary.
//!
//! The early exit depends on the API returning each page newest-first. An
//! out-of-order page is reported with a warning but handled the same way.

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Timelike, Utc};
use reqwest::StatusCode;
use tracing::{debug, warn};

use digest_core::{Channel, ChannelId, Message, MessageId, NoAccessSet};

use crate::client::DiscordClient;
use crate::error::DiscordError;

/// Maximum page size accepted by the history endpoint.
pub const PAGE_SIZE: u32 = 100;

/// Start of the calendar day containing `now`, in `now`'s time zone.
///
/// When local midnight does not exist (a DST gap), falls back to `now` minus
/// the seconds elapsed on the local clock since midnight.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(start) => start.with_timezone(&Utc),
        None => {
            now.with_timezone(&Utc) - Duration::seconds(i64::from(now.num_seconds_from_midnight()))
        }
    }
}

/// Local midnight of the current day.
pub fn local_day_boundary() -> DateTime<Utc> {
    start_of_day(&Local::now())
}

impl DiscordClient {
    /// All messages posted in `channel` since local midnight, newest-first.
    pub async fn fetch_today_messages(
        &self,
        channel: &Channel,
        no_access: &mut NoAccessSet,
    ) -> Vec<Message> {
        self.fetch_messages_since(channel, local_day_boundary(), no_access)
            .await
    }

    /// All messages in `channel` at or after `boundary`, newest-first.
    ///
    /// Never fails: a 403 records the channel in `no_access`, any other error
    /// is logged, and in both cases whatever was collected so far is returned.
    pub async fn fetch_messages_since(
        &self,
        channel: &Channel,
        boundary: DateTime<Utc>,
        no_access: &mut NoAccessSet,
    ) -> Vec<Message> {
        let mut messages = Vec::new();
        let mut before: Option<MessageId> = None;
        let mut page_no: u32 = 0;
        let mut order_warned = false;

        loop {
            page_no += 1;
            let page = match self.fetch_page(&channel.id, before.as_ref()).await {
                Ok(page) => page,
                Err(DiscordError::Forbidden) => {
                    no_access.insert(channel.id.clone());
                    warn!(
                        channel = %channel.name,
                        channel_id = %channel.id,
                        "no access to channel, saved to ignore list"
                    );
                    break;
                }
                Err(e) => {
                    warn!(channel = %channel.name, page = page_no, error = %e, "error fetching channel history");
                    break;
                }
            };

            // Cursor for the next page: the oldest message of this one.
            let Some(cursor) = page.last().map(|m| m.id.clone()) else {
                debug!(channel = %channel.name, page = page_no, "reached start of channel history");
                break;
            };

            let mut prev: Option<DateTime<Utc>> = None;
            for msg in page {
                if let Some(prev) = prev {
                    if msg.timestamp > prev && !order_warned {
                        warn!(channel = %channel.name, message_id = %msg.id, "history page is not newest-first");
                        order_warned = true;
                    }
                }
                prev = Some(msg.timestamp);

                if msg.timestamp < boundary {
                    debug!(channel = %channel.name, page = page_no, "reached day boundary");
                    return messages;
                }
                messages.push(msg);
            }

            before = Some(cursor);
            tokio::time::sleep(self.request_delay).await;
        }

        messages
    }

    async fn fetch_page(
        &self,
        channel_id: &ChannelId,
        before: Option<&MessageId>,
    ) -> Result<Vec<Message>, DiscordError> {
        let mut req = self
            .get(&format!("/channels/{channel_id}/messages"))
            .query(&[("limit", PAGE_SIZE.to_string())]);
        if let Some(before) = before {
            req = req.query(&[("before", before.as_str())]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            return Err(DiscordError::Forbidden);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(DiscordError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let page: Vec<Message> = resp
            .json()
            .await
            .map_err(|e| DiscordError::Parse(e.to_string()))?;
        debug!(channel_id = %channel_id, count = page.len(), "fetched history page");
        Ok(page)
    }
}
