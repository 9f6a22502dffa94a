//! Change-notification stream for a backend table. The shell owns the
//! websocket; the core only asks to join or leave a channel and receives one
//! message per backend event.

use crux_core::capability::{CapabilityContext, Operation};
use crux_core::Capability;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeFilter {
    #[serde(rename = "*")]
    All,
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelSpec {
    pub channel: String,
    pub schema: String,
    pub table: String,
    pub event: ChangeFilter,
}

impl ChannelSpec {
    #[must_use]
    pub fn all_changes(
        channel: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            schema: schema.into(),
            table: table.into(),
            event: ChangeFilter::All,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RealtimeOperation {
    Subscribe(ChannelSpec),
    Unsubscribe { channel: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum RealtimeError {
    #[error("channel error: {reason}")]
    Channel { reason: String },

    #[error("subscription timed out")]
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RealtimeMessage {
    Subscribed,
    Change(ChangeKind),
    Closed,
    Error(RealtimeError),
}

impl Operation for RealtimeOperation {
    type Output = RealtimeMessage;
}

pub struct Realtime<Ev> {
    context: CapabilityContext<RealtimeOperation, Ev>,
}

impl<Ev> Clone for Realtime<Ev> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<Ev> Realtime<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<RealtimeOperation, Ev>) -> Self {
        Self { context }
    }

    /// Joins `spec.channel` and forwards every message to the app until the
    /// shell reports the channel closed.
    pub fn subscribe<F>(&self, spec: ChannelSpec, make_event: F)
    where
        F: Fn(RealtimeMessage) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let mut stream = ctx.stream_from_shell(RealtimeOperation::Subscribe(spec));

            while let Some(message) = stream.next().await {
                let closed = message == RealtimeMessage::Closed;
                ctx.update_app(make_event(message));
                if closed {
                    break;
                }
            }
        });
    }

    /// Leaving a channel the shell no longer knows about is a no-op there.
    pub fn unsubscribe(&self, channel: impl Into<String>) {
        let ctx = self.context.clone();
        let channel = channel.into();
        self.context.spawn(async move {
            ctx.notify_shell(RealtimeOperation::Unsubscribe { channel })
                .await;
        });
    }
}

impl<Ev> Capability<Ev> for Realtime<Ev> {
    type Operation = RealtimeOperation;
    type MappedSelf<MappedEv> = Realtime<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Realtime::new(self.context.map_event(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_changes_filter_serializes_as_wildcard() {
        let spec = ChannelSpec::all_changes("reports_channel", "public", "Reports");
        let json = serde_json::to_value(&spec).unwrap();

        assert_eq!(json["event"], "*");
        assert_eq!(json["table"], "Reports");
    }

    #[test]
    fn test_change_kind_from_backend_name() {
        let kind: ChangeKind = serde_json::from_str(r#""DELETE""#).unwrap();
        assert_eq!(kind, ChangeKind::Delete);
    }
}
