//! Gateway session: receives the events that trigger archival runs
//!
//! The session connects, identifies, keeps the heartbeat going and forwards
//! decoded dispatches to an mpsc channel. When the connection drops it waits
//! `reconnect_delay` and identifies again; it stops once the receiving side of
//! the channel is gone.

use crate::error::GatewayError;
use crate::models::DiscordMessage;
use futures_util::{SinkExt, StreamExt};
use pinkeeper_domain::{ChannelId, GuildId};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

/// Default gateway endpoint
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Gateway intents
pub mod intents {
    /// Guild create/delete and channel events
    pub const GUILDS: u64 = 1 << 0;
    /// Messages and pin updates in guild channels
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    /// Message bodies (privileged)
    pub const MESSAGE_CONTENT: u64 = 1 << 15;
}

/// Intents the bot identifies with
pub const BOT_INTENTS: u64 = intents::GUILDS | intents::GUILD_MESSAGES | intents::MESSAGE_CONTENT;

mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Events forwarded to the bot
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// Session established
    Ready {
        /// The bot's own user id
        user_id: String,
        /// Name of the bot account
        username: String,
        /// Guilds the bot already belongs to
        guilds: Vec<GuildId>,
    },

    /// A message was posted
    MessageCreate(Box<DiscordMessage>),

    /// A message was pinned or unpinned in a channel
    ChannelPinsUpdate {
        /// Guild of the channel, absent for DMs
        guild_id: Option<GuildId>,
        /// The channel
        channel_id: ChannelId,
    },

    /// The bot joined a guild, or a guild became available
    GuildCreate {
        /// Guild id
        guild_id: GuildId,
        /// Guild name
        name: String,
        /// Channel for welcome messages, if the guild has one
        system_channel_id: Option<ChannelId>,
    },

    /// The bot left or was removed from a guild
    GuildDelete {
        /// Guild id
        guild_id: GuildId,
        /// Set when the guild is only temporarily unavailable
        unavailable: bool,
    },
}

/// Gateway session settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// WebSocket URL
    pub url: String,
    /// Bot token
    pub token: String,
    /// Intents bitfield
    pub intents: u64,
    /// Pause between a dropped session and the next connect
    pub reconnect_delay: Duration,
}

impl GatewayConfig {
    /// Default endpoint and intents for the given token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            token: token.into(),
            intents: BOT_INTENTS,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Hello {
    heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
struct ReadyData {
    user: ReadyUser,
    #[serde(default)]
    guilds: Vec<UnavailableGuild>,
}

#[derive(Debug, Deserialize)]
struct UnavailableGuild {
    id: GuildId,
}

#[derive(Debug, Deserialize)]
struct ReadyUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct PinsUpdateData {
    #[serde(default)]
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
}

#[derive(Debug, Deserialize)]
struct GuildCreateData {
    id: GuildId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    system_channel_id: Option<ChannelId>,
}

#[derive(Debug, Deserialize)]
struct GuildDeleteData {
    id: GuildId,
    #[serde(default)]
    unavailable: bool,
}

/// Decode a dispatch payload; unknown event names yield `None`
pub fn decode_dispatch(name: &str, data: Value) -> Result<Option<GatewayEvent>, GatewayError> {
    let event = match name {
        "READY" => {
            let ready: ReadyData = serde_json::from_value(data)?;
            GatewayEvent::Ready {
                user_id: ready.user.id,
                username: ready.user.username,
                guilds: ready.guilds.into_iter().map(|g| g.id).collect(),
            }
        }
        "MESSAGE_CREATE" => GatewayEvent::MessageCreate(Box::new(serde_json::from_value(data)?)),
        "CHANNEL_PINS_UPDATE" => {
            let update: PinsUpdateData = serde_json::from_value(data)?;
            GatewayEvent::ChannelPinsUpdate {
                guild_id: update.guild_id,
                channel_id: update.channel_id,
            }
        }
        "GUILD_CREATE" => {
            let guild: GuildCreateData = serde_json::from_value(data)?;
            GatewayEvent::GuildCreate {
                guild_id: guild.id,
                name: guild.name,
                system_channel_id: guild.system_channel_id,
            }
        }
        "GUILD_DELETE" => {
            let guild: GuildDeleteData = serde_json::from_value(data)?;
            GatewayEvent::GuildDelete {
                guild_id: guild.id,
                unavailable: guild.unavailable,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}

fn parse_frame(message: WsMessage) -> Result<Option<GatewayPayload>, GatewayError> {
    match message {
        WsMessage::Text(text) => Ok(Some(serde_json::from_str(&text)?)),
        WsMessage::Binary(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        WsMessage::Close(Some(frame)) => {
            let code = u16::from(frame.code);
            if is_fatal_close_code(code) {
                Err(GatewayError::AuthenticationFailed)
            } else {
                Err(GatewayError::Closed(format!("{} {}", code, frame.reason)))
            }
        }
        WsMessage::Close(None) => Err(GatewayError::Closed(String::new())),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => Ok(None),
    }
}

fn identify_payload(config: &GatewayConfig) -> Value {
    json!({
        "op": opcode::IDENTIFY,
        "d": {
            "token": config.token,
            "intents": config.intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "pinkeeper",
                "device": "pinkeeper"
            }
        }
    })
}

fn heartbeat_payload(sequence: Option<u64>) -> Value {
    json!({ "op": opcode::HEARTBEAT, "d": sequence })
}

/// Run gateway sessions until the event receiver is dropped
///
/// An invalid token ends the loop with an error; every other failure is
/// logged and followed by a reconnect.
pub async fn run_gateway(
    config: GatewayConfig,
    events: mpsc::Sender<GatewayEvent>,
) -> Result<(), GatewayError> {
    loop {
        match run_session(&config, &events).await {
            Ok(()) if events.is_closed() => return Ok(()),
            Ok(()) => tracing::info!("gateway asked for a reconnect"),
            Err(GatewayError::AuthenticationFailed) => {
                return Err(GatewayError::AuthenticationFailed)
            }
            Err(e) => tracing::warn!("gateway session ended: {}", e),
        }

        if events.is_closed() {
            return Ok(());
        }
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

async fn run_session(
    config: &GatewayConfig,
    events: &mpsc::Sender<GatewayEvent>,
) -> Result<(), GatewayError> {
    let (stream, _response) = connect_async(config.url.as_str()).await?;
    let (mut sink, mut source) = stream.split();

    let hello = loop {
        let Some(frame) = source.next().await else {
            return Err(GatewayError::Closed("before hello".to_string()));
        };
        if let Some(payload) = parse_frame(frame?)? {
            if payload.op != opcode::HELLO {
                return Err(GatewayError::Protocol(format!(
                    "expected hello, got opcode {}",
                    payload.op
                )));
            }
            break serde_json::from_value::<Hello>(payload.d)?;
        }
    };

    sink.send(WsMessage::Text(identify_payload(config).to_string().into()))
        .await?;
    tracing::debug!(heartbeat_ms = hello.heartbeat_interval, "identified with gateway");

    let period = Duration::from_millis(hello.heartbeat_interval.max(1));
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sequence: Option<u64> = None;
    let mut acked = true;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if !acked {
                    return Err(GatewayError::Protocol("heartbeat not acknowledged".to_string()));
                }
                sink.send(WsMessage::Text(heartbeat_payload(sequence).to_string().into()))
                    .await?;
                acked = false;
            }
            _ = events.closed() => {
                let _ = sink.close().await;
                return Ok(());
            }
            frame = source.next() => {
                let Some(frame) = frame else {
                    return Err(GatewayError::Closed("stream ended".to_string()));
                };
                let Some(payload) = parse_frame(frame?)? else {
                    continue;
                };
                if payload.s.is_some() {
                    sequence = payload.s;
                }

                match payload.op {
                    opcode::DISPATCH => {
                        let name = payload.t.unwrap_or_default();
                        match decode_dispatch(&name, payload.d) {
                            Ok(Some(event)) => {
                                if events.send(event).await.is_err() {
                                    return Ok(());
                                }
                            }
                            Ok(None) => {}
                            Err(e) => tracing::warn!(event = %name, "undecodable dispatch: {}", e),
                        }
                    }
                    opcode::HEARTBEAT => {
                        sink.send(WsMessage::Text(heartbeat_payload(sequence).to_string().into()))
                            .await?;
                    }
                    opcode::HEARTBEAT_ACK => acked = true,
                    opcode::RECONNECT => return Ok(()),
                    opcode::INVALID_SESSION => {
                        return Err(GatewayError::Protocol("session invalidated".to_string()))
                    }
                    other => tracing::debug!(opcode = other, "ignoring gateway opcode"),
                }
            }
        }
    }
}

/// Whether a close code means the token or intents were rejected
pub fn is_fatal_close_code(code: u16) -> bool {
    matches!(code, 4004 | 4013 | 4014)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_intents() {
        assert_eq!(BOT_INTENTS, 33281);
    }

    #[test]
    fn test_decode_pins_update() {
        let event = decode_dispatch(
            "CHANNEL_PINS_UPDATE",
            json!({ "guild_id": "1", "channel_id": "2", "last_pin_timestamp": null }),
        )
        .unwrap();
        assert!(matches!(
            event,
            Some(GatewayEvent::ChannelPinsUpdate { guild_id: Some(g), channel_id })
                if g.as_str() == "1" && channel_id.as_str() == "2"
        ));
    }

    #[test]
    fn test_decode_ready() {
        let event = decode_dispatch(
            "READY",
            json!({
                "v": 10,
                "user": { "id": "42", "username": "pinkeeper" },
                "guilds": [{ "id": "7", "unavailable": true }]
            }),
        )
        .unwrap();
        assert!(matches!(
            event,
            Some(GatewayEvent::Ready { user_id, guilds, .. })
                if user_id == "42" && guilds == vec![GuildId::from("7")]
        ));
    }

    #[test]
    fn test_decode_guild_events() {
        let created = decode_dispatch(
            "GUILD_CREATE",
            json!({ "id": "7", "name": "Club", "system_channel_id": "8" }),
        )
        .unwrap();
        assert!(matches!(
            created,
            Some(GatewayEvent::GuildCreate { system_channel_id: Some(c), .. }) if c.as_str() == "8"
        ));

        let deleted = decode_dispatch("GUILD_DELETE", json!({ "id": "7" })).unwrap();
        assert!(matches!(
            deleted,
            Some(GatewayEvent::GuildDelete { unavailable: false, .. })
        ));
    }

    #[test]
    fn test_unknown_dispatch_is_ignored() {
        assert!(decode_dispatch("TYPING_START", json!({})).unwrap().is_none());
    }

    #[test]
    fn test_malformed_dispatch_is_an_error() {
        assert!(decode_dispatch("CHANNEL_PINS_UPDATE", json!({ "guild_id": "1" })).is_err());
    }

    #[test]
    fn test_identify_payload() {
        let payload = identify_payload(&GatewayConfig::new("secret"));
        assert_eq!(payload["op"], 2);
        assert_eq!(payload["d"]["token"], "secret");
        assert_eq!(payload["d"]["intents"], BOT_INTENTS);
    }

    #[test]
    fn test_close_frame_ends_session() {
        assert!(matches!(
            parse_frame(WsMessage::Close(None)),
            Err(GatewayError::Closed(_))
        ));
        assert!(parse_frame(WsMessage::Ping(Vec::new().into())).unwrap().is_none());
    }
}
