//! Per-type payload encoding.
//!
//! Text payloads are UTF-8 with compound fields joined by
//! [`FIELD_SEPARATOR`], a private-use code point that never appears in
//! typed text. Integers are decimal, with `-1` standing for "none".
//! Resource blobs are carried raw, without any separator.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{ClientId, Message, MessageType, ProtocolError, ResourceId, RoomId};

/// Separator between compound payload fields (U+E000, private use area).
pub const FIELD_SEPARATOR: char = '\u{E000}';

/// Separator inside a member id list field.
const LIST_SEPARATOR: &str = ",";

/// Wire value for "no client / no host / no resource".
const SENTINEL: &str = "-1";

impl Message {
    /// Encodes only the payload part of the frame.
    ///
    /// Returns an empty vector for kinds without arguments.
    ///
    /// # Errors
    /// [`ProtocolError::SeparatorInField`] if a text field contains
    /// [`FIELD_SEPARATOR`].
    pub fn encode_payload(&self) -> Result<Vec<u8>, ProtocolError> {
        let kind = self.message_type();
        let text = match self {
            Self::ListClients | Self::ListRooms => return Ok(Vec::new()),
            Self::ResourceCreate { data } | Self::ResourceTransfer { data } => {
                return Ok(data.clone());
            }

            // A single text field may hold anything: it is never split.
            Self::Nickname { nickname } => nickname.clone(),
            Self::AcknowledgeClient { client_id } => {
                optional(client_id.map(|c| c.0))
            }
            Self::ClientDiscovery {
                client_id,
                nickname,
            } => join(kind, &[&client_id.0.to_string(), nickname])?,
            Self::RoomDiscovery {
                room_id,
                title,
                host_id,
                host_name,
            } => join(
                kind,
                &[
                    &room_id.0.to_string(),
                    title,
                    &optional(host_id.map(|c| c.0)),
                    host_name,
                ],
            )?,
            Self::RoomCreate { host_id, title } => {
                join(kind, &[&host_id.0.to_string(), title])?
            }
            Self::AcknowledgeRoomCreate { room_id } => room_id.0.to_string(),
            Self::RoomInvite { room_id, client_id } => join(
                kind,
                &[&room_id.0.to_string(), &client_id.0.to_string()],
            )?,
            Self::InitiateUserChat { user_id } => user_id.0.to_string(),
            Self::AcknowledgeUserChat {
                room_id,
                user_id,
                user_nick,
            } => join(
                kind,
                &[&room_id.0.to_string(), &user_id.0.to_string(), user_nick],
            )?,
            Self::RoomMessageSend {
                room_id,
                text,
                timestamp,
                resource_id,
            } => join(
                kind,
                &[
                    &room_id.0.to_string(),
                    text,
                    &format_timestamp(timestamp),
                    &optional(resource_id.map(|r| r.0)),
                ],
            )?,
            Self::RoomMessageBroadcast {
                room_id,
                text,
                timestamp,
                user_id,
                resource_id,
            } => join(
                kind,
                &[
                    &room_id.0.to_string(),
                    text,
                    &format_timestamp(timestamp),
                    &user_id.0.to_string(),
                    &optional(resource_id.map(|r| r.0)),
                ],
            )?,
            Self::AcknowledgeResource { resource_id } => {
                optional(resource_id.map(|r| r.0))
            }
            Self::ResourceFetch { resource_id } => resource_id.0.to_string(),
            Self::RoomMembershipDiscovery {
                room_id,
                member_ids,
            } => {
                let members = member_ids
                    .iter()
                    .map(|c| c.0.to_string())
                    .collect::<Vec<_>>()
                    .join(LIST_SEPARATOR);
                join(kind, &[&room_id.0.to_string(), &members])?
            }
            Self::ListRoomMembers { room_id } => room_id.0.to_string(),
        };
        Ok(text.into_bytes())
    }

    /// Decodes a payload of the given kind.
    ///
    /// # Errors
    /// Any malformed payload (wrong field count, bad integer, bad
    /// timestamp, non-UTF-8 text) is a [`ProtocolError`].
    pub fn decode_payload(
        kind: MessageType,
        payload: &[u8],
    ) -> Result<Message, ProtocolError> {
        // Blob and argument-less kinds never look at the text.
        let text = || {
            std::str::from_utf8(payload)
                .map_err(|_| ProtocolError::InvalidUtf8(kind))
        };

        let msg = match kind {
            MessageType::ListClients => Self::ListClients,
            MessageType::ListRooms => Self::ListRooms,
            MessageType::ResourceCreate => Self::ResourceCreate {
                data: payload.to_vec(),
            },
            MessageType::ResourceTransfer => Self::ResourceTransfer {
                data: payload.to_vec(),
            },
            MessageType::Nickname => Self::Nickname {
                nickname: text()?.to_string(),
            },
            MessageType::AcknowledgeClient => Self::AcknowledgeClient {
                client_id: parse_optional(kind, text()?)?.map(ClientId),
            },
            MessageType::ClientDiscovery => {
                let [id, nickname] = split::<2>(kind, text()?)?;
                Self::ClientDiscovery {
                    client_id: ClientId(parse_u64(kind, id)?),
                    nickname: nickname.to_string(),
                }
            }
            MessageType::RoomDiscovery => {
                let [room, title, host, host_name] = split::<4>(kind, text()?)?;
                Self::RoomDiscovery {
                    room_id: RoomId(parse_u64(kind, room)?),
                    title: title.to_string(),
                    host_id: parse_optional(kind, host)?.map(ClientId),
                    host_name: host_name.to_string(),
                }
            }
            MessageType::RoomCreate => {
                let [host, title] = split::<2>(kind, text()?)?;
                Self::RoomCreate {
                    host_id: ClientId(parse_u64(kind, host)?),
                    title: title.to_string(),
                }
            }
            MessageType::AcknowledgeRoomCreate => Self::AcknowledgeRoomCreate {
                room_id: RoomId(parse_u64(kind, text()?)?),
            },
            MessageType::RoomInvite => {
                let [room, client] = split::<2>(kind, text()?)?;
                Self::RoomInvite {
                    room_id: RoomId(parse_u64(kind, room)?),
                    client_id: ClientId(parse_u64(kind, client)?),
                }
            }
            MessageType::InitiateUserChat => Self::InitiateUserChat {
                user_id: ClientId(parse_u64(kind, text()?)?),
            },
            MessageType::AcknowledgeUserChat => {
                let [room, user, nick] = split::<3>(kind, text()?)?;
                Self::AcknowledgeUserChat {
                    room_id: RoomId(parse_u64(kind, room)?),
                    user_id: ClientId(parse_u64(kind, user)?),
                    user_nick: nick.to_string(),
                }
            }
            MessageType::RoomMessageSend => {
                let [room, body, ts, resource] = split::<4>(kind, text()?)?;
                Self::RoomMessageSend {
                    room_id: RoomId(parse_u64(kind, room)?),
                    text: body.to_string(),
                    timestamp: parse_timestamp(kind, ts)?,
                    resource_id: parse_optional(kind, resource)?.map(ResourceId),
                }
            }
            MessageType::RoomMessageBroadcast => {
                let [room, body, ts, user, resource] = split::<5>(kind, text()?)?;
                Self::RoomMessageBroadcast {
                    room_id: RoomId(parse_u64(kind, room)?),
                    text: body.to_string(),
                    timestamp: parse_timestamp(kind, ts)?,
                    user_id: ClientId(parse_u64(kind, user)?),
                    resource_id: parse_optional(kind, resource)?.map(ResourceId),
                }
            }
            MessageType::AcknowledgeResource => Self::AcknowledgeResource {
                resource_id: parse_optional(kind, text()?)?.map(ResourceId),
            },
            MessageType::ResourceFetch => Self::ResourceFetch {
                resource_id: ResourceId(parse_u64(kind, text()?)?),
            },
            MessageType::RoomMembershipDiscovery => {
                let [room, members] = split::<2>(kind, text()?)?;
                let member_ids = if members.is_empty() {
                    Vec::new()
                } else {
                    members
                        .split(LIST_SEPARATOR)
                        .map(|m| parse_u64(kind, m).map(ClientId))
                        .collect::<Result<Vec<_>, _>>()?
                };
                Self::RoomMembershipDiscovery {
                    room_id: RoomId(parse_u64(kind, room)?),
                    member_ids,
                }
            }
            MessageType::ListRoomMembers => Self::ListRoomMembers {
                room_id: RoomId(parse_u64(kind, text()?)?),
            },
        };
        Ok(msg)
    }
}

/// Formats a timestamp as RFC 3339 with nanoseconds and a `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(
    kind: MessageType,
    value: &str,
) -> Result<DateTime<Utc>, ProtocolError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ProtocolError::InvalidTimestamp {
            kind,
            value: value.to_string(),
        })
}

fn join(kind: MessageType, fields: &[&str]) -> Result<String, ProtocolError> {
    if fields.iter().any(|f| f.contains(FIELD_SEPARATOR)) {
        return Err(ProtocolError::SeparatorInField(kind));
    }
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_SEPARATOR);
        }
        out.push_str(field);
    }
    Ok(out)
}

/// Splits into exactly `N` fields.
fn split<const N: usize>(
    kind: MessageType,
    text: &str,
) -> Result<[&str; N], ProtocolError> {
    let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
    let found = fields.len();
    fields.try_into().map_err(|_| ProtocolError::FieldCount {
        kind,
        expected: N,
        found,
    })
}

fn parse_u64(kind: MessageType, value: &str) -> Result<u64, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidInteger {
        kind,
        value: value.to_string(),
    })
}

fn parse_optional(
    kind: MessageType,
    value: &str,
) -> Result<Option<u64>, ProtocolError> {
    if value == SENTINEL {
        Ok(None)
    } else {
        parse_u64(kind, value).map(Some)
    }
}

fn optional(value: Option<u64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => SENTINEL.to_string(),
    }
}
