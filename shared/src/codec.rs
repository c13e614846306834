//! Binary wire format for session packets
//!
//! Every packet is `[1-byte tag][payload]`. Fixed payloads are the bincode
//! encoding (fixed-width integers, little-endian, no padding) of the message
//! struct, so the field order of each struct below *is* the wire order and
//! must not be rearranged. Each tag has a known payload length which is
//! checked before any field is read.
//!
//! `GameEnd` is the single variable-length message:
//! `[tag][winning_team: i32][b'|'][len: u32][len bytes of JSON stats]`.

use crate::types::{PeerId, PlayerRecord, Team, DRAW_TEAM};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for any encoded packet, GameEnd included.
pub const MAX_PACKET_SIZE: usize = 64 * 1024;

/// Fixed prefix of a GameEnd payload: team, separator, blob length.
pub const GAME_END_HEADER_LEN: usize = 4 + 1 + 4;

const GAME_END_SEPARATOR: u8 = b'|';

/// One-byte packet discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PacketTag {
    PlayerState = 1,
    ShootEvent = 2,
    BaseStateChanged = 3,
    PlayerHit = 4,
    SpawnEvent = 5,
    GameEnd = 6,
    PlayerDied = 7,
    BaseHit = 8,
    PlayerRespawned = 9,
}

impl PacketTag {
    pub const ALL: [PacketTag; 9] = [
        PacketTag::PlayerState,
        PacketTag::ShootEvent,
        PacketTag::BaseStateChanged,
        PacketTag::PlayerHit,
        PacketTag::SpawnEvent,
        PacketTag::GameEnd,
        PacketTag::PlayerDied,
        PacketTag::BaseHit,
        PacketTag::PlayerRespawned,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| *tag as u8 == byte)
    }

    /// Payload length in bytes for fixed layouts, None for GameEnd.
    pub fn payload_len(self) -> Option<usize> {
        match self {
            PacketTag::PlayerState => Some(PlayerState::LEN),
            PacketTag::ShootEvent => Some(ShootEvent::LEN),
            PacketTag::BaseStateChanged => Some(BaseStateChanged::LEN),
            PacketTag::PlayerHit => Some(PlayerHit::LEN),
            PacketTag::SpawnEvent => Some(SpawnEvent::LEN),
            PacketTag::GameEnd => None,
            PacketTag::PlayerDied => Some(PlayerDied::LEN),
            PacketTag::BaseHit => Some(BaseHit::LEN),
            PacketTag::PlayerRespawned => Some(PlayerRespawned::LEN),
        }
    }
}

/// Delivery guarantee requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// May be dropped or reordered; used for per-tick transform replication.
    BestEffort,
    /// Retried until acknowledged; used for anything that changes authoritative state.
    Guaranteed,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("empty packet")]
    Empty,
    #[error("unknown packet tag: 0x{0:02x}")]
    UnknownTag(u8),
    #[error("malformed {tag:?} packet: expected {expected} payload bytes, got {actual}")]
    Malformed {
        tag: PacketTag,
        expected: usize,
        actual: usize,
    },
    #[error("{tag:?} field `{field}` is not a finite number")]
    NonFinite { tag: PacketTag, field: &'static str },
    #[error("{tag:?} carries a boolean byte that is neither 0 nor 1")]
    InvalidBool { tag: PacketTag },
    #[error("{tag:?} payload could not be decoded: {reason}")]
    Decode { tag: PacketTag, reason: String },
    #[error("game end packet is missing the stats separator")]
    Separator,
    #[error("game end names invalid winning team {0}")]
    InvalidTeam(Team),
    #[error("game end stats blob is invalid: {0}")]
    Stats(String),
    #[error("packet too large: {0} bytes (max {MAX_PACKET_SIZE})")]
    TooLarge(usize),
    #[error("encode error: {0}")]
    Encode(String),
}

/// Transform of a player-controlled ship, replicated every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub peer_id: PeerId,
    pub pos_x: f32,
    pub pos_y: f32,
    pub rot: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub emitting_trail: bool,
    pub alive: bool,
}

/// Cosmetic notification that a peer fired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShootEvent {
    pub peer_id: PeerId,
    pub pos_x: f32,
    pub pos_y: f32,
    pub rot: f32,
    pub dir_x: f32,
    pub dir_y: f32,
}

/// Authoritative base liveness, broadcast by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseStateChanged {
    pub team: Team,
    pub alive: bool,
}

/// Damage dealt to the sender's ship by `peer_id`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerHit {
    pub peer_id: PeerId,
    pub damage: f32,
}

/// Host-driven hazard spawn (asteroids).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnEvent {
    pub pos_x: f32,
    pub pos_y: f32,
    pub dir_x: f32,
    pub dir_y: f32,
}

/// The sender's ship died; `killer` is `NO_PEER` for environmental deaths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerDied {
    pub killer: PeerId,
    pub victim_max_health: f32,
}

/// The sender damaged a team's base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseHit {
    pub team: Team,
    pub damage: f32,
}

/// A peer came back after its respawn countdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerRespawned {
    pub peer_id: PeerId,
}

/// Final result, sent once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEnd {
    /// None when every team was eliminated.
    pub winning_team: Option<Team>,
    pub stats: Vec<PlayerRecord>,
}

trait FixedLayout: Serialize + DeserializeOwned {
    const TAG: PacketTag;
    const LEN: usize;

    fn floats(&self) -> Vec<(&'static str, f32)>;

    fn check_finite(&self) -> Result<(), CodecError> {
        match self.floats().into_iter().find(|(_, v)| !v.is_finite()) {
            Some((field, _)) => Err(CodecError::NonFinite {
                tag: Self::TAG,
                field,
            }),
            None => Ok(()),
        }
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.check_finite()?;
        let body = bincode::serialize(self).map_err(|e| CodecError::Encode(e.to_string()))?;
        debug_assert_eq!(body.len(), Self::LEN);
        out.push(Self::TAG as u8);
        out.extend_from_slice(&body);
        Ok(())
    }

    fn read(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() != Self::LEN {
            return Err(CodecError::Malformed {
                tag: Self::TAG,
                expected: Self::LEN,
                actual: payload.len(),
            });
        }
        let msg: Self = bincode::deserialize(payload).map_err(|e| match *e {
            bincode::ErrorKind::InvalidBoolEncoding(_) => {
                CodecError::InvalidBool { tag: Self::TAG }
            }
            other => CodecError::Decode {
                tag: Self::TAG,
                reason: other.to_string(),
            },
        })?;
        msg.check_finite()?;
        Ok(msg)
    }
}

impl FixedLayout for PlayerState {
    const TAG: PacketTag = PacketTag::PlayerState;
    const LEN: usize = 8 + 5 * 4 + 2;

    fn floats(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("pos_x", self.pos_x),
            ("pos_y", self.pos_y),
            ("rot", self.rot),
            ("vel_x", self.vel_x),
            ("vel_y", self.vel_y),
        ]
    }
}

impl FixedLayout for ShootEvent {
    const TAG: PacketTag = PacketTag::ShootEvent;
    const LEN: usize = 8 + 5 * 4;

    fn floats(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("pos_x", self.pos_x),
            ("pos_y", self.pos_y),
            ("rot", self.rot),
            ("dir_x", self.dir_x),
            ("dir_y", self.dir_y),
        ]
    }
}

impl FixedLayout for BaseStateChanged {
    const TAG: PacketTag = PacketTag::BaseStateChanged;
    const LEN: usize = 4 + 1;

    fn floats(&self) -> Vec<(&'static str, f32)> {
        Vec::new()
    }
}

impl FixedLayout for PlayerHit {
    const TAG: PacketTag = PacketTag::PlayerHit;
    const LEN: usize = 8 + 4;

    fn floats(&self) -> Vec<(&'static str, f32)> {
        vec![("damage", self.damage)]
    }
}

impl FixedLayout for SpawnEvent {
    const TAG: PacketTag = PacketTag::SpawnEvent;
    const LEN: usize = 4 * 4;

    fn floats(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("pos_x", self.pos_x),
            ("pos_y", self.pos_y),
            ("dir_x", self.dir_x),
            ("dir_y", self.dir_y),
        ]
    }
}

impl FixedLayout for PlayerDied {
    const TAG: PacketTag = PacketTag::PlayerDied;
    const LEN: usize = 8 + 4;

    fn floats(&self) -> Vec<(&'static str, f32)> {
        vec![("victim_max_health", self.victim_max_health)]
    }
}

impl FixedLayout for BaseHit {
    const TAG: PacketTag = PacketTag::BaseHit;
    const LEN: usize = 4 + 4;

    fn floats(&self) -> Vec<(&'static str, f32)> {
        vec![("damage", self.damage)]
    }
}

impl FixedLayout for PlayerRespawned {
    const TAG: PacketTag = PacketTag::PlayerRespawned;
    const LEN: usize = 8;

    fn floats(&self) -> Vec<(&'static str, f32)> {
        Vec::new()
    }
}

impl GameEnd {
    fn write(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        if self.stats.iter().any(|r| !r.total_damage_dealt.is_finite()) {
            return Err(CodecError::NonFinite {
                tag: PacketTag::GameEnd,
                field: "total_damage_dealt",
            });
        }
        let blob = serde_json::to_vec(&self.stats).map_err(|e| CodecError::Encode(e.to_string()))?;
        let total = 1 + GAME_END_HEADER_LEN + blob.len();
        if total > MAX_PACKET_SIZE {
            return Err(CodecError::TooLarge(total));
        }
        let blob_len = u32::try_from(blob.len()).map_err(|_| CodecError::TooLarge(total))?;

        out.reserve(total);
        out.push(PacketTag::GameEnd as u8);
        out.extend_from_slice(&self.winning_team.unwrap_or(DRAW_TEAM).to_le_bytes());
        out.push(GAME_END_SEPARATOR);
        out.extend_from_slice(&blob_len.to_le_bytes());
        out.extend_from_slice(&blob);
        Ok(())
    }

    fn read(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() < GAME_END_HEADER_LEN {
            return Err(CodecError::Malformed {
                tag: PacketTag::GameEnd,
                expected: GAME_END_HEADER_LEN,
                actual: payload.len(),
            });
        }
        if 1 + payload.len() > MAX_PACKET_SIZE {
            return Err(CodecError::TooLarge(1 + payload.len()));
        }

        let team = Team::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        if payload[4] != GAME_END_SEPARATOR {
            return Err(CodecError::Separator);
        }
        let blob_len =
            u32::from_le_bytes([payload[5], payload[6], payload[7], payload[8]]) as usize;
        let expected = GAME_END_HEADER_LEN + blob_len;
        if payload.len() != expected {
            return Err(CodecError::Malformed {
                tag: PacketTag::GameEnd,
                expected,
                actual: payload.len(),
            });
        }

        let winning_team = match team {
            DRAW_TEAM => None,
            t if t > 0 => Some(t),
            t => return Err(CodecError::InvalidTeam(t)),
        };
        let stats: Vec<PlayerRecord> = serde_json::from_slice(&payload[GAME_END_HEADER_LEN..])
            .map_err(|e| CodecError::Stats(e.to_string()))?;

        Ok(GameEnd {
            winning_team,
            stats,
        })
    }
}

/// A decoded session packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    PlayerState(PlayerState),
    ShootEvent(ShootEvent),
    BaseStateChanged(BaseStateChanged),
    PlayerHit(PlayerHit),
    SpawnEvent(SpawnEvent),
    GameEnd(GameEnd),
    PlayerDied(PlayerDied),
    BaseHit(BaseHit),
    PlayerRespawned(PlayerRespawned),
}

impl Packet {
    pub fn tag(&self) -> PacketTag {
        match self {
            Packet::PlayerState(_) => PacketTag::PlayerState,
            Packet::ShootEvent(_) => PacketTag::ShootEvent,
            Packet::BaseStateChanged(_) => PacketTag::BaseStateChanged,
            Packet::PlayerHit(_) => PacketTag::PlayerHit,
            Packet::SpawnEvent(_) => PacketTag::SpawnEvent,
            Packet::GameEnd(_) => PacketTag::GameEnd,
            Packet::PlayerDied(_) => PacketTag::PlayerDied,
            Packet::BaseHit(_) => PacketTag::BaseHit,
            Packet::PlayerRespawned(_) => PacketTag::PlayerRespawned,
        }
    }

    /// Delivery mode this packet kind is meant to travel with.
    pub fn delivery(&self) -> Delivery {
        match self {
            Packet::PlayerState(_) | Packet::ShootEvent(_) => Delivery::BestEffort,
            _ => Delivery::Guaranteed,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(
            1 + self.tag().payload_len().unwrap_or(GAME_END_HEADER_LEN),
        );
        match self {
            Packet::PlayerState(m) => m.write(&mut out)?,
            Packet::ShootEvent(m) => m.write(&mut out)?,
            Packet::BaseStateChanged(m) => m.write(&mut out)?,
            Packet::PlayerHit(m) => m.write(&mut out)?,
            Packet::SpawnEvent(m) => m.write(&mut out)?,
            Packet::GameEnd(m) => m.write(&mut out)?,
            Packet::PlayerDied(m) => m.write(&mut out)?,
            Packet::BaseHit(m) => m.write(&mut out)?,
            Packet::PlayerRespawned(m) => m.write(&mut out)?,
        }
        Ok(out)
    }

    /// Reads the tag byte from raw wire data.
    pub fn peek_tag(data: &[u8]) -> Result<PacketTag, CodecError> {
        let first = *data.first().ok_or(CodecError::Empty)?;
        PacketTag::from_byte(first).ok_or(CodecError::UnknownTag(first))
    }

    /// Decodes a full `[tag][payload]` buffer.
    pub fn decode(data: &[u8]) -> Result<Packet, CodecError> {
        let tag = Self::peek_tag(data)?;
        Self::decode_payload(tag, &data[1..])
    }

    /// Decodes the bytes following an already-read tag.
    pub fn decode_payload(tag: PacketTag, payload: &[u8]) -> Result<Packet, CodecError> {
        Ok(match tag {
            PacketTag::PlayerState => Packet::PlayerState(PlayerState::read(payload)?),
            PacketTag::ShootEvent => Packet::ShootEvent(ShootEvent::read(payload)?),
            PacketTag::BaseStateChanged => {
                Packet::BaseStateChanged(BaseStateChanged::read(payload)?)
            }
            PacketTag::PlayerHit => Packet::PlayerHit(PlayerHit::read(payload)?),
            PacketTag::SpawnEvent => Packet::SpawnEvent(SpawnEvent::read(payload)?),
            PacketTag::GameEnd => Packet::GameEnd(GameEnd::read(payload)?),
            PacketTag::PlayerDied => Packet::PlayerDied(PlayerDied::read(payload)?),
            PacketTag::BaseHit => Packet::BaseHit(BaseHit::read(payload)?),
            PacketTag::PlayerRespawned => {
                Packet::PlayerRespawned(PlayerRespawned::read(payload)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn sample_state() -> PlayerState {
        PlayerState {
            peer_id: 0x0102_0304_0506_0708,
            pos_x: 1.5,
            pos_y: -2.25,
            rot: 90.0,
            vel_x: 0.0,
            vel_y: -0.0,
            emitting_trail: true,
            alive: false,
        }
    }

    #[test]
    fn test_tag_bytes() {
        for tag in PacketTag::ALL {
            assert_eq!(PacketTag::from_byte(tag as u8), Some(tag));
        }
        assert_eq!(PacketTag::from_byte(0), None);
        assert_eq!(PacketTag::from_byte(10), None);
    }

    #[test]
    fn test_player_state_layout() {
        let bytes = Packet::PlayerState(sample_state()).encode().unwrap();
        assert_eq!(bytes.len(), 1 + 30);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..9], &0x0102_0304_0506_0708u64.to_le_bytes());
        assert_eq!(&bytes[9..13], &1.5f32.to_le_bytes());
        assert_eq!(&bytes[13..17], &(-2.25f32).to_le_bytes());
        assert_eq!(bytes[29], 1);
        assert_eq!(bytes[30], 0);
    }

    #[test]
    fn test_base_state_layout() {
        let bytes = Packet::BaseStateChanged(BaseStateChanged {
            team: 3,
            alive: false,
        })
        .encode()
        .unwrap();
        assert_eq!(bytes, vec![3, 3, 0, 0, 0, 0]);
    }

    #[test]
    fn test_fixed_lengths_match_tags() {
        let packets = vec![
            Packet::PlayerState(sample_state()),
            Packet::ShootEvent(ShootEvent {
                peer_id: 9,
                pos_x: 1.0,
                pos_y: 2.0,
                rot: 3.0,
                dir_x: 0.0,
                dir_y: 1.0,
            }),
            Packet::BaseStateChanged(BaseStateChanged {
                team: 1,
                alive: true,
            }),
            Packet::PlayerHit(PlayerHit {
                peer_id: 5,
                damage: 1.0,
            }),
            Packet::SpawnEvent(SpawnEvent {
                pos_x: 170.0,
                pos_y: 0.0,
                dir_x: -1.0,
                dir_y: 0.0,
            }),
            Packet::PlayerDied(PlayerDied {
                killer: 5,
                victim_max_health: 30.0,
            }),
            Packet::BaseHit(BaseHit {
                team: 2,
                damage: 1.0,
            }),
            Packet::PlayerRespawned(PlayerRespawned { peer_id: 5 }),
        ];

        for packet in packets {
            let bytes = packet.encode().unwrap();
            let expected = packet.tag().payload_len().unwrap();
            assert_eq!(bytes.len(), 1 + expected, "{:?}", packet.tag());
            assert_eq!(Packet::decode(&bytes).unwrap(), packet);
        }
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let mut bytes = Packet::PlayerHit(PlayerHit {
            peer_id: 5,
            damage: 2.0,
        })
        .encode()
        .unwrap();

        bytes.push(0);
        assert_eq!(
            Packet::decode(&bytes),
            Err(CodecError::Malformed {
                tag: PacketTag::PlayerHit,
                expected: 12,
                actual: 13
            })
        );

        bytes.truncate(5);
        assert!(matches!(
            Packet::decode(&bytes),
            Err(CodecError::Malformed { actual: 4, .. })
        ));
    }

    #[test]
    fn test_empty_and_unknown() {
        assert_eq!(Packet::decode(&[]), Err(CodecError::Empty));
        assert_eq!(Packet::decode(&[0xEE, 1, 2]), Err(CodecError::UnknownTag(0xEE)));
    }

    #[test]
    fn test_nan_rejected_both_ways() {
        let hit = PlayerHit {
            peer_id: 1,
            damage: f32::NAN,
        };
        assert_eq!(
            Packet::PlayerHit(hit).encode(),
            Err(CodecError::NonFinite {
                tag: PacketTag::PlayerHit,
                field: "damage"
            })
        );

        let mut raw = vec![PacketTag::PlayerHit as u8];
        raw.extend_from_slice(&1u64.to_le_bytes());
        raw.extend_from_slice(&f32::INFINITY.to_le_bytes());
        assert!(matches!(
            Packet::decode(&raw),
            Err(CodecError::NonFinite { field: "damage", .. })
        ));
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let mut raw = vec![PacketTag::BaseStateChanged as u8];
        raw.extend_from_slice(&2i32.to_le_bytes());
        raw.push(7);
        assert_eq!(
            Packet::decode(&raw),
            Err(CodecError::InvalidBool {
                tag: PacketTag::BaseStateChanged
            })
        );
    }

    #[test]
    fn test_game_end_roundtrip() {
        let mut winner = PlayerRecord::new(11, "Ada", 2);
        winner.kills = 4;
        winner.placement = 1;
        winner.total_damage_dealt = 17.5;
        let mut loser = PlayerRecord::new(12, "Bo", 1);
        loser.alive = false;
        loser.deaths = 2;
        loser.placement = 2;

        let packet = Packet::GameEnd(GameEnd {
            winning_team: Some(2),
            stats: vec![winner, loser],
        });
        let bytes = packet.encode().unwrap();
        assert_eq!(bytes[0], 6);
        assert_eq!(&bytes[1..5], &2i32.to_le_bytes());
        assert_eq!(bytes[5], b'|');
        let blob_len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        assert_eq!(bytes.len(), 10 + blob_len);

        match Packet::decode(&bytes).unwrap() {
            Packet::GameEnd(end) => {
                assert_eq!(end.winning_team, Some(2));
                assert_eq!(end.stats.len(), 2);
                assert_approx_eq!(end.stats[0].total_damage_dealt, 17.5, 1e-6);
            }
            other => panic!("Wrong packet type after decoding: {:?}", other),
        }
    }

    #[test]
    fn test_game_end_draw_sentinel() {
        let bytes = Packet::GameEnd(GameEnd {
            winning_team: None,
            stats: vec![],
        })
        .encode()
        .unwrap();
        assert_eq!(&bytes[1..5], &(-1i32).to_le_bytes());
        assert_eq!(
            Packet::decode(&bytes).unwrap(),
            Packet::GameEnd(GameEnd {
                winning_team: None,
                stats: vec![]
            })
        );
    }

    #[test]
    fn test_game_end_framing_errors() {
        let good = Packet::GameEnd(GameEnd {
            winning_team: Some(1),
            stats: vec![PlayerRecord::new(1, "A", 1)],
        })
        .encode()
        .unwrap();

        let mut truncated = good.clone();
        truncated.pop();
        assert!(matches!(
            Packet::decode(&truncated),
            Err(CodecError::Malformed {
                tag: PacketTag::GameEnd,
                ..
            })
        ));

        let mut no_separator = good.clone();
        no_separator[5] = b',';
        assert_eq!(Packet::decode(&no_separator), Err(CodecError::Separator));

        let mut bad_team = good.clone();
        bad_team[1..5].copy_from_slice(&0i32.to_le_bytes());
        assert_eq!(Packet::decode(&bad_team), Err(CodecError::InvalidTeam(0)));

        let mut garbage = good;
        let last = garbage.len() - 1;
        garbage[last] = b'#';
        assert!(matches!(Packet::decode(&garbage), Err(CodecError::Stats(_))));

        assert!(matches!(
            Packet::decode(&[6, 1, 0]),
            Err(CodecError::Malformed { expected: 9, .. })
        ));
    }

    #[test]
    fn test_delivery_modes() {
        assert_eq!(
            Packet::PlayerState(sample_state()).delivery(),
            Delivery::BestEffort
        );
        assert_eq!(
            Packet::BaseStateChanged(BaseStateChanged {
                team: 1,
                alive: false
            })
            .delivery(),
            Delivery::Guaranteed
        );
        assert_eq!(
            Packet::PlayerRespawned(PlayerRespawned { peer_id: 1 }).delivery(),
            Delivery::Guaranteed
        );
    }
}
