//! # Arena Shared
//!
//! Types and wire format understood by every process in an arena session.
//! Nothing in this crate performs I/O; the session crate owns transport,
//! dispatch and the host's authoritative state.
//!
//! ## Wire Format
//!
//! Packets are a one-byte [`PacketTag`] followed by a fixed-size little-endian
//! payload, except for [`GameEnd`] which carries a length-prefixed JSON list of
//! [`PlayerRecord`]s. See [`codec`] for the exact layouts.
//!
//! ```rust
//! use arena_shared::{BaseStateChanged, Packet};
//!
//! let packet = Packet::BaseStateChanged(BaseStateChanged { team: 2, alive: false });
//! let bytes = packet.encode().unwrap();
//! assert_eq!(Packet::decode(&bytes).unwrap(), packet);
//! ```

pub mod codec;
pub mod types;

pub use codec::{
    BaseHit, BaseStateChanged, CodecError, Delivery, GameEnd, Packet, PacketTag, PlayerDied,
    PlayerHit, PlayerRespawned, PlayerState, ShootEvent, SpawnEvent, MAX_PACKET_SIZE,
};
pub use types::{
    placement_label, PeerId, PlayerRecord, SlotAssignment, Team, DRAW_TEAM, NAME_METADATA_KEY,
    NO_PEER, SLOT_METADATA_KEY,
};

/// Fraction of the victim's max health an attacker must have dealt to earn an assist.
pub const DEFAULT_ASSIST_THRESHOLD: f32 = 0.5;

/// Ship health used by the arena ruleset.
pub const DEFAULT_PLAYER_MAX_HEALTH: f32 = 30.0;

/// Base (planet) health used by the arena ruleset.
pub const DEFAULT_BASE_MAX_HEALTH: f32 = 30.0;

/// Seconds a dead player waits before respawning next to a standing base.
pub const DEFAULT_RESPAWN_DELAY_SECS: f32 = 5.0;

/// Fraction of the gap to a remote ship's reported position closed per sample.
pub const DEFAULT_REPLICATION_SMOOTHING: f32 = 0.2;
