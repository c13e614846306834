//! # Arena Session
//!
//! The multiplayer core of a team arena match. Every process runs a
//! [`Session`] against a [`Transport`]; the process picked as host also owns
//! the [`HostAuthority`] that decides stats, base destruction, eliminations
//! and the final placements.
//!
//! ## Flow
//!
//! - Owners send their ship pose best-effort to every other peer.
//! - Hits, deaths, base damage and respawns go to the host, guaranteed.
//! - The host broadcasts base changes and the game end to all peers,
//!   itself included, so every process reacts through the same handlers.
//!
//! ## Example
//!
//! ```rust
//! use arena_session::{LoopbackNetwork, Session, SessionConfig};
//!
//! let mut nets = LoopbackNetwork::new()
//!     .player(1, "Host", 1, 1)
//!     .player(2, "Guest", 2, 1)
//!     .connect();
//! let mut host = Session::new(1, 1, SessionConfig::default());
//! let mut guest = Session::new(2, 1, SessionConfig::default());
//!
//! host.start(&mut nets[0]);
//! guest.start(&mut nets[1]);
//! host.poll(&mut nets[0]);
//! guest.poll(&mut nets[1]);
//!
//! assert!(guest.is_team_base_alive(1));
//! assert!(guest.is_team_base_alive(2));
//! ```

pub mod authority;
pub mod config;
pub mod dispatch;
pub mod elimination;
pub mod replication;
pub mod respawn;
pub mod session;
pub mod stats;
pub mod timer;
pub mod transport;

pub use authority::{HostAuthority, Outcome};
pub use config::SessionConfig;
pub use dispatch::{
    DispatchStats, Dispatcher, Inbound, Outbox, Target, MAX_PACKETS_PER_POLL,
};
pub use elimination::{EliminationError, EliminationTracker, GameResult, TeamPhase};
pub use replication::{RemoteEntities, RemoteEntity, ShipState, Shot};
pub use respawn::{RespawnCoordinator, RespawnState};
pub use session::{LocalPlayer, Session, SessionEvent};
pub use stats::{KillKind, StatsAggregator};
pub use timer::{TimerId, TimerQueue};
pub use transport::{
    Datagram, LinkStats, LoopbackEndpoint, LoopbackNetwork, Membership, Transport,
    TransportError,
};
