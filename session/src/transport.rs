//! Transport and membership seams, plus an in-memory loopback network
//!
//! The session never talks to a socket or a lobby service directly. It sees
//! a [`Transport`] that moves opaque datagrams between peers and a
//! [`Membership`] directory that lists who is in the session, what lobby
//! metadata they published and who has left.
//!
//! [`LoopbackNetwork`] wires any number of endpoints together through tokio
//! channels. It backs the simulator and the integration tests and can drop a
//! configurable share of best-effort traffic to mimic a lossy link.

use arena_shared::{Delivery, PeerId, Team, NAME_METADATA_KEY, SLOT_METADATA_KEY};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, VecDeque};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

/// Raw bytes plus the peer that sent them.
pub type Datagram = (Vec<u8>, PeerId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("peer {0} is not part of this session")]
    UnknownPeer(PeerId),
    #[error("peer {0} is no longer reachable")]
    Disconnected(PeerId),
}

/// Datagram transport between session peers.
pub trait Transport {
    fn local_peer(&self) -> PeerId;

    /// True when `read_packet` would return a datagram right now.
    fn is_packet_available(&mut self) -> bool;

    /// Next buffered datagram, never blocking.
    fn read_packet(&mut self) -> Option<Datagram>;

    fn send_packet(
        &mut self,
        target: PeerId,
        data: &[u8],
        delivery: Delivery,
    ) -> Result<(), TransportError>;
}

/// Lobby membership as seen by one peer.
pub trait Membership {
    /// Every peer currently in the session, the local one included.
    fn list_peers(&self) -> Vec<PeerId>;

    fn peer_metadata(&self, peer: PeerId, key: &str) -> Option<String>;

    /// Peers that left since the last call.
    fn take_departed(&mut self) -> Vec<PeerId>;
}

/// Counters kept by a loopback endpoint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub sent: u64,
    pub received: u64,
    pub dropped: u64,
}

#[derive(Debug, Clone)]
struct PeerProfile {
    id: PeerId,
    metadata: HashMap<String, String>,
}

/// Builder for a set of connected in-memory endpoints.
#[derive(Debug, Clone)]
pub struct LoopbackNetwork {
    profiles: Vec<PeerProfile>,
    best_effort_loss: f64,
    seed: u64,
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self {
            profiles: Vec::new(),
            best_effort_loss: 0.0,
            seed: 0,
        }
    }

    /// Drops this share of best-effort datagrams, decided by a seeded RNG.
    pub fn with_best_effort_loss(mut self, loss: f64, seed: u64) -> Self {
        self.best_effort_loss = if loss.is_finite() {
            loss.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.seed = seed;
        self
    }

    /// Adds a peer sitting in `team`, slot `slot`.
    pub fn player(self, id: PeerId, name: &str, team: Team, slot: u8) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(SLOT_METADATA_KEY.to_string(), format!("{}_{}", team, slot));
        metadata.insert(NAME_METADATA_KEY.to_string(), name.to_string());
        self.peer_with_metadata(id, metadata)
    }

    /// Adds a peer without a slot (spectator).
    pub fn spectator(self, id: PeerId, name: &str) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(NAME_METADATA_KEY.to_string(), name.to_string());
        self.peer_with_metadata(id, metadata)
    }

    pub fn peer_with_metadata(mut self, id: PeerId, metadata: HashMap<String, String>) -> Self {
        self.profiles.retain(|p| p.id != id);
        self.profiles.push(PeerProfile { id, metadata });
        self
    }

    /// Creates one endpoint per peer, in the order peers were added.
    pub fn connect(self) -> Vec<LoopbackEndpoint> {
        let (departures, _) = broadcast::channel(64);

        let mut senders = HashMap::new();
        let mut receivers = Vec::new();
        for profile in &self.profiles {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(profile.id, tx);
            receivers.push(rx);
        }

        let roster: BTreeMap<PeerId, HashMap<String, String>> = self
            .profiles
            .iter()
            .map(|p| (p.id, p.metadata.clone()))
            .collect();

        info!("Loopback network connecting {} peers", self.profiles.len());

        self.profiles
            .iter()
            .zip(receivers)
            .enumerate()
            .map(|(i, (profile, inbox))| LoopbackEndpoint {
                local: profile.id,
                inbox,
                pending: VecDeque::new(),
                links: senders.clone(),
                roster: roster.clone(),
                departures_tx: departures.clone(),
                departures: departures.subscribe(),
                best_effort_loss: self.best_effort_loss,
                rng: StdRng::seed_from_u64(self.seed.wrapping_add(i as u64)),
                stats: LinkStats::default(),
            })
            .collect()
    }
}

/// One peer's view of a [`LoopbackNetwork`].
pub struct LoopbackEndpoint {
    local: PeerId,
    inbox: mpsc::UnboundedReceiver<Datagram>,
    pending: VecDeque<Datagram>,
    links: HashMap<PeerId, mpsc::UnboundedSender<Datagram>>,
    roster: BTreeMap<PeerId, HashMap<String, String>>,
    departures_tx: broadcast::Sender<PeerId>,
    departures: broadcast::Receiver<PeerId>,
    best_effort_loss: f64,
    rng: StdRng,
    stats: LinkStats,
}

impl LoopbackEndpoint {
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Leaves the session; every other endpoint sees a departure.
    pub fn leave(self) {
        info!("Peer {} leaving the session", self.local);
        if self.departures_tx.send(self.local).is_err() {
            debug!("No peers left to notify about {}", self.local);
        }
    }

    fn pull(&mut self) {
        while let Ok(datagram) = self.inbox.try_recv() {
            self.pending.push_back(datagram);
        }
    }
}

impl Transport for LoopbackEndpoint {
    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn is_packet_available(&mut self) -> bool {
        self.pull();
        !self.pending.is_empty()
    }

    fn read_packet(&mut self) -> Option<Datagram> {
        if self.pending.is_empty() {
            self.pull();
        }
        let datagram = self.pending.pop_front()?;
        self.stats.received += 1;
        Some(datagram)
    }

    fn send_packet(
        &mut self,
        target: PeerId,
        data: &[u8],
        delivery: Delivery,
    ) -> Result<(), TransportError> {
        let link = self
            .links
            .get(&target)
            .ok_or(TransportError::UnknownPeer(target))?;

        if delivery == Delivery::BestEffort
            && self.best_effort_loss > 0.0
            && self.rng.gen_bool(self.best_effort_loss)
        {
            self.stats.dropped += 1;
            return Ok(());
        }

        link.send((data.to_vec(), self.local))
            .map_err(|_| TransportError::Disconnected(target))?;
        self.stats.sent += 1;
        Ok(())
    }
}

impl Membership for LoopbackEndpoint {
    fn list_peers(&self) -> Vec<PeerId> {
        self.roster.keys().copied().collect()
    }

    fn peer_metadata(&self, peer: PeerId, key: &str) -> Option<String> {
        self.roster.get(&peer)?.get(key).cloned()
    }

    fn take_departed(&mut self) -> Vec<PeerId> {
        let mut departed = Vec::new();
        loop {
            match self.departures.try_recv() {
                Ok(peer) => {
                    if peer == self.local || self.roster.remove(&peer).is_none() {
                        continue;
                    }
                    self.links.remove(&peer);
                    departed.push(peer);
                }
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!("Peer {} missed {} departure notices", self.local, missed);
                }
                Err(_) => break,
            }
        }
        departed
    }
}
