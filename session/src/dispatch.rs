//! Inbound packet routing and outbound fan-out
//!
//! A [`Dispatcher`] drains whatever the transport has buffered, decodes each
//! datagram and hands it to the handler registered for its tag. Handlers get
//! mutable access to a caller-owned context and an [`Outbox`] for replies;
//! the dispatcher flushes the outbox as soon as the handler returns.
//!
//! Packets addressed to the local peer (including the local copy of an
//! [`Target::All`] broadcast) go through an in-process loopback queue and are
//! handled exactly like remote ones, so the host reacts to its own
//! authoritative broadcasts through the same code path as everyone else.

use crate::transport::{Membership, Transport};
use arena_shared::{CodecError, Delivery, Packet, PacketTag, PeerId};
use log::{debug, error, warn};
use std::collections::{HashMap, VecDeque};

/// Upper bound on datagrams handled by a single `poll`.
pub const MAX_PACKETS_PER_POLL: usize = 4096;

/// Who an outbound packet is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    AllExceptSelf,
    /// Every peer, the sender included (via loopback).
    All,
    Peer(PeerId),
}

/// A decoded packet and the peer that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub from: PeerId,
    pub packet: Packet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub target: Target,
    pub packet: Packet,
    pub delivery: Delivery,
}

/// Packets queued by a handler, sent once it returns.
#[derive(Debug, Default)]
pub struct Outbox {
    queued: Vec<Outgoing>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a packet with the delivery mode its kind calls for.
    pub fn send(&mut self, target: Target, packet: Packet) {
        let delivery = packet.delivery();
        self.send_with(target, packet, delivery);
    }

    pub fn send_with(&mut self, target: Target, packet: Packet, delivery: Delivery) {
        self.queued.push(Outgoing {
            target,
            packet,
            delivery,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn drain(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.queued)
    }
}

/// Running counters for one dispatcher.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub dispatched: u64,
    pub unhandled: u64,
    pub dropped_malformed: u64,
    pub dropped_unknown: u64,
    pub sent: u64,
    pub send_failures: u64,
}

pub type Handler<C> = Box<dyn FnMut(&mut C, &Inbound, &mut Outbox)>;

pub struct Dispatcher<C> {
    local: PeerId,
    handlers: HashMap<PacketTag, Handler<C>>,
    loopback: VecDeque<Vec<u8>>,
    stats: DispatchStats,
}

impl<C> Dispatcher<C> {
    pub fn new(local: PeerId) -> Self {
        Self {
            local,
            handlers: HashMap::new(),
            loopback: VecDeque::new(),
            stats: DispatchStats::default(),
        }
    }

    pub fn local_peer(&self) -> PeerId {
        self.local
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Registers the handler for `tag`, returning true if one was replaced.
    pub fn register<F>(&mut self, tag: PacketTag, handler: F) -> bool
    where
        F: FnMut(&mut C, &Inbound, &mut Outbox) + 'static,
    {
        self.handlers.insert(tag, Box::new(handler)).is_some()
    }

    pub fn has_handler(&self, tag: PacketTag) -> bool {
        self.handlers.contains_key(&tag)
    }

    /// Handles everything currently buffered, returning the number of datagrams consumed.
    pub fn poll<N>(&mut self, net: &mut N, ctx: &mut C) -> usize
    where
        N: Transport + Membership + ?Sized,
    {
        let mut processed = 0;
        while processed < MAX_PACKETS_PER_POLL {
            let (data, from) = match self.loopback.pop_front() {
                Some(data) => (data, self.local),
                None => match net.read_packet() {
                    Some(datagram) => datagram,
                    None => break,
                },
            };
            processed += 1;
            self.dispatch_raw(net, ctx, &data, from);
        }

        if processed == MAX_PACKETS_PER_POLL
            && (!self.loopback.is_empty() || net.is_packet_available())
        {
            warn!(
                "Peer {} hit the per-poll limit of {} packets, deferring the rest",
                self.local, MAX_PACKETS_PER_POLL
            );
        }

        processed
    }

    /// Decodes one datagram and runs its handler.
    pub fn dispatch_raw<N>(&mut self, net: &mut N, ctx: &mut C, data: &[u8], from: PeerId)
    where
        N: Transport + Membership + ?Sized,
    {
        self.stats.received += 1;

        let packet = match Packet::decode(data) {
            Ok(packet) => packet,
            Err(e @ (CodecError::UnknownTag(_) | CodecError::Empty)) => {
                self.stats.dropped_unknown += 1;
                warn!("Dropping packet from peer {}: {}", from, e);
                return;
            }
            Err(e) => {
                self.stats.dropped_malformed += 1;
                warn!("Dropping packet from peer {}: {}", from, e);
                return;
            }
        };

        let tag = packet.tag();
        let inbound = Inbound { from, packet };
        let mut outbox = Outbox::new();

        match self.handlers.get_mut(&tag) {
            Some(handler) => {
                handler(ctx, &inbound, &mut outbox);
                self.stats.dispatched += 1;
            }
            None => {
                self.stats.unhandled += 1;
                debug!("No handler for {:?} from peer {}", tag, from);
                return;
            }
        }

        self.flush(net, &mut outbox);
    }

    /// Sends every packet queued on `outbox`.
    pub fn flush<N>(&mut self, net: &mut N, outbox: &mut Outbox)
    where
        N: Transport + Membership + ?Sized,
    {
        for outgoing in outbox.drain() {
            self.send(net, outgoing.target, &outgoing.packet, outgoing.delivery);
        }
    }

    /// Encodes once and fans the packet out, returning how many peers it was handed to.
    pub fn send<N>(
        &mut self,
        net: &mut N,
        target: Target,
        packet: &Packet,
        delivery: Delivery,
    ) -> usize
    where
        N: Transport + Membership + ?Sized,
    {
        let data = match packet.encode() {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to encode {:?}: {}", packet.tag(), e);
                self.stats.send_failures += 1;
                return 0;
            }
        };

        let recipients: Vec<PeerId> = match target {
            Target::Peer(peer) => vec![peer],
            Target::All | Target::AllExceptSelf => net
                .list_peers()
                .into_iter()
                .filter(|peer| *peer != self.local)
                .collect(),
        };

        let mut delivered = 0;
        for peer in recipients {
            if peer == self.local {
                self.loopback.push_back(data.clone());
                delivered += 1;
                continue;
            }
            match net.send_packet(peer, &data, delivery) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    self.stats.send_failures += 1;
                    warn!("Failed to send {:?} to peer {}: {}", packet.tag(), peer, e);
                }
            }
        }

        if target == Target::All {
            self.loopback.push_back(data);
            delivered += 1;
        }

        self.stats.sent += delivered as u64;
        delivered
    }

    /// Packets waiting on the local loopback queue.
    pub fn pending_loopback(&self) -> usize {
        self.loopback.len()
    }
}
