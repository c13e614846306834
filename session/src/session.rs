//! Per-process session
//!
//! Every process in a match owns one [`Session`]. It runs the packet
//! dispatcher, keeps the local copy of which bases stand, smooths remote
//! ships and drives the local player's respawn. The process whose peer id
//! equals the host id additionally owns a [`HostAuthority`] and answers
//! hit, death, base and respawn reports with authoritative broadcasts.
//!
//! Authoritative packets are accepted only when they come from the host, and
//! the host hears its own broadcasts through the loopback queue, so every
//! process (host included) updates its view through the same handlers.

use crate::authority::{HostAuthority, Outcome};
use crate::config::SessionConfig;
use crate::dispatch::{DispatchStats, Dispatcher, Inbound, Outbox, Target};
use crate::replication::{RemoteEntities, ShipState, Shot};
use crate::respawn::{RespawnCoordinator, RespawnState};
use crate::transport::{Membership, Transport};
use arena_shared::{
    BaseHit, BaseStateChanged, GameEnd, Packet, PacketTag, PeerId, PlayerDied, PlayerHit,
    PlayerRecord, PlayerRespawned, ShootEvent, SlotAssignment, SpawnEvent, Team,
    NAME_METADATA_KEY, NO_PEER, SLOT_METADATA_KEY,
};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::Instant;

/// Something the rendering side should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RemoteShot(ShootEvent),
    AsteroidSpawned(SpawnEvent),
    BaseChanged { team: Team, alive: bool },
    PeerLeft(PeerId),
    Respawned,
    GameEnded { winning_team: Option<Team> },
}

/// Health and team of the ship this process owns.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPlayer {
    pub peer_id: PeerId,
    pub team: Option<Team>,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
}

impl LocalPlayer {
    fn new(peer_id: PeerId, max_health: f32) -> Self {
        Self {
            peer_id,
            team: None,
            health: max_health,
            max_health,
            alive: true,
        }
    }
}

pub type GameEndCallback = Box<dyn FnMut(Option<Team>, &[PlayerRecord])>;

/// Everything the packet handlers may touch.
pub struct SessionState {
    local: PeerId,
    host: PeerId,
    player: LocalPlayer,
    bases: HashMap<Team, bool>,
    remotes: RemoteEntities,
    respawn: RespawnCoordinator,
    authority: Option<HostAuthority>,
    final_result: Option<GameEnd>,
    events: Vec<SessionEvent>,
    callbacks: Vec<GameEndCallback>,
}

impl SessionState {
    fn is_base_alive(&self, team: Team) -> bool {
        self.bases.get(&team).copied().unwrap_or(false)
    }

    fn local_base_alive(&self) -> bool {
        self.player
            .team
            .map_or(false, |team| self.is_base_alive(team))
    }

    fn from_host(&self, inbound: &Inbound) -> bool {
        if inbound.from == self.host {
            return true;
        }
        warn!(
            "Ignoring {:?} from non-host peer {}",
            inbound.packet.tag(),
            inbound.from
        );
        false
    }

    fn queue_outcomes(&self, outcomes: Vec<Outcome>, outbox: &mut Outbox) {
        for outcome in outcomes {
            match outcome {
                Outcome::BaseChanged { team, alive } => {
                    outbox.send(
                        Target::All,
                        Packet::BaseStateChanged(BaseStateChanged { team, alive }),
                    );
                }
                Outcome::GameEnded(result) => {
                    let stats = self
                        .authority
                        .as_ref()
                        .map(|a| a.all_stats())
                        .unwrap_or_default();
                    outbox.send(
                        Target::All,
                        Packet::GameEnd(GameEnd {
                            winning_team: result.winner,
                            stats,
                        }),
                    );
                }
            }
        }
    }
}

fn on_player_state(state: &mut SessionState, inbound: &Inbound, _: &mut Outbox) {
    if let Packet::PlayerState(m) = &inbound.packet {
        state.remotes.apply(inbound.from, m);
    }
}

fn on_shoot(state: &mut SessionState, inbound: &Inbound, _: &mut Outbox) {
    let Packet::ShootEvent(m) = &inbound.packet else {
        return;
    };
    if inbound.from == state.local || m.peer_id != inbound.from {
        return;
    }
    if !state.remotes.contains(inbound.from) {
        debug!("Shot from unseen peer {} dropped", inbound.from);
        return;
    }
    state.events.push(SessionEvent::RemoteShot(*m));
}

fn on_base_state(state: &mut SessionState, inbound: &Inbound, _: &mut Outbox) {
    let Packet::BaseStateChanged(m) = &inbound.packet else {
        return;
    };
    if !state.from_host(inbound) {
        return;
    }

    let previous = state.bases.get(&m.team).copied();
    if m.alive {
        if previous == Some(false) {
            warn!("Rejecting base revival for team {}", m.team);
            return;
        }
        if previous.is_none() {
            state.bases.insert(m.team, true);
            state.events.push(SessionEvent::BaseChanged {
                team: m.team,
                alive: true,
            });
        }
        return;
    }

    if previous == Some(false) {
        return;
    }
    info!("Base of team {} is down", m.team);
    state.bases.insert(m.team, false);
    state.events.push(SessionEvent::BaseChanged {
        team: m.team,
        alive: false,
    });
    if state.player.team == Some(m.team) {
        state.respawn.on_base_lost();
    }
}

fn on_spawn(state: &mut SessionState, inbound: &Inbound, _: &mut Outbox) {
    let Packet::SpawnEvent(m) = &inbound.packet else {
        return;
    };
    if state.from_host(inbound) {
        state.events.push(SessionEvent::AsteroidSpawned(*m));
    }
}

fn on_game_end(state: &mut SessionState, inbound: &Inbound, _: &mut Outbox) {
    let Packet::GameEnd(m) = &inbound.packet else {
        return;
    };
    if !state.from_host(inbound) {
        return;
    }
    if state.final_result.is_some() {
        debug!("Duplicate game end ignored");
        return;
    }

    info!(
        "Game ended, winning team {:?}, {} records",
        m.winning_team,
        m.stats.len()
    );
    for callback in state.callbacks.iter_mut() {
        callback(m.winning_team, &m.stats);
    }
    state.final_result = Some(m.clone());
    state.events.push(SessionEvent::GameEnded {
        winning_team: m.winning_team,
    });
}

fn on_player_hit(state: &mut SessionState, inbound: &Inbound, _: &mut Outbox) {
    let (Packet::PlayerHit(m), Some(authority)) = (&inbound.packet, state.authority.as_mut())
    else {
        return;
    };
    authority.player_hit(inbound.from, m.peer_id, m.damage);
}

fn on_player_died(state: &mut SessionState, inbound: &Inbound, outbox: &mut Outbox) {
    let (Packet::PlayerDied(m), Some(authority)) = (&inbound.packet, state.authority.as_mut())
    else {
        return;
    };
    let killer = (m.killer != NO_PEER).then_some(m.killer);
    let outcomes = authority.player_died(inbound.from, killer, m.victim_max_health);
    state.queue_outcomes(outcomes, outbox);
}

fn on_base_hit(state: &mut SessionState, inbound: &Inbound, outbox: &mut Outbox) {
    let (Packet::BaseHit(m), Some(authority)) = (&inbound.packet, state.authority.as_mut())
    else {
        return;
    };
    let outcomes = authority.base_hit(m.team, inbound.from, m.damage);
    state.queue_outcomes(outcomes, outbox);
}

fn on_player_respawned(state: &mut SessionState, inbound: &Inbound, _: &mut Outbox) {
    let (Packet::PlayerRespawned(m), Some(authority)) =
        (&inbound.packet, state.authority.as_mut())
    else {
        return;
    };
    if m.peer_id != inbound.from {
        debug!("Respawn for {} relayed by {} ignored", m.peer_id, inbound.from);
        return;
    }
    authority.player_respawned(inbound.from);
}

/// One process's participation in a match.
pub struct Session {
    dispatcher: Dispatcher<SessionState>,
    state: SessionState,
    started: bool,
    last_tick: Option<Instant>,
}

impl Session {
    pub fn new(local: PeerId, host: PeerId, config: SessionConfig) -> Self {
        let config = config.sanitized();
        let is_host = local == host;

        let mut dispatcher = Dispatcher::new(local);
        dispatcher.register(PacketTag::PlayerState, on_player_state);
        dispatcher.register(PacketTag::ShootEvent, on_shoot);
        dispatcher.register(PacketTag::BaseStateChanged, on_base_state);
        dispatcher.register(PacketTag::SpawnEvent, on_spawn);
        dispatcher.register(PacketTag::GameEnd, on_game_end);
        if is_host {
            dispatcher.register(PacketTag::PlayerHit, on_player_hit);
            dispatcher.register(PacketTag::PlayerDied, on_player_died);
            dispatcher.register(PacketTag::BaseHit, on_base_hit);
            dispatcher.register(PacketTag::PlayerRespawned, on_player_respawned);
        }

        let state = SessionState {
            local,
            host,
            player: LocalPlayer::new(local, config.player_max_health),
            bases: HashMap::new(),
            remotes: RemoteEntities::new(local, config.replication_smoothing),
            respawn: RespawnCoordinator::new(config.respawn_delay),
            authority: is_host.then(|| HostAuthority::new(config.clone())),
            final_result: None,
            events: Vec::new(),
            callbacks: Vec::new(),
        };

        Self {
            dispatcher,
            state,
            started: false,
            last_tick: None,
        }
    }

    pub fn local_peer(&self) -> PeerId {
        self.state.local
    }

    pub fn host_peer(&self) -> PeerId {
        self.state.host
    }

    pub fn is_host(&self) -> bool {
        self.state.authority.is_some()
    }

    pub fn local_player(&self) -> &LocalPlayer {
        &self.state.player
    }

    pub fn respawn_state(&self) -> RespawnState {
        self.state.respawn.state()
    }

    pub fn authority(&self) -> Option<&HostAuthority> {
        self.state.authority.as_ref()
    }

    /// Reads the local slot and, on the host, registers the roster and announces every base.
    pub fn start<N>(&mut self, net: &mut N)
    where
        N: Transport + Membership + ?Sized,
    {
        if self.started {
            return;
        }
        self.started = true;

        self.state.player.team = net
            .peer_metadata(self.state.local, SLOT_METADATA_KEY)
            .and_then(|raw| SlotAssignment::parse(&raw))
            .map(|slot| slot.team);
        match self.state.player.team {
            Some(team) => info!("Peer {} playing for team {}", self.state.local, team),
            None => info!("Peer {} has no slot, spectating", self.state.local),
        }

        let Some(authority) = self.state.authority.as_mut() else {
            return;
        };
        let mut outcomes = Vec::new();
        for peer in net.list_peers() {
            let Some(slot) = net
                .peer_metadata(peer, SLOT_METADATA_KEY)
                .and_then(|raw| SlotAssignment::parse(&raw))
            else {
                debug!("Peer {} has no team slot", peer);
                continue;
            };
            let name = net
                .peer_metadata(peer, NAME_METADATA_KEY)
                .unwrap_or_else(|| format!("Player {}", peer));
            outcomes.extend(authority.register_player(peer, &name, slot.team));
        }

        let mut outbox = Outbox::new();
        self.state.queue_outcomes(outcomes, &mut outbox);
        self.dispatcher.flush(net, &mut outbox);
    }

    /// Handles departures and every buffered packet. Returns the number of packets consumed.
    pub fn poll<N>(&mut self, net: &mut N) -> usize
    where
        N: Transport + Membership + ?Sized,
    {
        for peer in net.take_departed() {
            self.handle_departure(net, peer);
        }
        self.dispatcher.poll(net, &mut self.state)
    }

    /// Polls the network, advances remote ships and fires a due respawn.
    pub fn tick<N>(&mut self, net: &mut N, now: Instant)
    where
        N: Transport + Membership + ?Sized,
    {
        self.poll(net);

        if let Some(last) = self.last_tick {
            let dt = now.saturating_duration_since(last).as_secs_f32();
            self.state.remotes.advance(dt);
        }
        self.last_tick = Some(now);

        let base_alive = self.state.local_base_alive();
        if self.state.respawn.poll(now, base_alive) && !self.is_finished() {
            let player = &mut self.state.player;
            player.health = player.max_health;
            player.alive = true;
            info!("Peer {} respawned", player.peer_id);
            self.state.events.push(SessionEvent::Respawned);
            self.send_to_host(
                net,
                Packet::PlayerRespawned(PlayerRespawned {
                    peer_id: self.state.local,
                }),
            );
        }
    }

    /// Sends the local ship's pose to every other peer.
    pub fn replicate<N>(&mut self, net: &mut N, ship: &ShipState)
    where
        N: Transport + Membership + ?Sized,
    {
        let packet = Packet::PlayerState(ship.to_packet(self.state.local));
        let delivery = packet.delivery();
        self.dispatcher.send(net, Target::AllExceptSelf, &packet, delivery);
    }

    pub fn report_shot<N>(&mut self, net: &mut N, shot: &Shot)
    where
        N: Transport + Membership + ?Sized,
    {
        let packet = Packet::ShootEvent(shot.to_packet(self.state.local));
        let delivery = packet.delivery();
        self.dispatcher.send(net, Target::AllExceptSelf, &packet, delivery);
    }

    /// Applies damage to the local ship and reports it to the host.
    ///
    /// Returns true when this hit killed the local player.
    pub fn report_hit<N>(
        &mut self,
        net: &mut N,
        attacker: Option<PeerId>,
        damage: f32,
        now: Instant,
    ) -> bool
    where
        N: Transport + Membership + ?Sized,
    {
        if self.is_finished()
            || self.state.player.team.is_none()
            || !self.state.player.alive
            || !damage.is_finite()
            || damage <= 0.0
        {
            return false;
        }
        let attacker = attacker.filter(|a| *a != NO_PEER && *a != self.state.local);

        if let Some(attacker) = attacker {
            self.send_to_host(
                net,
                Packet::PlayerHit(PlayerHit {
                    peer_id: attacker,
                    damage,
                }),
            );
        }

        let player = &mut self.state.player;
        player.health = (player.health - damage).max(0.0);
        if player.health > 0.0 {
            return false;
        }

        player.alive = false;
        let max_health = player.max_health;
        info!("Peer {} died, killer {:?}", self.state.local, attacker);
        self.send_to_host(
            net,
            Packet::PlayerDied(PlayerDied {
                killer: attacker.unwrap_or(NO_PEER),
                victim_max_health: max_health,
            }),
        );
        let base_alive = self.state.local_base_alive();
        self.state.respawn.on_death(now, base_alive);
        true
    }

    /// Reports damage the local ship dealt to another team's base.
    pub fn report_base_hit<N>(&mut self, net: &mut N, team: Team, damage: f32)
    where
        N: Transport + Membership + ?Sized,
    {
        if self.is_finished() || self.state.player.team == Some(team) {
            return;
        }
        if !self.state.is_base_alive(team) {
            debug!("Base of team {} already gone", team);
            return;
        }
        self.send_to_host(net, Packet::BaseHit(BaseHit { team, damage }));
    }

    /// Host only: announces an asteroid to everyone, this process included.
    pub fn spawn_asteroid<N>(&mut self, net: &mut N, spawn: SpawnEvent) -> bool
    where
        N: Transport + Membership + ?Sized,
    {
        if !self.is_host() {
            warn!("Only the host spawns asteroids");
            return false;
        }
        let packet = Packet::SpawnEvent(spawn);
        let delivery = packet.delivery();
        self.dispatcher.send(net, Target::All, &packet, delivery) > 0
    }

    pub fn is_team_base_alive(&self, team: Team) -> bool {
        self.state.is_base_alive(team)
    }

    /// Final standings once the game ended, the host's live records before that.
    pub fn all_stats(&self) -> Vec<PlayerRecord> {
        if let Some(result) = &self.state.final_result {
            return result.stats.clone();
        }
        self.state
            .authority
            .as_ref()
            .map(|a| a.all_stats())
            .unwrap_or_default()
    }

    /// Registers a callback for the end of the game. Runs at once if the game already ended.
    pub fn on_game_end<F>(&mut self, mut callback: F)
    where
        F: FnMut(Option<Team>, &[PlayerRecord]) + 'static,
    {
        if let Some(result) = &self.state.final_result {
            callback(result.winning_team, &result.stats);
        }
        self.state.callbacks.push(Box::new(callback));
    }

    pub fn game_result(&self) -> Option<&GameEnd> {
        self.state.final_result.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.state.final_result.is_some()
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.state.events)
    }

    pub fn remote_entities(&self) -> &RemoteEntities {
        &self.state.remotes
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    fn send_to_host<N>(&mut self, net: &mut N, packet: Packet)
    where
        N: Transport + Membership + ?Sized,
    {
        let delivery = packet.delivery();
        let host = self.state.host;
        if self.dispatcher.send(net, Target::Peer(host), &packet, delivery) == 0 {
            warn!("Could not reach host {} with {:?}", host, packet.tag());
        }
    }

    fn handle_departure<N>(&mut self, net: &mut N, peer: PeerId)
    where
        N: Transport + Membership + ?Sized,
    {
        info!("Peer {} left the session", peer);
        self.state.remotes.remove(peer);
        self.state.events.push(SessionEvent::PeerLeft(peer));
        if peer == self.state.host {
            warn!("Host {} left, no further authoritative updates", peer);
        }

        let Some(authority) = self.state.authority.as_mut() else {
            return;
        };
        let outcomes = authority.peer_left(peer);
        let mut outbox = Outbox::new();
        self.state.queue_outcomes(outcomes, &mut outbox);
        self.dispatcher.flush(net, &mut outbox);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{LoopbackEndpoint, LoopbackNetwork};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn setup() -> (Vec<LoopbackEndpoint>, Vec<Session>) {
        let mut nets = LoopbackNetwork::new()
            .player(1, "Host", 1, 1)
            .player(2, "Guest", 2, 1)
            .connect();
        let mut sessions = vec![
            Session::new(1, 1, SessionConfig::default()),
            Session::new(2, 1, SessionConfig::default()),
        ];
        for (session, net) in sessions.iter_mut().zip(nets.iter_mut()) {
            session.start(net);
        }
        pump(&mut nets, &mut sessions);
        (nets, sessions)
    }

    fn pump(nets: &mut [LoopbackEndpoint], sessions: &mut [Session]) {
        for _ in 0..4 {
            for (session, net) in sessions.iter_mut().zip(nets.iter_mut()) {
                session.poll(net);
            }
        }
    }

    #[test]
    fn test_start_announces_bases() {
        let (_nets, sessions) = setup();
        for session in &sessions {
            assert!(session.is_team_base_alive(1));
            assert!(session.is_team_base_alive(2));
            assert!(!session.is_team_base_alive(3));
        }
        assert!(sessions[0].is_host());
        assert!(!sessions[1].is_host());
        assert_eq!(sessions[1].local_player().team, Some(2));
    }

    #[test]
    fn test_replication_and_shots() {
        let (mut nets, mut sessions) = setup();
        let ship = ShipState {
            pos_x: 5.0,
            pos_y: 6.0,
            alive: true,
            ..ShipState::default()
        };
        sessions[1].replicate(&mut nets[1], &ship);
        sessions[1].report_shot(&mut nets[1], &Shot::default());
        sessions[0].poll(&mut nets[0]);

        let remote = sessions[0].remote_entities().get(2).unwrap();
        assert_eq!((remote.x, remote.y), (5.0, 6.0));
        let events = sessions[0].take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::RemoteShot(s) if s.peer_id == 2)));
    }

    #[test]
    fn test_spawn_asteroid_host_only() {
        let (mut nets, mut sessions) = setup();
        let spawn = SpawnEvent {
            pos_x: 1.0,
            pos_y: 2.0,
            dir_x: 0.0,
            dir_y: 1.0,
        };
        assert!(!sessions[1].spawn_asteroid(&mut nets[1], spawn));
        assert!(sessions[0].spawn_asteroid(&mut nets[0], spawn));
        pump(&mut nets, &mut sessions);

        for session in sessions.iter_mut() {
            let events = session.take_events();
            assert!(events.contains(&SessionEvent::AsteroidSpawned(spawn)));
        }
    }

    #[test]
    fn test_forged_authoritative_packets_ignored() {
        let (mut nets, mut sessions) = setup();
        let forged = Packet::BaseStateChanged(BaseStateChanged {
            team: 1,
            alive: false,
        })
        .encode()
        .unwrap();
        nets[1]
            .send_packet(1, &forged, arena_shared::Delivery::Guaranteed)
            .unwrap();
        sessions[0].poll(&mut nets[0]);
        assert!(sessions[0].is_team_base_alive(1));
    }

    #[test]
    fn test_death_and_respawn() {
        let (mut nets, mut sessions) = setup();
        let now = Instant::now();

        assert!(!sessions[1].report_hit(&mut nets[1], Some(1), 10.0, now));
        assert!(sessions[1].report_hit(&mut nets[1], Some(1), 25.0, now));
        assert!(!sessions[1].local_player().alive);
        pump(&mut nets, &mut sessions);

        let host = sessions[0].authority().unwrap();
        assert_eq!(host.stats().record(1).unwrap().kills, 1);
        assert_eq!(host.stats().record(2).unwrap().deaths, 1);

        sessions[1].tick(&mut nets[1], now + Duration::from_secs(5));
        assert!(sessions[1].local_player().alive);
        assert_eq!(sessions[1].local_player().health, 30.0);
        pump(&mut nets, &mut sessions);
        assert!(sessions[0].authority().unwrap().stats().is_alive(2));
    }

    #[test]
    fn test_game_end_callback_runs_once() {
        let (mut nets, mut sessions) = setup();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        sessions[1].on_game_end(move |winner, stats| {
            sink.borrow_mut().push((winner, stats.len()));
        });

        sessions[1].report_base_hit(&mut nets[1], 1, 30.0);
        pump(&mut nets, &mut sessions);
        assert!(!sessions[1].is_team_base_alive(1));
        assert!(sessions[0].report_hit(&mut nets[0], Some(2), 30.0, Instant::now()));
        pump(&mut nets, &mut sessions);

        assert_eq!(calls.borrow().as_slice(), &[(Some(2), 2)]);
        let result = sessions[1].game_result().unwrap();
        assert_eq!(result.winning_team, Some(2));

        let replay = Packet::GameEnd(result.clone()).encode().unwrap();
        nets[0]
            .send_packet(2, &replay, arena_shared::Delivery::Guaranteed)
            .unwrap();
        pump(&mut nets, &mut sessions);
        assert_eq!(calls.borrow().len(), 1);
    }
}
