//! # Arena Simulator
//!
//! Headless matches between scripted bots. Every bot owns a full
//! [`Session`] on an in-memory [`LoopbackNetwork`]; peer 1 hosts. Bots fly a
//! random walk, shoot at each other, report the hits they take and chip away
//! at enemy bases until the host declares a winner or the tick limit runs out.
//!
//! Time is virtual: each step advances a fixed tick duration, so a run is
//! reproducible for a given seed no matter how fast the machine is.

use arena_session::{LoopbackEndpoint, LoopbackNetwork, Session, SessionConfig, ShipState, Shot};
use arena_shared::{placement_label, PeerId, PlayerRecord, SpawnEvent, Team};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};

/// Parameters for one simulated match.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub teams: u32,
    pub players_per_team: u32,
    pub tick_rate: u32,
    pub max_ticks: u64,
    /// Probability of dropping a best-effort datagram.
    pub loss: f64,
    pub seed: u64,
    /// Tick at which one random non-host peer disconnects.
    pub leave_after: Option<u64>,
    /// Per tick, per bot.
    pub hit_chance: f64,
    pub base_hit_chance: f64,
    pub asteroid_chance: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            teams: 3,
            players_per_team: 2,
            tick_rate: 60,
            max_ticks: 60 * 60 * 5,
            loss: 0.0,
            seed: 1,
            leave_after: None,
            hit_chance: 0.02,
            base_hit_chance: 0.02,
            asteroid_chance: 0.005,
        }
    }
}

/// Lobby slots are a single byte on the wire.
pub const MAX_PLAYERS_PER_TEAM: u32 = u8::MAX as u32;

impl SimConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    /// Virtual time elapsed after `tick` ticks.
    pub fn elapsed_at(&self, tick: u64) -> Duration {
        Duration::from_secs_f64(tick as f64 / f64::from(self.tick_rate.max(1)))
    }

    /// Players actually seated per team.
    pub fn seats_per_team(&self) -> u8 {
        self.players_per_team.clamp(1, MAX_PLAYERS_PER_TEAM) as u8
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SimReport {
    pub ticks: u64,
    pub finished: bool,
    pub winning_team: Option<Team>,
    pub standings: Vec<PlayerRecord>,
    pub departed: Vec<PeerId>,
}

struct Bot {
    peer_id: PeerId,
    team: Team,
    session: Session,
    net: Option<LoopbackEndpoint>,
    ship: ShipState,
}

enum Action {
    Hit {
        victim: usize,
        attacker: PeerId,
        damage: f32,
    },
    BaseHit {
        attacker: usize,
        team: Team,
        damage: f32,
    },
    Asteroid(SpawnEvent),
}

pub const HOST_PEER: PeerId = 1;

pub struct Simulation {
    config: SimConfig,
    bots: Vec<Bot>,
    rng: StdRng,
    tick: u64,
    start: Instant,
    departed: Vec<PeerId>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let teams = config.teams.max(1) as Team;
        let per_team = config.seats_per_team();

        let mut network = LoopbackNetwork::new().with_best_effort_loss(config.loss, config.seed);
        let mut roster = Vec::new();
        let mut next_id: PeerId = HOST_PEER;
        for team in 1..=teams {
            for slot in 1..=per_team {
                let name = format!("Bot {}-{}", team, slot);
                network = network.player(next_id, &name, team, slot);
                roster.push((next_id, team));
                next_id += 1;
            }
        }

        let bots = roster
            .into_iter()
            .zip(network.connect())
            .map(|((peer_id, team), mut net)| {
                let mut session = Session::new(peer_id, HOST_PEER, SessionConfig::default());
                session.start(&mut net);
                Bot {
                    peer_id,
                    team,
                    session,
                    net: Some(net),
                    ship: ShipState {
                        alive: true,
                        ..ShipState::default()
                    },
                }
            })
            .collect::<Vec<_>>();

        info!(
            "Simulating {} teams of {} ({} peers), seed {}",
            teams,
            per_team,
            bots.len(),
            config.seed
        );

        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            bots,
            tick: 0,
            start: Instant::now(),
            departed: Vec::new(),
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    fn host(&self) -> Option<&Session> {
        self.bots
            .iter()
            .find(|b| b.peer_id == HOST_PEER)
            .map(|b| &b.session)
    }

    pub fn is_finished(&self) -> bool {
        self.host().map_or(true, |s| s.is_finished())
    }

    /// True once every connected peer has seen the game end.
    pub fn all_finished(&self) -> bool {
        self.bots
            .iter()
            .filter(|b| b.net.is_some())
            .all(|b| b.session.is_finished())
    }

    pub fn session(&self, peer: PeerId) -> Option<&Session> {
        self.bots
            .iter()
            .find(|b| b.peer_id == peer)
            .map(|b| &b.session)
    }

    /// Advances every bot by one tick of virtual time.
    pub fn step(&mut self) {
        self.tick += 1;
        let now = self.start + self.config.elapsed_at(self.tick);
        let dt = self.config.tick_duration().as_secs_f32();

        if Some(self.tick) == self.config.leave_after {
            self.disconnect_random_peer();
        }

        for bot in self.bots.iter_mut() {
            let Some(net) = bot.net.as_mut() else {
                continue;
            };
            bot.session.tick(net, now);
            bot.ship.alive = bot.session.local_player().alive;
        }

        if self.is_finished() {
            return;
        }

        let actions = self.plan_actions();
        for action in actions {
            self.apply(action, now);
        }

        for bot in self.bots.iter_mut() {
            let Some(net) = bot.net.as_mut() else {
                continue;
            };
            let heading = self.rng.gen_range(-0.3f32..0.3);
            bot.ship.rot += heading;
            bot.ship.vel_x = bot.ship.rot.cos() * 120.0;
            bot.ship.vel_y = bot.ship.rot.sin() * 120.0;
            bot.ship.pos_x += bot.ship.vel_x * dt;
            bot.ship.pos_y += bot.ship.vel_y * dt;
            bot.ship.emitting_trail = bot.ship.alive;
            bot.session.replicate(net, &bot.ship);
        }
    }

    fn plan_actions(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        let alive: Vec<usize> = (0..self.bots.len())
            .filter(|i| {
                let bot = &self.bots[*i];
                bot.net.is_some() && bot.session.local_player().alive
            })
            .collect();

        for &i in &alive {
            let attacker = &self.bots[i];

            if self.rng.gen_bool(self.config.hit_chance) {
                let targets: Vec<usize> = alive
                    .iter()
                    .copied()
                    .filter(|j| self.bots[*j].team != attacker.team)
                    .collect();
                if !targets.is_empty() {
                    let victim = targets[self.rng.gen_range(0..targets.len())];
                    actions.push(Action::Hit {
                        victim,
                        attacker: attacker.peer_id,
                        damage: self.rng.gen_range(4.0f32..12.0),
                    });
                }
            }

            if self.rng.gen_bool(self.config.base_hit_chance) {
                let teams: Vec<Team> = (1..=self.config.teams.max(1) as Team)
                    .filter(|t| *t != attacker.team && attacker.session.is_team_base_alive(*t))
                    .collect();
                if !teams.is_empty() {
                    actions.push(Action::BaseHit {
                        attacker: i,
                        team: teams[self.rng.gen_range(0..teams.len())],
                        damage: self.rng.gen_range(1.0f32..4.0),
                    });
                }
            }
        }

        if self.rng.gen_bool(self.config.asteroid_chance) {
            let angle = self.rng.gen_range(0.0f32..std::f32::consts::TAU);
            actions.push(Action::Asteroid(SpawnEvent {
                pos_x: self.rng.gen_range(-500.0f32..500.0),
                pos_y: self.rng.gen_range(-500.0f32..500.0),
                dir_x: angle.cos(),
                dir_y: angle.sin(),
            }));
        }

        actions
    }

    fn apply(&mut self, action: Action, now: Instant) {
        match action {
            Action::Hit {
                victim,
                attacker,
                damage,
            } => {
                if let Some(shooter) = self.bots.iter_mut().find(|b| b.peer_id == attacker) {
                    if let Some(net) = shooter.net.as_mut() {
                        let shot = Shot {
                            pos_x: shooter.ship.pos_x,
                            pos_y: shooter.ship.pos_y,
                            rot: shooter.ship.rot,
                            dir_x: shooter.ship.rot.cos(),
                            dir_y: shooter.ship.rot.sin(),
                        };
                        shooter.session.report_shot(net, &shot);
                    }
                }
                let bot = &mut self.bots[victim];
                if let Some(net) = bot.net.as_mut() {
                    if bot.session.report_hit(net, Some(attacker), damage, now) {
                        debug!("Bot {} shot down by {}", bot.peer_id, attacker);
                    }
                }
            }
            Action::BaseHit {
                attacker,
                team,
                damage,
            } => {
                let bot = &mut self.bots[attacker];
                if let Some(net) = bot.net.as_mut() {
                    bot.session.report_base_hit(net, team, damage);
                }
            }
            Action::Asteroid(spawn) => {
                if let Some(bot) = self.bots.iter_mut().find(|b| b.peer_id == HOST_PEER) {
                    if let Some(net) = bot.net.as_mut() {
                        bot.session.spawn_asteroid(net, spawn);
                    }
                }
            }
        }
    }

    fn disconnect_random_peer(&mut self) {
        let candidates: Vec<usize> = (0..self.bots.len())
            .filter(|i| self.bots[*i].peer_id != HOST_PEER && self.bots[*i].net.is_some())
            .collect();
        if candidates.is_empty() {
            warn!("No peer available to disconnect");
            return;
        }
        let index = candidates[self.rng.gen_range(0..candidates.len())];
        let bot = &mut self.bots[index];
        if let Some(net) = bot.net.take() {
            info!("Bot {} (team {}) disconnects", bot.peer_id, bot.team);
            net.leave();
            self.departed.push(bot.peer_id);
        }
    }

    /// Runs without pacing until the game ends on every peer or the tick limit is hit.
    pub fn run_to_end(&mut self) -> SimReport {
        while self.tick < self.config.max_ticks && !self.all_finished() {
            self.step();
        }
        self.report()
    }

    pub fn report(&self) -> SimReport {
        let host = self.host();
        SimReport {
            ticks: self.tick,
            finished: self.is_finished(),
            winning_team: host
                .and_then(|s| s.game_result())
                .and_then(|r| r.winning_team),
            standings: host.map(|s| s.all_stats()).unwrap_or_default(),
            departed: self.departed.clone(),
        }
    }
}

/// Runs a match paced by a real-time tick loop.
pub async fn run(config: SimConfig) -> SimReport {
    let mut ticker = interval(config.tick_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let max_ticks = config.max_ticks;
    let mut sim = Simulation::new(config);

    // First tick completes immediately
    ticker.tick().await;

    while sim.tick_count() < max_ticks && !sim.all_finished() {
        ticker.tick().await;
        sim.step();
    }

    if !sim.is_finished() {
        warn!("Tick limit of {} reached without a winner", max_ticks);
    }
    sim.report()
}

/// Human-readable scoreboard.
pub fn format_standings(report: &SimReport) -> String {
    let mut out = String::new();
    match (report.finished, report.winning_team) {
        (true, Some(team)) => {
            out.push_str(&format!("Team {} wins after {} ticks\n", team, report.ticks))
        }
        (true, None) => out.push_str(&format!("Draw after {} ticks\n", report.ticks)),
        (false, _) => out.push_str(&format!("No result after {} ticks\n", report.ticks)),
    }
    out.push_str(&format!(
        "{:<6} {:<12} {:>4} {:>5} {:>5} {:>7} {:>6} {:>5} {:>8}\n",
        "PLACE", "PLAYER", "TEAM", "KILLS", "FINAL", "ASSISTS", "DEATHS", "BASES", "DAMAGE"
    ));
    for record in &report.standings {
        out.push_str(&format!(
            "{:<6} {:<12} {:>4} {:>5} {:>5} {:>7} {:>6} {:>5} {:>8.1}\n",
            placement_label(record.placement),
            record.name,
            record.team,
            record.kills,
            record.final_kills,
            record.assists,
            record.deaths,
            record.bases_destroyed,
            record.total_damage_dealt
        ));
    }
    out
}
