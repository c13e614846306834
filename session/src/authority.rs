//! Host-side rules: the single source of truth for bases, stats and the winner
//!
//! Peers report what happened to the entities they own (hits, deaths, damage
//! dealt to a base, respawns). [`HostAuthority`] folds those reports into the
//! stats aggregator and elimination tracker and answers with [`Outcome`]s that
//! the session broadcasts to everyone.

use crate::config::SessionConfig;
use crate::elimination::{EliminationTracker, GameResult, TeamPhase};
use crate::stats::{KillKind, StatsAggregator};
use arena_shared::{PeerId, PlayerRecord, Team};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

/// An authoritative change every peer must learn about.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    BaseChanged { team: Team, alive: bool },
    GameEnded(GameResult),
}

#[derive(Debug, Clone)]
pub struct HostAuthority {
    config: SessionConfig,
    stats: StatsAggregator,
    elimination: EliminationTracker,
    base_health: HashMap<Team, f32>,
    departed: HashSet<PeerId>,
}

impl HostAuthority {
    pub fn new(config: SessionConfig) -> Self {
        let config = config.sanitized();
        Self {
            stats: StatsAggregator::new(config.assist_threshold),
            config,
            elimination: EliminationTracker::new(),
            base_health: HashMap::new(),
            departed: HashSet::new(),
        }
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn elimination(&self) -> &EliminationTracker {
        &self.elimination
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.elimination.result()
    }

    pub fn is_finished(&self) -> bool {
        self.elimination.is_finished()
    }

    pub fn is_base_alive(&self, team: Team) -> bool {
        self.elimination.is_base_alive(team)
    }

    pub fn base_health(&self, team: Team) -> Option<f32> {
        self.base_health.get(&team).copied()
    }

    /// Final standings: placed players first, then by peer id.
    pub fn all_stats(&self) -> Vec<PlayerRecord> {
        self.stats.all()
    }

    /// Ties `peer` to `team`, creating the team's base on first sight.
    pub fn register_player(&mut self, peer: PeerId, name: &str, team: Team) -> Vec<Outcome> {
        if !self.stats.register(peer, name, team) {
            return Vec::new();
        }
        if self.base_health.contains_key(&team) {
            return Vec::new();
        }
        self.elimination.register_team(team);
        self.base_health.insert(team, self.config.base_max_health);
        vec![Outcome::BaseChanged { team, alive: true }]
    }

    pub fn player_hit(&mut self, victim: PeerId, attacker: PeerId, damage: f32) {
        if self.is_finished() || self.departed.contains(&victim) {
            return;
        }
        // A hit can land after the death it caused; it belongs to the old life.
        if !self.stats.is_alive(victim) {
            debug!("Hit on dead peer {} ignored", victim);
            return;
        }
        self.stats.record_damage(attacker, victim, damage);
    }

    pub fn player_died(
        &mut self,
        victim: PeerId,
        killer: Option<PeerId>,
        victim_max_health: f32,
    ) -> Vec<Outcome> {
        if self.is_finished() || self.departed.contains(&victim) {
            return Vec::new();
        }
        let Some(team) = self.stats.team_of(victim) else {
            debug!("Death of unregistered peer {} ignored", victim);
            return Vec::new();
        };
        if !self.stats.is_alive(victim) {
            debug!("Duplicate death of peer {} ignored", victim);
            return Vec::new();
        }

        let max_health = if victim_max_health.is_finite() && victim_max_health > 0.0 {
            victim_max_health
        } else {
            self.config.player_max_health
        };
        let kind = match self.elimination.phase(team) {
            Some(TeamPhase::BaseDown) => KillKind::Final,
            _ => KillKind::Regular,
        };

        self.stats.record_kill(killer, victim, max_health, kind);
        self.stats.record_death(victim);
        self.evaluate(team)
    }

    pub fn base_hit(&mut self, team: Team, attacker: PeerId, damage: f32) -> Vec<Outcome> {
        if self.is_finished() || !damage.is_finite() || damage <= 0.0 {
            return Vec::new();
        }
        if !self.elimination.is_base_alive(team) {
            debug!("Hit on missing base of team {} ignored", team);
            return Vec::new();
        }
        if self.stats.team_of(attacker) == Some(team) {
            debug!("Peer {} hit its own base, ignored", attacker);
            return Vec::new();
        }

        self.stats.record_base_damage(attacker, damage);
        let health = self.base_health.entry(team).or_insert(0.0);
        *health = (*health - damage).max(0.0);
        if *health > 0.0 {
            return Vec::new();
        }
        self.destroy_base(team, Some(attacker))
    }

    /// Accepts a respawn only while the player's base stands.
    pub fn player_respawned(&mut self, peer: PeerId) -> bool {
        if self.is_finished() || self.departed.contains(&peer) {
            return false;
        }
        let Some(team) = self.stats.team_of(peer) else {
            return false;
        };
        if !self.elimination.is_base_alive(team) {
            warn!("Peer {} tried to respawn without a base", peer);
            return false;
        }
        self.stats.record_respawn(peer)
    }

    pub fn peer_left(&mut self, peer: PeerId) -> Vec<Outcome> {
        let Some(team) = self.stats.team_of(peer) else {
            return Vec::new();
        };
        if !self.departed.insert(peer) {
            return Vec::new();
        }
        info!("Player {} left team {}", peer, team);
        self.stats.mark_dead(peer);
        if self.is_finished() {
            return Vec::new();
        }

        let connected = self
            .stats
            .members(team)
            .any(|r| !self.departed.contains(&r.peer_id));
        let mut outcomes = Vec::new();
        if !connected && self.elimination.is_base_alive(team) {
            info!("Team {} has no players left, removing its base", team);
            outcomes.extend(self.destroy_base(team, None));
        }
        outcomes.extend(self.evaluate(team));
        outcomes
    }

    fn destroy_base(&mut self, team: Team, destroyer: Option<PeerId>) -> Vec<Outcome> {
        match self.elimination.base_destroyed(team) {
            Ok(true) => {}
            Ok(false) => return Vec::new(),
            Err(e) => {
                warn!("Cannot destroy base: {}", e);
                return Vec::new();
            }
        }
        self.base_health.insert(team, 0.0);
        if let Some(destroyer) = destroyer {
            self.stats.record_base_destroyed(destroyer);
        }

        let mut outcomes = vec![Outcome::BaseChanged { team, alive: false }];
        outcomes.extend(self.evaluate(team));
        outcomes
    }

    fn evaluate(&mut self, team: Team) -> Vec<Outcome> {
        let alive = self.stats.any_alive(team);
        match self.elimination.evaluate(team, alive) {
            Some(result) => {
                self.stats.apply_placements(&result.placements);
                vec![Outcome::GameEnded(result)]
            }
            None => Vec::new(),
        }
    }
}
