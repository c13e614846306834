//! Per-player statistics kept by the host
//!
//! Damage is tracked twice: as a running total on the attacker's record and as
//! a sparse `(attacker, victim)` contribution used to award assists. A victim's
//! contributions are wiped the moment they die, so assists only count damage
//! dealt during the life that just ended.

use arena_shared::{PeerId, PlayerRecord, Team};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

/// Whether a kill eliminated a player whose base was already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillKind {
    Regular,
    Final,
}

#[derive(Debug, Clone)]
pub struct StatsAggregator {
    assist_threshold: f32,
    records: BTreeMap<PeerId, PlayerRecord>,
    contributions: HashMap<(PeerId, PeerId), f32>,
}

impl StatsAggregator {
    pub fn new(assist_threshold: f32) -> Self {
        Self {
            assist_threshold,
            records: BTreeMap::new(),
            contributions: HashMap::new(),
        }
    }

    /// Creates a record for `peer`. Returns false if one already exists.
    pub fn register(&mut self, peer: PeerId, name: &str, team: Team) -> bool {
        if self.records.contains_key(&peer) {
            return false;
        }
        info!("Registered player {} ({}) on team {}", peer, name, team);
        self.records.insert(peer, PlayerRecord::new(peer, name, team));
        true
    }

    pub fn is_registered(&self, peer: PeerId) -> bool {
        self.records.contains_key(&peer)
    }

    pub fn record(&self, peer: PeerId) -> Option<&PlayerRecord> {
        self.records.get(&peer)
    }

    pub fn team_of(&self, peer: PeerId) -> Option<Team> {
        self.records.get(&peer).map(|r| r.team)
    }

    pub fn is_alive(&self, peer: PeerId) -> bool {
        self.records.get(&peer).map_or(false, |r| r.alive)
    }

    pub fn any_alive(&self, team: Team) -> bool {
        self.records.values().any(|r| r.team == team && r.alive)
    }

    pub fn members(&self, team: Team) -> impl Iterator<Item = &PlayerRecord> {
        self.records.values().filter(move |r| r.team == team)
    }

    pub fn contribution(&self, attacker: PeerId, victim: PeerId) -> f32 {
        self.contributions
            .get(&(attacker, victim))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn record_damage(&mut self, attacker: PeerId, victim: PeerId, amount: f32) {
        if attacker == victim || !amount.is_finite() || amount <= 0.0 {
            return;
        }
        let Some(record) = self.records.get_mut(&attacker) else {
            debug!("Damage from unregistered peer {} ignored", attacker);
            return;
        };
        record.total_damage_dealt += amount;
        *self.contributions.entry((attacker, victim)).or_insert(0.0) += amount;
    }

    pub fn record_base_damage(&mut self, attacker: PeerId, amount: f32) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        match self.records.get_mut(&attacker) {
            Some(record) => record.total_damage_dealt += amount,
            None => debug!("Base damage from unregistered peer {} ignored", attacker),
        }
    }

    /// Credits the killer and any assisting attackers, then forgets damage on the victim.
    ///
    /// Returns the peers that earned an assist.
    pub fn record_kill(
        &mut self,
        killer: Option<PeerId>,
        victim: PeerId,
        victim_max_health: f32,
        kind: KillKind,
    ) -> Vec<PeerId> {
        let killer = killer.filter(|k| *k != victim);

        if let Some(killer) = killer {
            match self.records.get_mut(&killer) {
                Some(record) => {
                    match kind {
                        KillKind::Regular => record.kills += 1,
                        KillKind::Final => record.final_kills += 1,
                    }
                    info!("Player {} killed {} ({:?})", killer, victim, kind);
                }
                None => debug!("Kill by unregistered peer {} not credited", killer),
            }
        }

        let needed = self.assist_threshold * victim_max_health;
        let mut assisters: Vec<PeerId> = self
            .contributions
            .iter()
            .filter(|((attacker, v), dealt)| {
                *v == victim && Some(*attacker) != killer && **dealt >= needed
            })
            .map(|((attacker, _), _)| *attacker)
            .collect();
        assisters.sort_unstable();

        for attacker in &assisters {
            if let Some(record) = self.records.get_mut(attacker) {
                record.assists += 1;
                debug!("Player {} assisted on {}", attacker, victim);
            }
        }

        self.clear_contributions(victim);
        assisters
    }

    /// Returns false when the peer is unknown or already dead.
    pub fn record_death(&mut self, victim: PeerId) -> bool {
        self.clear_contributions(victim);
        match self.records.get_mut(&victim) {
            Some(record) if record.alive => {
                record.deaths += 1;
                record.alive = false;
                true
            }
            Some(_) => false,
            None => {
                debug!("Death of unregistered peer {} ignored", victim);
                false
            }
        }
    }

    /// Marks a player dead without counting a death.
    pub fn mark_dead(&mut self, peer: PeerId) {
        self.clear_contributions(peer);
        if let Some(record) = self.records.get_mut(&peer) {
            record.alive = false;
        }
    }

    pub fn record_respawn(&mut self, peer: PeerId) -> bool {
        match self.records.get_mut(&peer) {
            Some(record) => {
                record.alive = true;
                true
            }
            None => {
                debug!("Respawn of unregistered peer {} ignored", peer);
                false
            }
        }
    }

    pub fn record_base_destroyed(&mut self, destroyer: PeerId) {
        match self.records.get_mut(&destroyer) {
            Some(record) => {
                record.bases_destroyed += 1;
                info!("Player {} destroyed a base", destroyer);
            }
            None => debug!("Base kill by unregistered peer {} not credited", destroyer),
        }
    }

    /// Sets each record's placement from its team. Teams missing from the map keep theirs.
    pub fn apply_placements(&mut self, placements: &HashMap<Team, u32>) {
        for record in self.records.values_mut() {
            if let Some(place) = placements.get(&record.team) {
                record.placement = *place;
            }
        }
    }

    /// Every record, placed players first by placement, then by peer id.
    pub fn all(&self) -> Vec<PlayerRecord> {
        let mut all: Vec<PlayerRecord> = self.records.values().cloned().collect();
        all.sort_by_key(|r| (r.placement == 0, r.placement, r.peer_id));
        all
    }

    fn clear_contributions(&mut self, victim: PeerId) {
        self.contributions.retain(|(_, v), _| *v != victim);
    }
}
