use arena_shared::{PeerId, PlayerState, ShootEvent};
use log::{debug, info};
use std::collections::HashMap;

/// Pose of the locally owned ship, as handed in by the physics collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShipState {
    pub pos_x: f32,
    pub pos_y: f32,
    pub rot: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub emitting_trail: bool,
    pub alive: bool,
}

impl ShipState {
    pub fn to_packet(&self, peer_id: PeerId) -> PlayerState {
        PlayerState {
            peer_id,
            pos_x: self.pos_x,
            pos_y: self.pos_y,
            rot: self.rot,
            vel_x: self.vel_x,
            vel_y: self.vel_y,
            emitting_trail: self.emitting_trail,
            alive: self.alive,
        }
    }
}

/// A shot fired by the local ship.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Shot {
    pub pos_x: f32,
    pub pos_y: f32,
    pub rot: f32,
    pub dir_x: f32,
    pub dir_y: f32,
}

impl Shot {
    pub fn to_packet(&self, peer_id: PeerId) -> ShootEvent {
        ShootEvent {
            peer_id,
            pos_x: self.pos_x,
            pos_y: self.pos_y,
            rot: self.rot,
            dir_x: self.dir_x,
            dir_y: self.dir_y,
        }
    }
}

/// Another peer's ship as this process renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntity {
    pub peer_id: PeerId,
    pub x: f32,
    pub y: f32,
    pub rot: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub emitting_trail: bool,
    pub alive: bool,
    pub samples: u64,
}

impl RemoteEntity {
    fn spawn(state: &PlayerState) -> Self {
        Self {
            peer_id: state.peer_id,
            x: state.pos_x,
            y: state.pos_y,
            rot: state.rot,
            vel_x: state.vel_x,
            vel_y: state.vel_y,
            emitting_trail: state.emitting_trail,
            alive: state.alive,
            samples: 1,
        }
    }

    fn blend(&mut self, state: &PlayerState, smoothing: f32) {
        self.x += (state.pos_x - self.x) * smoothing;
        self.y += (state.pos_y - self.y) * smoothing;
        self.rot = state.rot;
        self.vel_x = state.vel_x;
        self.vel_y = state.vel_y;
        self.emitting_trail = state.emitting_trail;
        self.alive = state.alive;
        self.samples += 1;
    }
}

/// Last-write-wins store of remote ships, one per peer.
#[derive(Debug, Clone)]
pub struct RemoteEntities {
    local: PeerId,
    smoothing: f32,
    entities: HashMap<PeerId, RemoteEntity>,
}

impl RemoteEntities {
    pub fn new(local: PeerId, smoothing: f32) -> Self {
        Self {
            local,
            smoothing: smoothing.clamp(0.0, 1.0),
            entities: HashMap::new(),
        }
    }

    /// Applies a sample received from `sender`. Returns false when it was ignored.
    pub fn apply(&mut self, sender: PeerId, state: &PlayerState) -> bool {
        if sender == self.local {
            return false;
        }
        if state.peer_id != sender {
            debug!(
                "Ignoring state for peer {} relayed by peer {}",
                state.peer_id, sender
            );
            return false;
        }

        match self.entities.get_mut(&sender) {
            Some(entity) => entity.blend(state, self.smoothing),
            None => {
                info!("Spawning remote ship for peer {}", sender);
                self.entities.insert(sender, RemoteEntity::spawn(state));
            }
        }
        true
    }

    /// Moves every ship along its last known velocity.
    pub fn advance(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        for entity in self.entities.values_mut() {
            if entity.alive {
                entity.x += entity.vel_x * dt;
                entity.y += entity.vel_y * dt;
            }
        }
    }

    pub fn remove(&mut self, peer: PeerId) -> Option<RemoteEntity> {
        let removed = self.entities.remove(&peer);
        if removed.is_some() {
            info!("Despawning remote ship for peer {}", peer);
        }
        removed
    }

    pub fn get(&self, peer: PeerId) -> Option<&RemoteEntity> {
        self.entities.get(&peer)
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        self.entities.contains_key(&peer)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteEntity> {
        self.entities.values()
    }
}
