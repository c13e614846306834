use crate::timer::{TimerId, TimerQueue};
use log::{debug, info};
use std::time::{Duration, Instant};

/// Where the local player stands in the death/respawn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnState {
    Alive,
    /// Dead, respawning when the timer fires.
    Waiting(TimerId),
    /// Dead with no base to come back to.
    Spectating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RespawnDue;

/// Schedules the local player's respawn after a death.
#[derive(Debug)]
pub struct RespawnCoordinator {
    delay: Duration,
    timers: TimerQueue<RespawnDue>,
    state: RespawnState,
}

impl RespawnCoordinator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: TimerQueue::new(),
            state: RespawnState::Alive,
        }
    }

    pub fn state(&self) -> RespawnState {
        self.state
    }

    pub fn is_spectating(&self) -> bool {
        self.state == RespawnState::Spectating
    }

    /// Starts the respawn timer, or spectates when the base is already gone.
    pub fn on_death(&mut self, now: Instant, base_alive: bool) -> RespawnState {
        if self.state != RespawnState::Alive {
            return self.state;
        }
        self.state = if base_alive {
            let id = self.timers.schedule(now + self.delay, RespawnDue);
            info!("Respawning in {:.1}s", self.delay.as_secs_f32());
            RespawnState::Waiting(id)
        } else {
            info!("Base is gone, spectating");
            RespawnState::Spectating
        };
        self.state
    }

    /// The local team's base went down; a pending respawn turns into spectating.
    pub fn on_base_lost(&mut self) {
        if let RespawnState::Waiting(id) = self.state {
            self.timers.cancel(id);
            debug!("Respawn cancelled, base lost");
            self.state = RespawnState::Spectating;
        }
    }

    /// True when the player should respawn now.
    pub fn poll(&mut self, now: Instant, base_alive: bool) -> bool {
        if self.timers.drain_due(now).is_empty() {
            return false;
        }
        if !matches!(self.state, RespawnState::Waiting(_)) {
            return false;
        }
        if base_alive {
            self.state = RespawnState::Alive;
            true
        } else {
            debug!("Respawn timer fired without a base");
            self.state = RespawnState::Spectating;
            false
        }
    }
}
