//! Team elimination and final placements
//!
//! Every team moves through `Active -> BaseDown -> Eliminated` and never back.
//! A team is only eliminated once its base is gone *and* none of its players is
//! alive; the order teams fall in decides their placement. The result is
//! latched the first time the win condition holds and never recomputed.

use arena_shared::Team;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamPhase {
    Active,
    BaseDown,
    Eliminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EliminationError {
    #[error("team {0} is not registered")]
    UnknownTeam(Team),
    #[error("base of team {team} cannot be restored once destroyed")]
    InvalidTeamTransition { team: Team },
}

/// Outcome of a finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    /// `None` when no team survived.
    pub winner: Option<Team>,
    pub placements: HashMap<Team, u32>,
    /// Teams in the order they were eliminated.
    pub order: Vec<Team>,
    pub total_teams: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EliminationTracker {
    phases: BTreeMap<Team, TeamPhase>,
    order: Vec<Team>,
    result: Option<GameResult>,
}

impl EliminationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a team in the `Active` phase. Known teams are left untouched.
    pub fn register_team(&mut self, team: Team) {
        self.phases.entry(team).or_insert(TeamPhase::Active);
    }

    pub fn phase(&self, team: Team) -> Option<TeamPhase> {
        self.phases.get(&team).copied()
    }

    pub fn is_base_alive(&self, team: Team) -> bool {
        self.phase(team) == Some(TeamPhase::Active)
    }

    pub fn teams(&self) -> impl Iterator<Item = Team> + '_ {
        self.phases.keys().copied()
    }

    pub fn order(&self) -> &[Team] {
        &self.order
    }

    /// Teams that ever had a registered player, never fewer than two.
    pub fn total_teams(&self) -> usize {
        self.phases.len().max(2)
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    /// Moves an active team to `BaseDown`. Returns true on the transition itself.
    pub fn base_destroyed(&mut self, team: Team) -> Result<bool, EliminationError> {
        let phase = self
            .phases
            .get_mut(&team)
            .ok_or(EliminationError::UnknownTeam(team))?;
        if *phase != TeamPhase::Active {
            return Ok(false);
        }
        *phase = TeamPhase::BaseDown;
        info!("Base of team {} destroyed", team);
        Ok(true)
    }

    /// Accepts an "alive" report only for a base that never went down.
    pub fn confirm_base_alive(&self, team: Team) -> Result<(), EliminationError> {
        match self.phase(team) {
            Some(TeamPhase::Active) => Ok(()),
            Some(_) => {
                warn!("Rejecting base revival for team {}", team);
                Err(EliminationError::InvalidTeamTransition { team })
            }
            None => Err(EliminationError::UnknownTeam(team)),
        }
    }

    /// Re-evaluates `team` after a base loss, death or departure.
    ///
    /// Returns the result when this call ended the game.
    pub fn evaluate(&mut self, team: Team, any_player_alive: bool) -> Option<GameResult> {
        if self.result.is_some() {
            return None;
        }
        match self.phases.get_mut(&team) {
            Some(phase) if *phase == TeamPhase::BaseDown && !any_player_alive => {
                *phase = TeamPhase::Eliminated;
            }
            _ => return None,
        }
        if !self.order.contains(&team) {
            self.order.push(team);
            info!(
                "Team {} eliminated ({} of {})",
                team,
                self.order.len(),
                self.total_teams()
            );
        }
        self.check_win()
    }

    /// Latches the result once at most one team can still be standing.
    pub fn check_win(&mut self) -> Option<GameResult> {
        if self.result.is_some() {
            return None;
        }
        let total = self.total_teams();
        if total.saturating_sub(self.order.len()) > 1 {
            return None;
        }

        let winner = self
            .phases
            .keys()
            .copied()
            .find(|team| !self.order.contains(team));

        let mut placements = HashMap::new();
        for (i, team) in self.order.iter().enumerate() {
            placements.insert(*team, (total - i) as u32);
        }
        if let Some(winner) = winner {
            placements.insert(winner, 1);
        }

        let result = GameResult {
            winner,
            placements,
            order: self.order.clone(),
            total_teams: total,
        };
        match winner {
            Some(team) => info!("Game over, team {} wins", team),
            None => info!("Game over, no team survived"),
        }
        self.result = Some(result.clone());
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(teams: &[Team]) -> EliminationTracker {
        let mut tracker = EliminationTracker::new();
        for team in teams {
            tracker.register_team(*team);
        }
        tracker
    }

    #[test]
    fn test_two_team_game() {
        let mut elim = tracker(&[1, 2]);
        assert_eq!(elim.base_destroyed(1), Ok(true));
        assert_eq!(elim.phase(1), Some(TeamPhase::BaseDown));

        assert!(elim.evaluate(1, true).is_none());
        let result = elim.evaluate(1, false).unwrap();

        assert_eq!(result.winner, Some(2));
        assert_eq!(result.placements, HashMap::from([(1, 2), (2, 1)]));
        assert_eq!(elim.phase(1), Some(TeamPhase::Eliminated));
        assert!(elim.is_finished());
    }

    #[test]
    fn test_active_team_is_not_eliminated() {
        let mut elim = tracker(&[1, 2, 3]);
        assert!(elim.evaluate(2, false).is_none());
        assert_eq!(elim.phase(2), Some(TeamPhase::Active));
        assert!(elim.order().is_empty());
    }

    #[test]
    fn test_three_team_placements() {
        let mut elim = tracker(&[1, 2, 3]);
        elim.base_destroyed(3).unwrap();
        assert!(elim.evaluate(3, false).is_none());
        elim.base_destroyed(1).unwrap();
        let result = elim.evaluate(1, false).unwrap();

        assert_eq!(result.order, vec![3, 1]);
        assert_eq!(result.placements, HashMap::from([(3, 3), (1, 2), (2, 1)]));
    }

    #[test]
    fn test_result_is_latched() {
        let mut elim = tracker(&[1, 2]);
        elim.base_destroyed(1).unwrap();
        let first = elim.evaluate(1, false).unwrap();

        elim.base_destroyed(2).unwrap();
        assert!(elim.evaluate(2, false).is_none());
        assert!(elim.check_win().is_none());
        assert_eq!(elim.result(), Some(&first));
        assert_eq!(elim.order(), &[1]);
    }

    #[test]
    fn test_single_team_is_a_draw() {
        let mut elim = tracker(&[4]);
        assert_eq!(elim.total_teams(), 2);
        elim.base_destroyed(4).unwrap();
        let result = elim.evaluate(4, false).unwrap();
        assert_eq!(result.winner, None);
        assert_eq!(result.placements, HashMap::from([(4, 2)]));
    }

    #[test]
    fn test_transitions() {
        let mut elim = tracker(&[1, 2]);
        assert!(elim.confirm_base_alive(1).is_ok());
        assert_eq!(elim.base_destroyed(1), Ok(true));
        assert_eq!(elim.base_destroyed(1), Ok(false));
        assert_eq!(
            elim.confirm_base_alive(1),
            Err(EliminationError::InvalidTeamTransition { team: 1 })
        );
        assert_eq!(elim.base_destroyed(9), Err(EliminationError::UnknownTeam(9)));

        elim.register_team(1);
        assert_eq!(elim.phase(1), Some(TeamPhase::BaseDown));
    }
}
