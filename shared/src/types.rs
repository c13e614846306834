//! Identity, team and per-player record types shared by every process

use serde::{Deserialize, Serialize};

/// Stable participant identifier handed out by the platform identity service.
pub type PeerId = u64;

/// Team number, `1..=N`.
pub type Team = i32;

/// Reserved peer id meaning "nobody" (environmental damage, asteroid kills).
pub const NO_PEER: PeerId = 0;

/// Wire value of `winning_team` when the game ended without a winner.
pub const DRAW_TEAM: Team = -1;

/// Membership metadata key holding the `"<team>_<slot>"` assignment.
pub const SLOT_METADATA_KEY: &str = "slot";

/// Membership metadata key holding the display name.
pub const NAME_METADATA_KEY: &str = "name";

/// Lobby slot a peer picked before the match started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    pub team: Team,
    pub slot: u8,
}

impl SlotAssignment {
    /// Parses lobby metadata of the form `"3_2"`.
    ///
    /// Returns None for anything that does not name a positive team, so
    /// spectators and half-written lobby data never become players.
    pub fn parse(raw: &str) -> Option<Self> {
        let (team, slot) = raw.trim().split_once('_')?;
        let team: Team = team.parse().ok()?;
        let slot: u8 = slot.parse().ok()?;
        if team <= 0 {
            return None;
        }
        Some(Self { team, slot })
    }
}

/// Final and running statistics for one participant.
///
/// Records are created by the host when a peer is first tied to a team and
/// are never removed during a session, so players who died or left still
/// appear in the final standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub peer_id: PeerId,
    pub name: String,
    pub team: Team,
    pub alive: bool,
    pub kills: u32,
    pub final_kills: u32,
    pub assists: u32,
    pub deaths: u32,
    pub bases_destroyed: u32,
    pub total_damage_dealt: f32,
    /// 1 is the winner; 0 until the game has been finalized.
    pub placement: u32,
}

impl PlayerRecord {
    pub fn new(peer_id: PeerId, name: impl Into<String>, team: Team) -> Self {
        Self {
            peer_id,
            name: name.into(),
            team,
            alive: true,
            kills: 0,
            final_kills: 0,
            assists: 0,
            deaths: 0,
            bases_destroyed: 0,
            total_damage_dealt: 0.0,
            placement: 0,
        }
    }

    /// Kills of either kind, as counted toward the scoreboard.
    pub fn total_kills(&self) -> u32 {
        self.kills + self.final_kills
    }
}

/// Ordinal label for a placement ("1ST", "12TH"), "-" when unplaced.
pub fn placement_label(place: u32) -> String {
    if place == 0 {
        return "-".to_string();
    }
    let suffix = match (place % 100, place % 10) {
        (11..=13, _) => "TH",
        (_, 1) => "ST",
        (_, 2) => "ND",
        (_, 3) => "RD",
        _ => "TH",
    };
    format!("{}{}", place, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_parsing() {
        assert_eq!(
            SlotAssignment::parse("3_2"),
            Some(SlotAssignment { team: 3, slot: 2 })
        );
        assert_eq!(
            SlotAssignment::parse(" 1_1 "),
            Some(SlotAssignment { team: 1, slot: 1 })
        );
        assert_eq!(SlotAssignment::parse(""), None);
        assert_eq!(SlotAssignment::parse("3"), None);
        assert_eq!(SlotAssignment::parse("0_1"), None);
        assert_eq!(SlotAssignment::parse("x_1"), None);
    }

    #[test]
    fn test_new_record_is_alive_and_unplaced() {
        let record = PlayerRecord::new(7, "Nova", 2);
        assert!(record.alive);
        assert_eq!(record.team, 2);
        assert_eq!(record.placement, 0);
        assert_eq!(record.total_kills(), 0);
    }

    #[test]
    fn test_placement_labels() {
        assert_eq!(placement_label(0), "-");
        assert_eq!(placement_label(1), "1ST");
        assert_eq!(placement_label(2), "2ND");
        assert_eq!(placement_label(3), "3RD");
        assert_eq!(placement_label(4), "4TH");
        assert_eq!(placement_label(11), "11TH");
        assert_eq!(placement_label(12), "12TH");
        assert_eq!(placement_label(21), "21ST");
    }

    #[test]
    fn test_record_json_roundtrip() {
        let mut record = PlayerRecord::new(42, "Vega", 1);
        record.kills = 3;
        record.total_damage_dealt = 12.5;
        let json = serde_json::to_string(&record).unwrap();
        let back: PlayerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
