//! Property tests for the elimination rules and the wire codec

use arena_session::{HostAuthority, Outcome, SessionConfig, TeamPhase};
use arena_shared::{
    BaseHit, BaseStateChanged, Packet, PeerId, PlayerHit, PlayerRecord, PlayerState, Team,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Event {
    Hit { victim: PeerId, attacker: PeerId, damage: f32 },
    Died { victim: PeerId, killer: Option<PeerId> },
    BaseHit { team: Team, attacker: PeerId, damage: f32 },
    Respawned { peer: PeerId },
    Left { peer: PeerId },
}

const TEAMS: Team = 4;
const PER_TEAM: u64 = 2;

fn peer() -> impl Strategy<Value = PeerId> {
    (1..=TEAMS as u64, 0..PER_TEAM).prop_map(|(team, k)| team * 10 + k)
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (peer(), peer(), 0.5f32..20.0).prop_map(|(victim, attacker, damage)| Event::Hit {
            victim,
            attacker,
            damage
        }),
        (peer(), proptest::option::of(peer()))
            .prop_map(|(victim, killer)| Event::Died { victim, killer }),
        (1..=TEAMS, peer(), 1.0f32..40.0).prop_map(|(team, attacker, damage)| Event::BaseHit {
            team,
            attacker,
            damage
        }),
        peer().prop_map(|peer| Event::Respawned { peer }),
        peer().prop_map(|peer| Event::Left { peer }),
    ]
}

fn authority() -> HostAuthority {
    let mut host = HostAuthority::new(SessionConfig::default());
    for team in 1..=TEAMS {
        for k in 0..PER_TEAM {
            let peer = team as u64 * 10 + k;
            host.register_player(peer, &format!("P{}", peer), team);
        }
    }
    host
}

fn apply(host: &mut HostAuthority, event: &Event) -> Vec<Outcome> {
    match *event {
        Event::Hit {
            victim,
            attacker,
            damage,
        } => {
            host.player_hit(victim, attacker, damage);
            Vec::new()
        }
        Event::Died { victim, killer } => host.player_died(victim, killer, 30.0),
        Event::BaseHit {
            team,
            attacker,
            damage,
        } => host.base_hit(team, attacker, damage),
        Event::Respawned { peer } => {
            host.player_respawned(peer);
            Vec::new()
        }
        Event::Left { peer } => host.peer_left(peer),
    }
}

fn rank(phase: Option<TeamPhase>) -> u8 {
    match phase {
        Some(TeamPhase::Active) | None => 0,
        Some(TeamPhase::BaseDown) => 1,
        Some(TeamPhase::Eliminated) => 2,
    }
}

proptest! {
    #[test]
    fn elimination_order_only_grows(events in proptest::collection::vec(event(), 0..200)) {
        let mut host = authority();
        let mut previous: Vec<Team> = Vec::new();
        let mut phases: Vec<u8> = vec![0; TEAMS as usize + 1];
        let mut ended = 0;

        for event in &events {
            let outcomes = apply(&mut host, event);
            ended += outcomes
                .iter()
                .filter(|o| matches!(o, Outcome::GameEnded(_)))
                .count();

            let order = host.elimination().order().to_vec();
            prop_assert!(order.starts_with(&previous), "order {:?} rewrote {:?}", order, previous);
            let mut unique = order.clone();
            unique.sort_unstable();
            unique.dedup();
            prop_assert_eq!(unique.len(), order.len());

            for team in 1..=TEAMS {
                let now = rank(host.elimination().phase(team));
                prop_assert!(now >= phases[team as usize], "team {} regressed", team);
                phases[team as usize] = now;
            }
            previous = order;
        }
        prop_assert!(ended <= 1);
    }

    #[test]
    fn placements_cover_every_rank(events in proptest::collection::vec(event(), 0..300)) {
        let mut host = authority();
        for event in &events {
            apply(&mut host, event);
        }
        let finished = host.result().cloned();

        // Drive every surviving team out so the game always ends
        for team in 1..=TEAMS {
            for k in 0..PER_TEAM {
                host.peer_left(team as u64 * 10 + k);
            }
        }
        let result = host.result().cloned().expect("all teams left");
        if let Some(first) = finished {
            prop_assert_eq!(&first, &result);
        }

        let mut places: Vec<u32> = result.placements.values().copied().collect();
        places.sort_unstable();
        let expected: Vec<u32> = match result.winner {
            Some(_) => (1..=TEAMS as u32).collect(),
            None => (2..=TEAMS as u32).collect(),
        };
        prop_assert_eq!(places, expected);
        if let Some(winner) = result.winner {
            prop_assert_eq!(result.placements.get(&winner), Some(&1));
        }

        let records: Vec<PlayerRecord> = host.all_stats();
        for record in records {
            prop_assert_eq!(Some(&record.placement), result.placements.get(&record.team));
        }
    }

    #[test]
    fn player_state_round_trip(
        peer_id in any::<u64>(),
        pos in (-1.0e6f32..1.0e6, -1.0e6f32..1.0e6),
        rot in -10.0f32..10.0,
        vel in (-1.0e4f32..1.0e4, -1.0e4f32..1.0e4),
        emitting_trail in any::<bool>(),
        alive in any::<bool>(),
    ) {
        let packet = Packet::PlayerState(PlayerState {
            peer_id,
            pos_x: pos.0,
            pos_y: pos.1,
            rot,
            vel_x: vel.0,
            vel_y: vel.1,
            emitting_trail,
            alive,
        });
        let bytes = packet.encode().unwrap();
        prop_assert_eq!(bytes.len(), 31);
        prop_assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn small_packets_round_trip(
        team in any::<i32>(),
        alive in any::<bool>(),
        peer_id in any::<u64>(),
        damage in proptest::num::f32::NORMAL | proptest::num::f32::ZERO,
    ) {
        for packet in [
            Packet::BaseStateChanged(BaseStateChanged { team, alive }),
            Packet::PlayerHit(PlayerHit { peer_id, damage }),
            Packet::BaseHit(BaseHit { team, damage }),
        ] {
            let bytes = packet.encode().unwrap();
            prop_assert_eq!(Packet::decode(&bytes).unwrap(), packet);
        }
    }

    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = Packet::decode(&bytes);
    }
}
