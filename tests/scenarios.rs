use glam::Vec2;

use snow_groomer::consts::SIM_DT;
use snow_groomer::level::{Anchor, HazardZone, Polygon, Rect};
use snow_groomer::sim::{
    AgentState, AgentStateKind, CoverageField, GameEvent, GameOverReason, GamePhase, GameState,
    HazardSignals, HazardSystem, Species, TickInput, WildlifeSystem, WinchState, tick,
};
use snow_groomer::{Level, LevelDef, Rank, Tuning, generate_level};

const ZONE_ID: u32 = 1;

/// 30x40 tile run at 25 degrees with a single hazard zone across the middle
fn slope_def() -> LevelDef {
    LevelDef {
        name: "Scenario".to_string(),
        width: 30,
        height: 40,
        tile_size: 16.0,
        piste: Polygon::from(Rect::new(Vec2::new(32.0, 16.0), Vec2::new(448.0, 624.0))),
        base_slope_degrees: 25.0,
        steep_zones: Vec::new(),
        cliffs: Vec::new(),
        access_paths: Vec::new(),
        buildings: Vec::new(),
        anchors: vec![Anchor {
            id: 1,
            pos: Vec2::new(240.0, 120.0),
        }],
        hazard_zones: vec![HazardZone {
            id: ZONE_ID,
            area: Polygon::from(Rect::new(Vec2::new(64.0, 200.0), Vec2::new(416.0, 400.0))),
            rate_scale: 1.0,
            anchor: Some(1),
        }],
        wildlife: Vec::new(),
        vehicle_start: Vec2::new(240.0, 560.0),
        start_heading: -std::f32::consts::FRAC_PI_2,
        target_coverage: 0.8,
        par_time_secs: 180.0,
        bonus_objectives: Vec::new(),
    }
}

fn slope_level() -> Level {
    Level::from_def(slope_def()).unwrap()
}

fn parked_in_zone() -> GameState {
    let mut state = GameState::new(slope_level(), Tuning::default(), 7).unwrap();
    state.vehicle.pos = Vec2::new(240.0, 300.0);
    state
}

fn hazard_triggers(events: &[GameEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, GameEvent::HazardTriggered { .. }))
        .count()
}

#[test]
fn risk_builds_while_parked_in_a_hazard_zone() {
    let mut state = parked_in_zone();
    for _ in 0..40 {
        tick(&mut state, &TickInput::default(), SIM_DT);
    }
    let risk = state.hazard.risk(ZONE_ID).unwrap();
    assert!((risk - 0.6).abs() < 1e-3, "risk {risk}");
    assert_eq!(state.phase, GamePhase::Playing);
    assert_eq!(hazard_triggers(state.events()), 0);
}

#[test]
fn avalanche_fires_exactly_once() {
    let mut state = parked_in_zone();
    let mut events = Vec::new();
    for _ in 0..70 {
        tick(&mut state, &TickInput::default(), SIM_DT);
        events.extend(state.drain_events());
    }
    assert_eq!(hazard_triggers(&events), 1);
    assert_eq!(
        state.phase,
        GamePhase::GameOver {
            reason: GameOverReason::Avalanche
        }
    );
    assert_eq!(state.hazard.risk(ZONE_ID), Some(1.0));

    // Nothing moves once the run is over
    let ticks = state.time_ticks;
    for _ in 0..30 {
        tick(&mut state, &TickInput::default(), SIM_DT);
    }
    assert_eq!(state.time_ticks, ticks);
    assert_eq!(hazard_triggers(&state.drain_events()), 0);
}

#[test]
fn risk_decays_outside_and_never_goes_negative() {
    let level = slope_level();
    let zones = &level.geometry.hazard_zones;
    let mut hazard = HazardSystem::new(zones, &Tuning::default());

    let mut signals = HazardSignals {
        pos: Vec2::new(240.0, 300.0),
        speed: 0.0,
        slope_degrees: 25.0,
        newly_groomed: 0,
        winch_anchor: None,
    };
    for _ in 0..40 {
        hazard.accumulate(SIM_DT, zones, &signals);
    }
    assert!((hazard.risk(ZONE_ID).unwrap() - 0.6).abs() < 1e-3);

    signals.pos = Vec2::new(240.0, 560.0);
    for _ in 0..(30 * 60) {
        hazard.accumulate(SIM_DT, zones, &signals);
    }
    assert!((hazard.risk(ZONE_ID).unwrap() - 0.3).abs() < 2e-3);

    for _ in 0..(60 * 60) {
        hazard.accumulate(SIM_DT, zones, &signals);
    }
    assert_eq!(hazard.risk(ZONE_ID), Some(0.0));
    assert!(hazard.resolve().is_none());
}

#[test]
fn chamois_flees_on_the_first_tick_in_range() {
    let level = slope_level();
    let geometry = &level.geometry;
    let tuning = Tuning::default();
    let radius = tuning.flee_radius(Species::Chamois);
    let flee_speed = tuning.species(Species::Chamois).flee_speed;

    let mut wildlife = WildlifeSystem::new(geometry, &tuning, 3);
    let home = Rect::new(Vec2::new(200.0, 260.0), Vec2::new(280.0, 340.0));
    let id = wildlife.insert_agent(
        Species::Chamois,
        Vec2::new(240.0, 300.0),
        home,
        AgentState::Wandering {
            turn_in: 100.0,
            cooldown: 0.0,
        },
    );

    let mut events = Vec::new();
    let mut vehicle = Vec2::new(240.0, 600.0);
    let mut fled_at = None;
    for step in 0..400 {
        let agent_pos = wildlife.agent(id).unwrap().pos;
        let in_range = agent_pos.distance(vehicle) <= radius;
        wildlife.update(SIM_DT, vehicle, geometry, &mut events);
        let agent = wildlife.agent(id).unwrap();
        if in_range {
            assert_eq!(agent.state.kind(), AgentStateKind::Fleeing);
            assert!((agent.vel.length() - flee_speed).abs() < 1e-3);
            // Running uphill, away from the groomer
            assert!(agent.vel.y < 0.0);
            fled_at = Some(step);
            break;
        }
        assert_eq!(agent.state.kind(), AgentStateKind::Wandering);
        vehicle.y -= 1.0;
    }
    assert!(fled_at.is_some());
    assert!(events.contains(&GameEvent::AgentStateChanged {
        agent_id: id,
        species: Species::Chamois,
        from: AgentStateKind::Wandering,
        to: AgentStateKind::Fleeing,
    }));
}

#[test]
fn fleeing_agent_calms_down_once_the_threat_leaves() {
    let level = slope_level();
    let geometry = &level.geometry;
    let tuning = Tuning::default();
    let mut wildlife = WildlifeSystem::new(geometry, &tuning, 3);
    let home = Rect::new(Vec2::new(200.0, 260.0), Vec2::new(280.0, 340.0));
    let id = wildlife.insert_agent(
        Species::Chamois,
        Vec2::new(240.0, 300.0),
        home,
        AgentState::Wandering {
            turn_in: 100.0,
            cooldown: 0.0,
        },
    );

    let mut events = Vec::new();
    wildlife.update(SIM_DT, Vec2::new(240.0, 360.0), geometry, &mut events);
    assert_eq!(wildlife.agent(id).unwrap().state.kind(), AgentStateKind::Fleeing);

    wildlife.update(SIM_DT, Vec2::new(2000.0, 2000.0), geometry, &mut events);
    let agent = wildlife.agent(id).unwrap();
    assert!(matches!(agent.state, AgentState::Wandering { cooldown, .. } if cooldown > 0.0));
    assert!(agent.vel.length() <= tuning.species(Species::Chamois).wander_speed + 1e-3);

    let kinds: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::AgentStateChanged { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (AgentStateKind::Wandering, AgentStateKind::Fleeing),
            (AgentStateKind::Fleeing, AgentStateKind::Wandering),
        ]
    );
}

#[test]
fn only_one_cable_at_a_time() {
    let mut state = GameState::new(slope_level(), Tuning::default(), 7).unwrap();
    state.vehicle.pos = Vec2::new(240.0, 140.0);
    let anchors = state.level.geometry.anchors.clone();

    assert_eq!(state.winch.try_attach(state.vehicle.pos, 100.0, &anchors), Some(1));
    assert_eq!(state.winch.try_attach(state.vehicle.pos, 100.0, &anchors), None);

    let steps = (state.tuning.winch_attach_secs / SIM_DT).ceil() as usize + 1;
    for _ in 0..steps {
        state.winch.update(state.vehicle.pos, &anchors, SIM_DT);
    }
    assert_eq!(state.winch.state(), WinchState::Attached { anchor_id: 1 });
    assert_eq!(state.winch.try_attach(state.vehicle.pos, 100.0, &anchors), None);
    assert_eq!(state.winch.state(), WinchState::Attached { anchor_id: 1 });
    assert_eq!(state.winch.use_count(), 1);

    let cable = state.snapshot().cable.unwrap();
    assert_eq!(cable.anchor_id, 1);
    assert_eq!(cable.to, anchors[0].pos);
}

#[test]
fn coverage_is_idempotent_and_monotone() {
    let level = slope_level();
    let mut field = CoverageField::new(&level.geometry);
    let pos = Vec2::new(240.0, 500.0);

    let first = field.mark_covered(pos, 24.0);
    assert!(first > 0);
    let ratio = field.coverage_ratio();
    assert_eq!(field.mark_covered(pos, 24.0), 0);
    assert_eq!(field.coverage_ratio(), ratio);

    let mut last = ratio;
    for i in 0..20 {
        field.quality_decay(0.5, 1.0);
        field.mark_covered(Vec2::new(60.0 + 20.0 * i as f32, 450.0), 24.0);
        assert!(field.coverage_ratio() >= last);
        last = field.coverage_ratio();
    }
    assert!(last <= 1.0);
}

#[test]
fn restart_resets_every_system_together() {
    let level = Level::from_def(generate_level("RESET", Rank::Blue)).unwrap();
    let fresh = GameState::new(level.clone(), Tuning::default(), 99).unwrap();
    let mut state = GameState::new(level, Tuning::default(), 99).unwrap();

    let input = TickInput {
        autopilot: true,
        ..TickInput::default()
    };
    for _ in 0..(20 * 60) {
        tick(&mut state, &input, SIM_DT);
    }
    assert!(state.coverage.coverage_ratio() > 0.0);

    tick(
        &mut state,
        &TickInput {
            restart: true,
            ..TickInput::default()
        },
        SIM_DT,
    );
    let snap = state.snapshot();
    assert_eq!(snap.restart_count, 1);
    assert_eq!(snap.tick, 0);
    assert_eq!(snap.coverage_ratio, 0.0);
    assert_eq!(snap.max_risk, 0.0);
    assert!(!snap.winch_active);
    assert_eq!(snap.phase, GamePhase::Playing);
    assert_eq!(snap.position, fresh.vehicle.pos);
    assert_eq!(state.wildlife.agents(), fresh.wildlife.agents());
    assert_eq!(state.drain_events(), vec![GameEvent::Restarted { count: 1 }]);
}

#[test]
fn daily_runs_are_valid_and_reproducible() {
    for rank in [Rank::Green, Rank::Blue, Rank::Red, Rank::Black] {
        let def = generate_level("2026-10-19", rank);
        assert_eq!(
            def.to_json().unwrap(),
            generate_level("2026-10-19", rank).to_json().unwrap()
        );

        let level = Level::from_def(def).unwrap();
        let run = || {
            let mut state = GameState::new(level.clone(), Tuning::default(), 42).unwrap();
            let input = TickInput {
                autopilot: true,
                ..TickInput::default()
            };
            let mut events = Vec::new();
            for _ in 0..600 {
                tick(&mut state, &input, SIM_DT);
                events.extend(state.drain_events());
            }
            (state.snapshot(), events)
        };
        let (snap, events) = run();
        assert_eq!((snap.clone(), events), run(), "rank {}", rank.as_str());
        assert!((0.0..=1.0).contains(&snap.coverage_ratio));
    }
}
