//! Wildlife agents
//!
//! Animals idle, wander inside their home area, and bolt away from the
//! groomer when it comes within their species' detection radius. Agents
//! that flee off the map or run out of flee time are removed. A spawn
//! scheduler tops populations back up to their caps over time.
//!
//! All randomness comes from one seeded `Pcg32`, and agents update in id
//! order, so a given seed and vehicle path always plays out the same way.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{bounce_velocity, clamp_into_rect, push_out_of_obstacles};
use super::state::GameEvent;
use crate::heading_vector;
use crate::level::{GridSpec, LevelGeometry, Rect, Region};
use crate::tuning::{SpeciesTuning, Tuning};

/// Tries at finding an unobstructed spawn point before giving up
const SPAWN_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Species {
    Marmot,
    Chamois,
    Ibex,
    Fox,
    Ptarmigan,
}

impl Species {
    pub const ALL: [Species; 5] = [
        Species::Marmot,
        Species::Chamois,
        Species::Ibex,
        Species::Fox,
        Species::Ptarmigan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Marmot => "marmot",
            Species::Chamois => "chamois",
            Species::Ibex => "ibex",
            Species::Fox => "fox",
            Species::Ptarmigan => "ptarmigan",
        }
    }
}

/// Behaviour state with its timers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AgentState {
    Idle { remaining: f32 },
    /// `cooldown` blocks flee retriggering after calming down
    Wandering { turn_in: f32, cooldown: f32 },
    Fleeing { elapsed: f32 },
    Fled,
}

/// State without payload, used for transition checks and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStateKind {
    Idle,
    Wandering,
    Fleeing,
    Fled,
}

impl AgentState {
    pub fn kind(&self) -> AgentStateKind {
        match self {
            AgentState::Idle { .. } => AgentStateKind::Idle,
            AgentState::Wandering { .. } => AgentStateKind::Wandering,
            AgentState::Fleeing { .. } => AgentStateKind::Fleeing,
            AgentState::Fled => AgentStateKind::Fled,
        }
    }
}

impl AgentStateKind {
    /// Legal transitions. Fleeing -> Wandering is the only way back.
    pub fn can_transition_to(self, next: AgentStateKind) -> bool {
        use AgentStateKind::*;
        matches!(
            (self, next),
            (Idle, Wandering) | (Idle, Fleeing) | (Wandering, Fleeing) | (Fleeing, Wandering) | (Fleeing, Fled)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: u32,
    pub species: Species,
    pub pos: Vec2,
    pub vel: Vec2,
    pub state: AgentState,
    /// Where the threat was when the agent last fled
    pub flee_from: Option<Vec2>,
    pub lifetime_secs: f32,
    /// Wander area
    pub home: Rect,
    #[serde(skip)]
    last_cell: Option<(u32, u32)>,
}

impl Agent {
    /// Guarded state change; illegal transitions are refused
    fn transition(&mut self, next: AgentState, events: &mut Vec<GameEvent>) -> bool {
        let from = self.state.kind();
        let to = next.kind();
        if !from.can_transition_to(to) {
            log::warn!("agent {} refused transition {from:?} -> {to:?}", self.id);
            return false;
        }
        self.state = next;
        events.push(GameEvent::AgentStateChanged {
            agent_id: self.id,
            species: self.species,
            from,
            to,
        });
        true
    }

    fn flee_velocity(&self, threat: Vec2, speed: f32) -> Vec2 {
        let away = (self.pos - threat)
            .try_normalize()
            .or_else(|| self.vel.try_normalize())
            .unwrap_or(Vec2::X);
        away * speed
    }
}

/// Spawn waiting for its due time; the area is copied in when scheduled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSpawn {
    pub due_secs: f32,
    pub species: Species,
    pub area: Rect,
}

#[derive(Debug, Clone, Default)]
pub struct SpawnScheduler {
    clock_secs: f32,
    pending: Vec<PendingSpawn>,
}

impl SpawnScheduler {
    pub fn schedule(&mut self, spawn: PendingSpawn) {
        self.pending.push(spawn);
    }

    pub fn advance(&mut self, dt: f32) {
        self.clock_secs += dt;
    }

    #[inline]
    pub fn clock_secs(&self) -> f32 {
        self.clock_secs
    }

    pub fn pending(&self) -> &[PendingSpawn] {
        &self.pending
    }

    /// Remove and return everything due, in scheduling order
    pub fn take_due(&mut self) -> Vec<PendingSpawn> {
        let clock = self.clock_secs;
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.due_secs <= clock);
        self.pending = waiting;
        due
    }

    pub fn clear(&mut self) {
        self.clock_secs = 0.0;
        self.pending.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SpeciesParams {
    behaviour: SpeciesTuning,
    flee_radius: f32,
    cap: u32,
}

impl SpeciesParams {
    fn fallback() -> Self {
        Self {
            behaviour: SpeciesTuning::default(),
            flee_radius: 0.0,
            cap: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WildlifeSystem {
    params: BTreeMap<Species, SpeciesParams>,
    agents: Vec<Agent>,
    scheduler: SpawnScheduler,
    rng: Pcg32,
    seed: u64,
    next_id: u32,
}

impl WildlifeSystem {
    /// Build the system and place each spawn area's initial population
    pub fn new(geometry: &LevelGeometry, tuning: &Tuning, seed: u64) -> Self {
        let params = Species::ALL
            .iter()
            .map(|&s| {
                (
                    s,
                    SpeciesParams {
                        behaviour: tuning.species(s),
                        flee_radius: tuning.flee_radius(s),
                        cap: tuning.population_cap(s),
                    },
                )
            })
            .collect();
        let mut system = Self {
            params,
            agents: Vec::new(),
            scheduler: SpawnScheduler::default(),
            rng: Pcg32::seed_from_u64(seed),
            seed,
            next_id: 0,
        };
        system.populate(geometry);
        system
    }

    fn populate(&mut self, geometry: &LevelGeometry) {
        for spawn_area in &geometry.spawn_areas {
            let params = self.params_for(spawn_area.species);
            for _ in 0..spawn_area.initial {
                if self.live_count(spawn_area.species) >= params.cap as usize {
                    break;
                }
                self.spawn_agent(spawn_area.species, spawn_area.area, geometry);
            }
            self.scheduler.schedule(PendingSpawn {
                due_secs: params.behaviour.spawn_interval_secs,
                species: spawn_area.species,
                area: spawn_area.area,
            });
        }
        log::debug!("wildlife populated with {} agents", self.agents.len());
    }

    fn params_for(&self, species: Species) -> SpeciesParams {
        self.params
            .get(&species)
            .copied()
            .unwrap_or_else(SpeciesParams::fallback)
    }

    /// Live agents, in id order
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: u32) -> Option<&Agent> {
        self.agents
            .binary_search_by_key(&id, |a| a.id)
            .ok()
            .map(|i| &self.agents[i])
    }

    pub fn live_count(&self, species: Species) -> usize {
        self.agents.iter().filter(|a| a.species == species).count()
    }

    pub fn scheduler(&self) -> &SpawnScheduler {
        &self.scheduler
    }

    /// Place an agent directly, bypassing the scheduler and population cap
    pub fn insert_agent(&mut self, species: Species, pos: Vec2, home: Rect, state: AgentState) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.agents.push(Agent {
            id,
            species,
            pos,
            vel: Vec2::ZERO,
            state,
            flee_from: None,
            lifetime_secs: 0.0,
            home,
            last_cell: None,
        });
        id
    }

    fn spawn_agent(&mut self, species: Species, area: Rect, geometry: &LevelGeometry) -> Option<u32> {
        let behaviour = self.params_for(species).behaviour;
        for _ in 0..SPAWN_ATTEMPTS {
            let p = Vec2::new(
                self.rng.random_range(area.min.x..=area.max.x),
                self.rng.random_range(area.min.y..=area.max.y),
            );
            let p = geometry.bounds.clamp(p);
            if geometry.is_blocked(p) {
                continue;
            }
            let lo = behaviour.idle_min_secs.min(behaviour.idle_max_secs);
            let hi = behaviour.idle_min_secs.max(behaviour.idle_max_secs);
            let remaining = self.rng.random_range(lo..=hi);
            return Some(self.insert_agent(species, p, area, AgentState::Idle { remaining }));
        }
        log::debug!("no clear spawn point for {} in {area:?}", species.as_str());
        None
    }

    /// Advance every live agent one tick against the vehicle's final position
    pub fn update(
        &mut self,
        dt: f32,
        vehicle_pos: Vec2,
        geometry: &LevelGeometry,
        events: &mut Vec<GameEvent>,
    ) {
        self.run_spawns(dt, geometry, events);

        for agent in &mut self.agents {
            let params = self
                .params
                .get(&agent.species)
                .copied()
                .unwrap_or_else(SpeciesParams::fallback);
            step_agent(agent, &params, &mut self.rng, dt, vehicle_pos, geometry, events);
        }

        let mut removed = Vec::new();
        self.agents.retain(|a| {
            let gone = matches!(a.state, AgentState::Fled);
            if gone {
                removed.push((a.id, a.species));
            }
            !gone
        });
        for (agent_id, species) in removed {
            events.push(GameEvent::AgentRemoved { agent_id, species });
        }
    }

    fn run_spawns(&mut self, dt: f32, geometry: &LevelGeometry, events: &mut Vec<GameEvent>) {
        self.scheduler.advance(dt);
        for spawn in self.scheduler.take_due() {
            let params = self.params_for(spawn.species);
            self.scheduler.schedule(PendingSpawn {
                due_secs: spawn.due_secs + params.behaviour.spawn_interval_secs,
                ..spawn
            });
            if self.live_count(spawn.species) >= params.cap as usize {
                continue;
            }
            if let Some(agent_id) = self.spawn_agent(spawn.species, spawn.area, geometry) {
                let pos = self.agent(agent_id).map(|a| a.pos).unwrap_or(spawn.area.center());
                events.push(GameEvent::AgentSpawned {
                    agent_id,
                    species: spawn.species,
                    pos,
                });
            }
        }
    }

    /// Restore the initial population for the same seed
    pub fn reset(&mut self, geometry: &LevelGeometry) {
        self.agents.clear();
        self.scheduler.clear();
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.next_id = 0;
        self.populate(geometry);
    }
}

fn step_agent(
    agent: &mut Agent,
    params: &SpeciesParams,
    rng: &mut Pcg32,
    dt: f32,
    vehicle_pos: Vec2,
    geometry: &LevelGeometry,
    events: &mut Vec<GameEvent>,
) {
    let behaviour = &params.behaviour;
    let in_range = agent.pos.distance(vehicle_pos) <= params.flee_radius;
    agent.lifetime_secs += dt;

    match agent.state {
        AgentState::Idle { remaining } => {
            if in_range {
                start_fleeing(agent, vehicle_pos, behaviour, events);
            } else if remaining - dt <= 0.0 {
                let turn_in = wander_turn(rng, behaviour);
                if agent.transition(AgentState::Wandering { turn_in, cooldown: 0.0 }, events) {
                    agent.vel = random_heading(rng) * behaviour.wander_speed;
                }
            } else {
                agent.state = AgentState::Idle {
                    remaining: remaining - dt,
                };
            }
        }
        AgentState::Wandering { turn_in, cooldown } => {
            let cooldown = (cooldown - dt).max(0.0);
            if in_range && cooldown <= 0.0 {
                start_fleeing(agent, vehicle_pos, behaviour, events);
            } else {
                let mut turn_in = turn_in - dt;
                if turn_in <= 0.0 {
                    agent.vel = random_heading(rng) * behaviour.wander_speed;
                    turn_in = wander_turn(rng, behaviour);
                }
                agent.state = AgentState::Wandering { turn_in, cooldown };
            }
        }
        AgentState::Fleeing { elapsed } => {
            if !in_range {
                let next = AgentState::Wandering {
                    turn_in: behaviour.wander_turn_secs,
                    cooldown: behaviour.cooldown_secs,
                };
                if agent.transition(next, events) {
                    agent.vel = agent.vel.normalize_or_zero() * behaviour.wander_speed;
                }
            } else if elapsed + dt >= behaviour.flee_secs {
                agent.transition(AgentState::Fled, events);
                agent.vel = Vec2::ZERO;
            } else {
                agent.state = AgentState::Fleeing { elapsed: elapsed + dt };
                agent.flee_from = Some(vehicle_pos);
                agent.vel = agent.flee_velocity(vehicle_pos, behaviour.flee_speed);
            }
        }
        AgentState::Fled => {}
    }

    // A wanderer that fled outside its home walks back rather than being fenced in
    if matches!(agent.state, AgentState::Wandering { .. }) && !agent.home.contains(agent.pos) {
        agent.vel = homing_velocity(agent, behaviour.wander_speed);
    }

    move_agent(agent, dt, geometry, events);
}

fn start_fleeing(agent: &mut Agent, threat: Vec2, behaviour: &SpeciesTuning, events: &mut Vec<GameEvent>) {
    if agent.transition(AgentState::Fleeing { elapsed: 0.0 }, events) {
        agent.flee_from = Some(threat);
        agent.vel = agent.flee_velocity(threat, behaviour.flee_speed);
    }
}

fn homing_velocity(agent: &Agent, speed: f32) -> Vec2 {
    (agent.home.clamp(agent.pos) - agent.pos).normalize_or_zero() * speed
}

fn random_heading(rng: &mut Pcg32) -> Vec2 {
    heading_vector(rng.random_range(-std::f32::consts::PI..std::f32::consts::PI))
}

fn wander_turn(rng: &mut Pcg32, behaviour: &SpeciesTuning) -> f32 {
    behaviour.wander_turn_secs * rng.random_range(0.5..1.5)
}

/// Integrate, then reflect-and-clamp off the home area, bounds and obstacles
fn move_agent(agent: &mut Agent, dt: f32, geometry: &LevelGeometry, events: &mut Vec<GameEvent>) {
    let moving = matches!(
        agent.state,
        AgentState::Wandering { .. } | AgentState::Fleeing { .. }
    );
    if moving {
        let mut next = agent.pos + agent.vel * dt;

        if matches!(agent.state, AgentState::Fleeing { .. }) && !geometry.bounds.contains(next) {
            agent.pos = next;
            agent.transition(AgentState::Fled, events);
            agent.vel = Vec2::ZERO;
            return;
        }

        if matches!(agent.state, AgentState::Wandering { .. }) && agent.home.contains(agent.pos) {
            let fence = clamp_into_rect(&agent.home, next);
            if fence.hit {
                next = fence.point;
                agent.vel = bounce_velocity(agent.vel, fence.normal);
            }
        }

        let edge = clamp_into_rect(&geometry.bounds, next);
        if edge.hit {
            next = edge.point;
            agent.vel = bounce_velocity(agent.vel, edge.normal);
        }

        let hit = push_out_of_obstacles(geometry, next);
        if hit.hit {
            next = hit.point;
            agent.vel = bounce_velocity(agent.vel, hit.normal);
        }
        agent.pos = next;
    }

    emit_track(agent, &geometry.grid, events);
}

fn emit_track(agent: &mut Agent, grid: &GridSpec, events: &mut Vec<GameEvent>) {
    if !grid.bounds().contains(agent.pos) {
        return;
    }
    let cell = grid.cell_of(agent.pos);
    if agent.last_cell == Some(cell) {
        return;
    }
    agent.last_cell = Some(cell);
    events.push(GameEvent::AgentTrack {
        agent_id: agent.id,
        species: agent.species,
        col: cell.0,
        row: cell.1,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::test_support::training_level;

    const DT: f32 = 1.0 / 60.0;

    fn empty_system(level: &crate::level::Level) -> WildlifeSystem {
        let mut geometry = level.geometry.clone();
        geometry.spawn_areas.clear();
        WildlifeSystem::new(&geometry, &Tuning::default(), 7)
    }

    fn home() -> Rect {
        Rect::new(Vec2::new(100.0, 600.0), Vec2::new(300.0, 700.0))
    }

    fn wandering() -> AgentState {
        AgentState::Wandering {
            turn_in: 10.0,
            cooldown: 0.0,
        }
    }

    fn state_changes(events: &[GameEvent]) -> Vec<(AgentStateKind, AgentStateKind)> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::AgentStateChanged { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_initial_population() {
        let level = training_level();
        let system = WildlifeSystem::new(&level.geometry, &Tuning::default(), 1);
        assert_eq!(system.live_count(Species::Chamois), 2);
        for agent in system.agents() {
            assert!(agent.home.contains(agent.pos));
            assert!(matches!(agent.state, AgentState::Idle { .. }));
        }
    }

    #[test]
    fn test_transition_table() {
        use AgentStateKind::*;
        assert!(Wandering.can_transition_to(Fleeing));
        assert!(Fleeing.can_transition_to(Wandering));
        assert!(!Fleeing.can_transition_to(Idle));
        assert!(!Wandering.can_transition_to(Idle));
        assert!(!Fled.can_transition_to(Wandering));
    }

    #[test]
    fn test_flee_triggers_at_radius() {
        let level = training_level();
        let mut system = empty_system(&level);
        let id = system.insert_agent(Species::Chamois, Vec2::new(200.0, 650.0), home(), wandering());
        let mut events = Vec::new();

        // Just outside the 150 radius
        system.update(DT, Vec2::new(200.0, 801.0), &level.geometry, &mut events);
        assert!(matches!(system.agent(id).map(|a| a.state), Some(AgentState::Wandering { .. })));

        let pos = system.agent(id).map(|a| a.pos).unwrap_or_default();
        system.update(DT, pos + Vec2::new(0.0, 150.0), &level.geometry, &mut events);
        let agent = system.agent(id).cloned().unwrap();
        assert!(matches!(agent.state, AgentState::Fleeing { .. }));
        assert!((agent.vel.length() - 80.0).abs() < 1e-3);
        assert!(agent.vel.y < 0.0, "flees away from the vehicle below it");
    }

    #[test]
    fn test_flee_is_symmetric() {
        let level = training_level();
        let mut system = empty_system(&level);
        let id = system.insert_agent(Species::Chamois, Vec2::new(200.0, 650.0), home(), wandering());
        let mut events = Vec::new();

        system.update(DT, Vec2::new(200.0, 700.0), &level.geometry, &mut events);
        system.update(DT, Vec2::new(500.0, 100.0), &level.geometry, &mut events);

        let agent = system.agent(id).cloned().unwrap();
        assert!(matches!(agent.state, AgentState::Wandering { cooldown, .. } if cooldown > 0.0));
        assert_eq!(
            state_changes(&events),
            vec![
                (AgentStateKind::Wandering, AgentStateKind::Fleeing),
                (AgentStateKind::Fleeing, AgentStateKind::Wandering),
            ]
        );
    }

    #[test]
    fn test_calmed_agent_walks_home_without_jumping() {
        let level = training_level();
        let mut system = empty_system(&level);
        let id = system.insert_agent(Species::Chamois, Vec2::new(200.0, 650.0), home(), wandering());
        let behaviour = Tuning::default().species(Species::Chamois);
        let max_step = behaviour.flee_speed.max(behaviour.wander_speed) * DT + 1e-3;
        let mut events = Vec::new();

        // Chase it uphill well past the top of its home
        for _ in 0..90 {
            let pos = system.agent(id).map(|a| a.pos).unwrap_or_default();
            system.update(DT, pos + Vec2::new(0.0, 50.0), &level.geometry, &mut events);
        }
        let agent = system.agent(id).cloned().unwrap();
        assert!(matches!(agent.state, AgentState::Fleeing { .. }));
        assert!(!home().contains(agent.pos));

        let mut last = agent.pos;
        let mut back_home = false;
        for _ in 0..(10 * 60) {
            system.update(DT, Vec2::new(600.0, 100.0), &level.geometry, &mut events);
            let agent = system.agent(id).cloned().unwrap();
            assert!(agent.pos.distance(last) <= max_step, "jumped from {last} to {}", agent.pos);
            assert!(agent.vel.length() <= behaviour.wander_speed + 1e-3);
            back_home |= home().contains(agent.pos);
            last = agent.pos;
        }
        assert!(back_home);
        assert!(home().contains(last));
        assert_eq!(
            state_changes(&events),
            vec![
                (AgentStateKind::Wandering, AgentStateKind::Fleeing),
                (AgentStateKind::Fleeing, AgentStateKind::Wandering),
            ]
        );
    }

    #[test]
    fn test_cooldown_blocks_retrigger() {
        let level = training_level();
        let mut system = empty_system(&level);
        let id = system.insert_agent(
            Species::Chamois,
            Vec2::new(200.0, 650.0),
            home(),
            AgentState::Wandering {
                turn_in: 10.0,
                cooldown: 1.0,
            },
        );
        let mut events = Vec::new();
        system.update(DT, Vec2::new(200.0, 660.0), &level.geometry, &mut events);
        assert!(matches!(system.agent(id).map(|a| a.state), Some(AgentState::Wandering { .. })));
    }

    #[test]
    fn test_fled_agents_are_removed() {
        let level = training_level();
        let mut system = empty_system(&level);
        let id = system.insert_agent(
            Species::Chamois,
            Vec2::new(200.0, 650.0),
            home(),
            AgentState::Fleeing { elapsed: 0.0 },
        );
        let mut events = Vec::new();
        for _ in 0..600 {
            // Chase it so it never calms down
            let Some(pos) = system.agent(id).map(|a| a.pos) else {
                break;
            };
            system.update(DT, pos + Vec2::new(0.0, 50.0), &level.geometry, &mut events);
        }
        assert!(system.agent(id).is_none());
        assert!(events.iter().any(|e| matches!(e, GameEvent::AgentRemoved { agent_id, .. } if *agent_id == id)));
    }

    #[test]
    fn test_wanderer_stays_home_and_out_of_buildings() {
        let level = training_level();
        let mut system = empty_system(&level);
        let id = system.insert_agent(Species::Fox, Vec2::new(150.0, 650.0), home(), wandering());
        let mut events = Vec::new();
        for _ in 0..1200 {
            system.update(DT, Vec2::new(500.0, 100.0), &level.geometry, &mut events);
            let agent = system.agent(id).cloned().unwrap();
            assert!(home().contains(agent.pos));
            assert!(!level.geometry.is_blocked(agent.pos));
        }
        assert!(events.iter().any(|e| matches!(e, GameEvent::AgentTrack { .. })));
    }

    #[test]
    fn test_spawns_respect_cap() {
        let level = training_level();
        let tuning = Tuning::default();
        let mut system = WildlifeSystem::new(&level.geometry, &tuning, 3);
        let mut events = Vec::new();
        for _ in 0..(120 * 60) {
            system.update(DT, Vec2::new(500.0, 100.0), &level.geometry, &mut events);
            assert!(system.live_count(Species::Chamois) <= tuning.population_cap(Species::Chamois) as usize);
        }
        assert_eq!(
            system.live_count(Species::Chamois),
            tuning.population_cap(Species::Chamois) as usize
        );
    }

    #[test]
    fn test_scheduled_area_is_a_copy() {
        let level = training_level();
        let mut geometry = level.geometry.clone();
        let system = WildlifeSystem::new(&geometry, &Tuning::default(), 3);
        let scheduled = system.scheduler().pending()[0].area;
        geometry.spawn_areas[0].area = Rect::new(Vec2::ZERO, Vec2::ONE);
        assert_eq!(system.scheduler().pending()[0].area, scheduled);
        assert_ne!(scheduled, geometry.spawn_areas[0].area);
    }

    #[test]
    fn test_same_seed_same_herd() {
        let level = training_level();
        let tuning = Tuning::default();
        let run = || {
            let mut system = WildlifeSystem::new(&level.geometry, &tuning, 42);
            let mut events = Vec::new();
            for i in 0..600 {
                let vehicle = Vec2::new(320.0, 900.0 - i as f32);
                system.update(DT, vehicle, &level.geometry, &mut events);
            }
            (system.agents().to_vec(), events)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_reset_restores_initial_herd() {
        let level = training_level();
        let mut system = WildlifeSystem::new(&level.geometry, &Tuning::default(), 9);
        let initial = system.agents().to_vec();
        let mut events = Vec::new();
        for _ in 0..300 {
            system.update(DT, Vec2::new(200.0, 650.0), &level.geometry, &mut events);
        }
        system.reset(&level.geometry);
        assert_eq!(system.agents(), initial.as_slice());
    }
}
