//! Fixed timestep simulation tick
//!
//! Advances the world by one step: agent motion, other movers, contact
//! resolution through the environment's [`OutcomeTable`], then the sweep.
//! Episode bookkeeping (timeouts, resets) is the engine's job.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{
    Outcome, OutcomeTable, RewardKind, boxes_overlap, crosses_world_edge, entities_overlap,
    outside_world, reflect_velocity,
};
use super::entity::EntityKind;
use super::state::{CollisionRecord, World};
use crate::consts::ROW_TOLERANCE;
use crate::settings::Rewards;

/// Number of valid action codes
pub const NUM_ACTIONS: i32 = 15;
/// Codes below this are pure moves
pub const NUM_MOVES: i32 = 9;
/// Move code of the neutral action
pub const NEUTRAL_MOVE: i32 = 4;

/// One discrete action code per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action(pub i32);

impl Action {
    pub const LEFT: Action = Action(1);
    pub const STAY: Action = Action(4);
    pub const RIGHT: Action = Action(7);
    pub const FIRE: Action = Action(9);
    /// Ends the episode immediately; the default action is applied instead
    pub const FORCE_RESET: Action = Action(-1);

    pub fn is_valid(self) -> bool {
        (0..NUM_ACTIONS).contains(&self.0)
    }

    /// Split into `(move, special)`. Moves are 0..9; codes 9..15 keep the
    /// agent neutral and carry `special = code - 8`.
    pub fn decode(self) -> Option<(i32, i32)> {
        match self.0 {
            code @ 0..NUM_MOVES => Some((code, 0)),
            code @ NUM_MOVES..NUM_ACTIONS => Some((NEUTRAL_MOVE, code - (NUM_MOVES - 1))),
            _ => None,
        }
    }
}

impl Default for Action {
    fn default() -> Self {
        Action::STAY
    }
}

/// Input for a single tick (deterministic)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    /// Velocity the agent is steering towards (already scaled by max speed)
    pub target_vel: Vec2,
    /// Blend factor between the current and target velocity
    pub mix_rate: f32,
}

/// Advance the world by one tick.
///
/// Writes reward, done, level completion, the agent's normalized position
/// and the last agent collision into `world.step`. The caller clears the
/// step data beforehand.
pub fn advance(world: &mut World, rules: &OutcomeTable, rewards: &Rewards, input: &TickInput) {
    move_agent(world, input);
    move_others(world, rules);
    resolve_agent_contacts(world, rules, rewards);
    resolve_source_contacts(world, rules, rewards);

    let swept = world.entities.sweep();
    if swept > 0 {
        log::trace!("swept {swept} entities");
    }

    if let Some(agent) = world.entities.agent() {
        let norm = world.normalize(agent.pos);
        world.step.agent_x = norm.x;
        world.step.agent_y = norm.y;
    }
}

fn move_agent(world: &mut World, input: &TickInput) {
    let size = world.size;
    let Some(agent) = world.entities.agent_mut() else {
        return;
    };

    agent.vel = (1.0 - input.mix_rate) * agent.vel + input.mix_rate * input.target_vel;
    agent.pos += agent.vel;

    // World edges block the agent
    let lo = agent.half;
    let hi = size - agent.half;
    if agent.pos.x < lo.x || agent.pos.x > hi.x {
        agent.pos.x = agent.pos.x.clamp(lo.x, hi.x.max(lo.x));
        agent.vel.x = 0.0;
    }
    if agent.pos.y < lo.y || agent.pos.y > hi.y {
        agent.pos.y = agent.pos.y.clamp(lo.y, hi.y.max(lo.y));
        agent.vel.y = 0.0;
    }
}

fn move_others(world: &mut World, rules: &OutcomeTable) {
    let size = world.size;

    for index in 1..world.entities.len() {
        let Some(entity) = world.entities.get(index) else {
            break;
        };
        if entity.remove {
            continue;
        }

        if entity.vel != Vec2::ZERO {
            if rules.is_reflector(entity.kind) {
                // One axis at a time: a blocked axis keeps its old coordinate
                // and flips its velocity component.
                let mut pos = entity.pos;
                let mut vel = entity.vel;
                for axis in [Vec2::X, Vec2::Y] {
                    let candidate = pos + vel * axis;
                    if reflect_blocked(world, rules, index, candidate) {
                        vel = reflect_velocity(vel, axis);
                    } else {
                        pos = candidate;
                    }
                }
                if let Some(entity) = world.entities.get_mut(index) {
                    entity.pos = pos;
                    entity.vel = vel;
                }
            } else if let Some(entity) = world.entities.get_mut(index) {
                entity.pos += entity.vel;
                if outside_world(entity.pos, entity.half, size) {
                    entity.remove = true;
                }
            }
        }

        if let Some(entity) = world.entities.get_mut(index)
            && let Some(ticks) = entity.expire_ticks.as_mut()
        {
            *ticks = ticks.saturating_sub(1);
            if *ticks == 0 {
                entity.remove = true;
            }
        }
    }
}

/// Whether the mover at `index` would touch something it bounces off if
/// it were at `pos`.
fn reflect_blocked(world: &World, rules: &OutcomeTable, index: usize, pos: Vec2) -> bool {
    let entities = world.entities.as_slice();
    let mover = &entities[index];

    if rules.reflects(mover.kind, EntityKind::OutOfBoundsWall)
        && crosses_world_edge(pos, mover.half, world.size)
    {
        return true;
    }

    entities.iter().enumerate().any(|(other_index, other)| {
        other_index != index
            && !other.remove
            && rules.reflects(mover.kind, other.kind)
            && boxes_overlap(pos, mover.half, other.pos, other.half)
    })
}

fn resolve_agent_contacts(world: &mut World, rules: &OutcomeTable, rewards: &Rewards) {
    if world.entities.agent().is_none() {
        return;
    }

    for target in 1..world.entities.len() {
        let entities = world.entities.as_slice();
        let other = &entities[target];
        if other.remove || !entities_overlap(&entities[0], other) {
            continue;
        }
        let Some(outcome) = rules.lookup(EntityKind::Player, other.kind).copied() else {
            continue;
        };

        let norm = world.normalize(other.pos);
        world.step.collision = Some(CollisionRecord {
            x: norm.x,
            y: norm.y,
            kind: other.kind,
        });
        log::debug!("agent hit {:?} at ({:.2}, {:.2})", other.kind, other.pos.x, other.pos.y);

        apply_outcome(world, rewards, &outcome, 0, target);
    }
}

fn resolve_source_contacts(world: &mut World, rules: &OutcomeTable, rewards: &Rewards) {
    for source in 1..world.entities.len() {
        let kind = world.entities.as_slice()[source].kind;
        if !rules.is_source(kind) {
            continue;
        }

        for target in 1..world.entities.len() {
            let entities = world.entities.as_slice();
            let src = &entities[source];
            if src.remove {
                break;
            }
            let other = &entities[target];
            if target == source || other.remove || !entities_overlap(src, other) {
                continue;
            }
            if let Some(outcome) = rules.lookup(src.kind, other.kind).copied() {
                log::debug!("{:?} hit {:?}", src.kind, other.kind);
                apply_outcome(world, rewards, &outcome, source, target);
            }
        }
    }
}

fn apply_outcome(world: &mut World, rewards: &Rewards, outcome: &Outcome, source: usize, target: usize) {
    // Only the first terminal contact of a tick pays out
    let already_over = outcome.terminal && world.step.done;
    if let Some(kind) = outcome.reward
        && !already_over
    {
        world.step.reward += reward_amount(rewards, kind);
    }
    if outcome.terminal {
        world.step.done = true;
    }
    if outcome.level_complete {
        world.step.level_complete = true;
    }

    let target_y = world.entities.as_slice()[target].pos.y;
    if outcome.remove_target
        && let Some(entity) = world.entities.get_mut(target)
    {
        entity.remove = true;
    }
    // The agent is never consumed
    if outcome.remove_source
        && source != 0
        && let Some(entity) = world.entities.get_mut(source)
    {
        entity.remove = true;
    }

    if let Some(kind) = outcome.unlock_row {
        match world.entities.first_in_row(kind, target_y, ROW_TOLERANCE) {
            Some(index) => {
                if let Some(entity) = world.entities.get_mut(index) {
                    entity.remove = true;
                }
            }
            None => log::debug!("no {kind:?} in row {target_y:.2}"),
        }
    }
}

fn reward_amount(rewards: &Rewards, kind: RewardKind) -> f32 {
    match kind {
        RewardKind::Positive => rewards.positive,
        RewardKind::Negative => rewards.negative,
        RewardKind::WallHit => rewards.wall_hit,
        RewardKind::Completion => rewards.completion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::Entity;

    fn rules() -> OutcomeTable {
        OutcomeTable::new()
            .on(
                EntityKind::Player,
                EntityKind::Barrier,
                Outcome::none().reward(RewardKind::WallHit).terminal(),
            )
            .on(
                EntityKind::Player,
                EntityKind::GoodObj,
                Outcome::none().reward(RewardKind::Positive).consume_target(),
            )
            .on(
                EntityKind::Player,
                EntityKind::Present,
                Outcome::none().reward(RewardKind::Completion).completes_level(),
            )
            .on(
                EntityKind::PlayerBullet,
                EntityKind::Lock,
                Outcome::none()
                    .consume_source()
                    .consume_target()
                    .unlock_row(EntityKind::LockedDoor),
            )
            .reflect(EntityKind::BadObj, EntityKind::Barrier)
            .reflect(EntityKind::BadObj, EntityKind::OutOfBoundsWall)
    }

    fn world_with_agent(x: f32, y: f32) -> World {
        let mut world = World::new(Vec2::new(10.0, 20.0));
        world.entities.spawn(Entity::new(
            EntityKind::Player,
            Vec2::new(x, y),
            Vec2::splat(0.5),
        ));
        world
    }

    fn still() -> TickInput {
        TickInput {
            target_vel: Vec2::ZERO,
            mix_rate: 0.5,
        }
    }

    #[test]
    fn action_decoding() {
        assert_eq!(Action::STAY.decode(), Some((4, 0)));
        assert_eq!(Action(0).decode(), Some((0, 0)));
        assert_eq!(Action::FIRE.decode(), Some((4, 1)));
        assert_eq!(Action(14).decode(), Some((4, 6)));
        assert_eq!(Action(15).decode(), None);
        assert_eq!(Action::FORCE_RESET.decode(), None);
        assert!(!Action::FORCE_RESET.is_valid());
    }

    #[test]
    fn agent_collects_good_object() {
        let mut world = world_with_agent(5.0, 0.5);
        world
            .entities
            .spawn(Entity::new(EntityKind::GoodObj, Vec2::new(5.0, 1.2), Vec2::splat(0.5)));

        advance(&mut world, &rules(), &Rewards::default(), &still());

        assert_eq!(world.step.reward, 1.0);
        assert!(!world.step.done);
        assert_eq!(world.entities.count(EntityKind::GoodObj), 0);
        let (x, y, kind) = world.step.collision_fields();
        assert!((x - 0.5).abs() < 1e-6);
        assert!((y - 0.06).abs() < 1e-6);
        assert_eq!(kind, 7);
        assert!((world.step.agent_x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn barrier_is_terminal_with_configured_reward() {
        let mut world = world_with_agent(5.0, 0.5);
        world
            .entities
            .spawn(Entity::new(EntityKind::Barrier, Vec2::new(5.0, 1.0), Vec2::new(2.0, 0.3)));
        let rewards = Rewards {
            wall_hit: -1.5,
            ..Rewards::default()
        };

        advance(&mut world, &rules(), &rewards, &still());

        assert!(world.step.done);
        assert!(!world.step.level_complete);
        assert_eq!(world.step.reward, -1.5);
        // Walls stay put
        assert_eq!(world.entities.count(EntityKind::Barrier), 1);
    }

    #[test]
    fn present_completes_level() {
        let mut world = world_with_agent(5.0, 19.5);
        world
            .entities
            .spawn(Entity::new(EntityKind::Present, Vec2::new(5.5, 19.5), Vec2::splat(0.5)));

        advance(&mut world, &rules(), &Rewards::default(), &still());

        assert!(world.step.done && world.step.level_complete);
        assert_eq!(world.step.reward, 10.0);
    }

    #[test]
    fn goal_pays_once_when_touching_two_presents() {
        let mut world = world_with_agent(5.0, 19.5);
        for x in [4.5, 5.5] {
            world
                .entities
                .spawn(Entity::new(EntityKind::Present, Vec2::new(x, 19.5), Vec2::splat(0.5)));
        }

        advance(&mut world, &rules(), &Rewards::default(), &still());

        assert_eq!(world.step.reward, 10.0);
        // Last contact is the one echoed
        let (x, _, _) = world.step.collision_fields();
        assert!((x - 0.55).abs() < 1e-6);
    }

    #[test]
    fn agent_is_blocked_by_world_edge() {
        let mut world = world_with_agent(0.5, 0.5);
        let input = TickInput {
            target_vel: Vec2::new(-0.85, 0.0),
            mix_rate: 0.5,
        };
        advance(&mut world, &rules(), &Rewards::default(), &input);

        let agent = world.entities.agent().unwrap();
        assert_eq!(agent.pos.x, 0.5);
        assert_eq!(agent.vel.x, 0.0);
    }

    #[test]
    fn agent_velocity_mixes_towards_target() {
        let mut world = world_with_agent(5.0, 5.0);
        let input = TickInput {
            target_vel: Vec2::new(0.85, 0.17),
            mix_rate: 0.5,
        };
        advance(&mut world, &rules(), &Rewards::default(), &input);
        advance(&mut world, &rules(), &Rewards::default(), &input);

        let agent = world.entities.agent().unwrap();
        // 0.425 then 0.6375
        assert!((agent.vel.x - 0.6375).abs() < 1e-5);
        assert!((agent.pos.x - (5.0 + 0.425 + 0.6375)).abs() < 1e-5);
    }

    #[test]
    fn hazard_reflects_off_barrier() {
        let mut world = world_with_agent(1.0, 0.5);
        world.entities.spawn(
            Entity::new(EntityKind::BadObj, Vec2::new(5.0, 5.0), Vec2::splat(0.5))
                .with_velocity(Vec2::new(0.5, 0.0)),
        );
        world
            .entities
            .spawn(Entity::new(EntityKind::Barrier, Vec2::new(6.2, 5.0), Vec2::splat(0.3)));

        advance(&mut world, &rules(), &Rewards::default(), &still());

        let hazard = world.entities.get(1).unwrap();
        assert_eq!(hazard.kind, EntityKind::BadObj);
        assert_eq!(hazard.pos, Vec2::new(5.0, 5.0));
        assert_eq!(hazard.vel, Vec2::new(-0.5, 0.0));
    }

    #[test]
    fn hazard_reflects_off_world_edge() {
        let mut world = world_with_agent(5.0, 0.5);
        world.entities.spawn(
            Entity::new(EntityKind::BadObj, Vec2::new(9.3, 5.0), Vec2::splat(0.5))
                .with_velocity(Vec2::new(0.4, 0.2)),
        );

        advance(&mut world, &rules(), &Rewards::default(), &still());

        let hazard = world.entities.get(1).unwrap();
        assert_eq!(hazard.vel, Vec2::new(-0.4, 0.2));
        assert!((hazard.pos.x - 9.3).abs() < 1e-6);
        assert!((hazard.pos.y - 5.2).abs() < 1e-6);
    }

    #[test]
    fn key_opens_first_door_in_row() {
        let mut world = world_with_agent(5.0, 0.5);
        world.entities.spawn(
            Entity::new(EntityKind::PlayerBullet, Vec2::new(3.0, 7.6), Vec2::splat(0.25))
                .with_velocity(Vec2::new(0.0, 0.5))
                .with_expiry(8),
        );
        world
            .entities
            .spawn(Entity::new(EntityKind::Lock, Vec2::new(3.0, 8.15), Vec2::new(0.25, 0.45)));
        world
            .entities
            .spawn(Entity::new(EntityKind::LockedDoor, Vec2::new(6.0, 8.0), Vec2::new(2.0, 0.3)));
        world
            .entities
            .spawn(Entity::new(EntityKind::LockedDoor, Vec2::new(6.0, 12.0), Vec2::new(2.0, 0.3)));

        advance(&mut world, &rules(), &Rewards::default(), &still());

        assert_eq!(world.entities.count(EntityKind::PlayerBullet), 0);
        assert_eq!(world.entities.count(EntityKind::Lock), 0);
        let doors: Vec<f32> = world
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::LockedDoor)
            .map(|e| e.pos.y)
            .collect();
        assert_eq!(doors, vec![12.0]);
        // Contacts between other entities are not agent collisions
        assert_eq!(world.step.collision, None);
    }

    #[test]
    fn stray_lock_hit_removes_only_lock_and_key() {
        let mut world = world_with_agent(5.0, 0.5);
        world.entities.spawn(
            Entity::new(EntityKind::PlayerBullet, Vec2::new(3.0, 7.6), Vec2::splat(0.25))
                .with_velocity(Vec2::new(0.0, 0.5)),
        );
        world
            .entities
            .spawn(Entity::new(EntityKind::Lock, Vec2::new(3.0, 8.15), Vec2::new(0.25, 0.45)));

        advance(&mut world, &rules(), &Rewards::default(), &still());
        assert_eq!(world.entities.len(), 1);
    }

    #[test]
    fn projectiles_expire_and_leave_the_world() {
        let mut world = world_with_agent(5.0, 0.5);
        world.entities.spawn(
            Entity::new(EntityKind::PlayerBullet, Vec2::new(2.0, 10.0), Vec2::splat(0.25))
                .with_velocity(Vec2::new(0.0, 0.5))
                .with_expiry(3),
        );
        world.entities.spawn(
            Entity::new(EntityKind::PlayerBullet, Vec2::new(8.0, 19.9), Vec2::splat(0.25))
                .with_velocity(Vec2::new(0.0, 0.5)),
        );

        advance(&mut world, &rules(), &Rewards::default(), &still());
        // The second key left through the top edge
        assert_eq!(world.entities.count(EntityKind::PlayerBullet), 1);

        advance(&mut world, &rules(), &Rewards::default(), &still());
        assert_eq!(world.entities.count(EntityKind::PlayerBullet), 1);
        advance(&mut world, &rules(), &Rewards::default(), &still());
        assert_eq!(world.entities.count(EntityKind::PlayerBullet), 0);
    }
}
