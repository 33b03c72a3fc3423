//! rapier2d world: kinematic hexagon walls and dynamic chord balls

use std::sync::Mutex;

use glam::Vec2;
use rapier2d::prelude::*;

use super::arena::Hexagon;
use super::ball::BallId;
use crate::consts::{BALL_RADIUS, HEX_RADIUS, HEX_SIDES, MAX_CCD_SUBSTEPS, WALL_THICKNESS};
use crate::params::SimConfig;

/// Collects collision events during a step
///
/// rapier requires `Send + Sync` handlers even in a single-threaded step.
#[derive(Default)]
struct EventCollector {
    events: Mutex<Vec<CollisionEvent>>,
}

impl EventCollector {
    fn drain(&self) -> Vec<CollisionEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventHandler for EventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Contact between a wall and a ball, as seen after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallContact {
    Started(BallId),
    Stopped(BallId),
}

/// The physics world
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    events: EventCollector,
    wall_bodies: [RigidBodyHandle; HEX_SIDES],
    wall_colliders: [ColliderHandle; HEX_SIDES],
    restitution: f32,
}

impl PhysicsWorld {
    pub fn new(arena: &Hexagon, config: &SimConfig) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let walls = arena.walls();
        let wall_bodies: [RigidBodyHandle; HEX_SIDES] = std::array::from_fn(|i| {
            let transform = walls[i].transform;
            let p = transform.position_2d();
            let body = RigidBodyBuilder::kinematic_position_based()
                .translation(vector![p.x, p.y])
                .rotation(transform.planar_angle())
                .build();
            bodies.insert(body)
        });
        let wall_colliders: [ColliderHandle; HEX_SIDES] = std::array::from_fn(|i| {
            let collider = ColliderBuilder::cuboid(HEX_RADIUS / 2.0, WALL_THICKNESS / 2.0)
                .restitution(config.restitution)
                .friction(0.0)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build();
            colliders.insert_with_parent(collider, wall_bodies[i], &mut bodies)
        });

        let params = IntegrationParameters {
            max_ccd_substeps: MAX_CCD_SUBSTEPS,
            ..Default::default()
        };

        log::debug!("Physics world created with {} walls", wall_bodies.len());

        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, -config.gravity],
            params,
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            events: EventCollector::default(),
            wall_bodies,
            wall_colliders,
            restitution: config.restitution,
        }
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.gravity = vector![0.0, -gravity];
    }

    /// Update restitution on every wall and ball collider
    pub fn set_restitution(&mut self, restitution: f32) {
        if self.restitution == restitution {
            return;
        }
        self.restitution = restitution;
        for (_, collider) in self.colliders.iter_mut() {
            collider.set_restitution(restitution);
        }
    }

    /// Queue the next kinematic pose of every wall
    pub fn sync_walls(&mut self, arena: &Hexagon) {
        for (wall, handle) in arena.walls().iter().zip(self.wall_bodies) {
            let Some(body) = self.bodies.get_mut(handle) else {
                continue;
            };
            let p = wall.transform.position_2d();
            body.set_next_kinematic_position(Isometry::new(
                vector![p.x, p.y],
                wall.transform.planar_angle(),
            ));
        }
    }

    /// Create a ball body at the arena centre tagged with its id
    pub fn spawn_ball(&mut self, id: BallId) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![0.0, 0.0])
            .linear_damping(0.0)
            .angular_damping(0.0)
            .lock_rotations()
            .ccd_enabled(true)
            .user_data(id.to_user_data())
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::ball(BALL_RADIUS)
            .restitution(self.restitution)
            .friction(0.0)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Destroy a body and its colliders; stale handles are ignored
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub fn body_position(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        let t = self.bodies.get(handle)?.translation();
        Some(Vec2::new(t.x, t.y))
    }

    /// Move a body and give it a velocity
    pub fn place_body(&mut self, handle: RigidBodyHandle, position: Vec2, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(vector![position.x, position.y], true);
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Advance by `dt` seconds and report wall/ball contacts
    pub fn step(&mut self, dt: f32) -> Vec<WallContact> {
        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &self.events,
        );

        self.events
            .drain()
            .into_iter()
            .filter_map(|event| {
                let ball = self.wall_ball_pair(event.collider1(), event.collider2())?;
                Some(if event.started() {
                    WallContact::Started(ball)
                } else {
                    WallContact::Stopped(ball)
                })
            })
            .collect()
    }

    /// Ball id when exactly one side is a wall; None for ball/ball or unknown pairs
    fn wall_ball_pair(&self, a: ColliderHandle, b: ColliderHandle) -> Option<BallId> {
        let other = match (self.is_wall(a), self.is_wall(b)) {
            (true, false) => b,
            (false, true) => a,
            _ => return None,
        };
        let parent = self.colliders.get(other)?.parent()?;
        BallId::from_user_data(self.bodies.get(parent)?.user_data)
    }

    fn is_wall(&self, collider: ColliderHandle) -> bool {
        self.wall_colliders.contains(&collider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::BallRegistry;

    #[test]
    fn test_ball_falls_and_hits_a_wall() {
        let arena = Hexagon::default();
        let mut world = PhysicsWorld::new(&arena, &SimConfig::default());
        let mut registry = BallRegistry::new();
        let id = registry.next_id();
        let handle = world.spawn_ball(id);
        assert_eq!(world.body_count(), HEX_SIDES + 1);

        let mut contacts = Vec::new();
        for _ in 0..120 {
            world.sync_walls(&arena);
            contacts.extend(world.step(1.0 / 60.0));
        }
        assert!(contacts.contains(&WallContact::Started(id)));
        // Closed hexagon keeps the ball inside
        let pos = world.body_position(handle).unwrap();
        assert!(pos.length() < HEX_RADIUS);
    }

    #[test]
    fn test_remove_body_is_idempotent() {
        let arena = Hexagon::default();
        let mut world = PhysicsWorld::new(&arena, &SimConfig::default());
        let mut registry = BallRegistry::new();
        let handle = world.spawn_ball(registry.next_id());
        world.remove_body(handle);
        world.remove_body(handle);
        assert_eq!(world.body_count(), HEX_SIDES);
        assert!(world.body_position(handle).is_none());
    }

    #[test]
    fn test_ball_contacts_are_silent() {
        let config = SimConfig {
            gravity: 0.0,
            ..SimConfig::default()
        };
        let arena = Hexagon::default();
        let mut world = PhysicsWorld::new(&arena, &config);
        let mut registry = BallRegistry::new();
        let a = world.spawn_ball(registry.next_id());
        let b = world.spawn_ball(registry.next_id());
        world.place_body(a, Vec2::new(-3.0, 0.0), Vec2::new(5.0, 0.0));
        world.place_body(b, Vec2::new(3.0, 0.0), Vec2::new(-5.0, 0.0));

        let mut contacts = Vec::new();
        for _ in 0..30 {
            contacts.extend(world.step(1.0 / 60.0));
        }
        assert!(contacts.is_empty(), "unexpected {contacts:?}");
    }
}
