//! rapier2d world adapter
//!
//! The [`PhysicsWorld`] owns every rigid body in the game. Gameplay entities
//! only hold [`BodyHandle`]s and a body's [`EntityKind`] tag is fixed when the
//! body is created. Each step:
//!
//! 1. rapier advances the world by the fixed dt.
//! 2. Collision-started events are collected through a channel.
//! 3. Events are mapped back to tag pairs and returned as [`Contact`]s,
//!    ordered by body handle so dispatch order is stable.
//!
//! Bodies are only removed through [`BodyTeardown::destroy_body`], which the
//! destruction queue calls at the top of a frame.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use glam::Vec2;
use rapier2d::prelude::*;

use super::destruction::BodyTeardown;
use super::state::EntityId;

/// Back-reference from a body to the gameplay entity (or sentinel) owning it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Ball(EntityId),
    Paddle,
    Brick(EntityId),
    Bullet(EntityId),
    /// Sensor strip along the bottom edge of the field
    Floor,
    /// Top, left and right field bounds
    Wall,
}

/// Opaque, non-owning handle to a body in the [`PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(RigidBodyHandle);

impl BodyHandle {
    /// Raw (index, generation) pair, used for stable ordering
    pub fn raw_parts(&self) -> (u32, u32) {
        self.0.into_raw_parts()
    }

    #[cfg(test)]
    pub(crate) fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self(RigidBodyHandle::from_raw_parts(index, generation))
    }
}

/// Collision shape, in world units, relative to the body origin
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Cuboid { half_width: f32, half_height: f32 },
    Ball { radius: f32 },
    /// Convex polygon given by its vertices
    Convex(Vec<Vec2>),
}

/// Material and simulation flags for a new body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyFlags {
    pub sensor: bool,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub gravity_scale: f32,
    /// Continuous collision detection for fast movers
    pub ccd: bool,
}

impl Default for BodyFlags {
    fn default() -> Self {
        Self {
            sensor: false,
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
            gravity_scale: 1.0,
            ccd: false,
        }
    }
}

impl BodyFlags {
    pub fn sensor() -> Self {
        Self {
            sensor: true,
            ..Self::default()
        }
    }
}

/// Two bodies began touching during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub a: EntityKind,
    pub b: EntityKind,
}

impl Contact {
    pub fn new(a: EntityKind, b: EntityKind) -> Self {
        Self { a, b }
    }
}

#[inline]
fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

#[inline]
fn to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

fn build_collider(shape: &Shape, flags: &BodyFlags) -> Collider {
    let builder = match shape {
        Shape::Cuboid {
            half_width,
            half_height,
        } => ColliderBuilder::cuboid(*half_width, *half_height),
        Shape::Ball { radius } => ColliderBuilder::ball(*radius),
        Shape::Convex(vertices) => {
            let points: Vec<Point<Real>> = vertices.iter().map(|v| point![v.x, v.y]).collect();
            match ColliderBuilder::convex_hull(&points) {
                Some(builder) => builder,
                None => {
                    // Degenerate hull, fall back to its bounding box
                    log::warn!("Degenerate convex shape with {} vertices", vertices.len());
                    let half = vertices
                        .iter()
                        .fold(Vec2::splat(0.01), |acc, v| acc.max(v.abs()));
                    ColliderBuilder::cuboid(half.x, half.y)
                }
            }
        }
    };

    builder
        .sensor(flags.sensor)
        .density(flags.density)
        .friction(flags.friction)
        .friction_combine_rule(CoefficientCombineRule::Min)
        .restitution(flags.restitution)
        .restitution_combine_rule(CoefficientCombineRule::Max)
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .build()
}

/// Owns the rapier2d simulation state and the body → entity tags
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Tag of every live body, set once at creation
    tags: HashMap<BodyHandle, EntityKind>,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: to_vector(gravity),
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            tags: HashMap::new(),
        }
    }

    /// Body moved by game logic; collides with dynamic bodies only
    pub fn create_kinematic_body(
        &mut self,
        shape: Shape,
        position: Vec2,
        flags: BodyFlags,
        tag: EntityKind,
    ) -> BodyHandle {
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(to_vector(position))
            .build();
        self.insert(body, &shape, &flags, tag)
    }

    /// Fully simulated body
    pub fn create_dynamic_body(
        &mut self,
        shape: Shape,
        position: Vec2,
        flags: BodyFlags,
        tag: EntityKind,
    ) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .gravity_scale(flags.gravity_scale)
            .linear_damping(0.0)
            .angular_damping(0.0)
            .ccd_enabled(flags.ccd)
            .build();
        self.insert(body, &shape, &flags, tag)
    }

    /// Immovable body
    pub fn create_static_body(
        &mut self,
        shape: Shape,
        position: Vec2,
        flags: BodyFlags,
        tag: EntityKind,
    ) -> BodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(to_vector(position))
            .build();
        self.insert(body, &shape, &flags, tag)
    }

    fn insert(
        &mut self,
        body: RigidBody,
        shape: &Shape,
        flags: &BodyFlags,
        tag: EntityKind,
    ) -> BodyHandle {
        let handle = self.rigid_body_set.insert(body);
        let collider = build_collider(shape, flags);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        let handle = BodyHandle(handle);
        self.tags.insert(handle, tag);
        log::trace!("Created body {:?} for {:?}", handle.raw_parts(), tag);
        handle
    }

    /// Advance the world by `dt` and return the contacts that began during it.
    pub fn step(
        &mut self,
        dt: f32,
        velocity_iterations: usize,
        position_iterations: usize,
    ) -> Vec<Contact> {
        self.integration_params.dt = dt;
        if let Some(iterations) = NonZeroUsize::new(velocity_iterations) {
            self.integration_params.num_solver_iterations = iterations;
        }
        self.integration_params.num_internal_pgs_iterations = position_iterations.max(1);

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        let mut started = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _flags) = event {
                if let (Some(a), Some(b)) = (self.owner(h1), self.owner(h2)) {
                    started.push((a, b));
                }
            }
        }

        // Channel delivery order is not guaranteed; sort by body pair
        started.sort_by_key(|(a, b)| {
            let (a, b) = (a.raw_parts(), b.raw_parts());
            (a.min(b), a.max(b))
        });

        started
            .into_iter()
            .filter_map(|(a, b)| Some(Contact::new(self.tag(a)?, self.tag(b)?)))
            .collect()
    }

    fn owner(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        self.collider_set
            .get(collider)?
            .parent()
            .map(BodyHandle)
    }

    pub fn tag(&self, handle: BodyHandle) -> Option<EntityKind> {
        self.tags.get(&handle).copied()
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.tags.contains_key(&handle)
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.rigid_body_set
            .get(handle.0)
            .map(|rb| to_vec2(rb.translation()))
    }

    /// Teleport a body, waking it
    pub fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle.0) {
            rb.set_translation(to_vector(position), true);
        }
    }

    /// Target position a kinematic body reaches at the end of the next step
    pub fn move_kinematic(&mut self, handle: BodyHandle, target: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle.0) {
            rb.set_next_kinematic_translation(to_vector(target));
        }
    }

    pub fn linear_velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.rigid_body_set
            .get(handle.0)
            .map(|rb| to_vec2(rb.linvel()))
    }

    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle.0) {
            rb.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn set_angular_velocity(&mut self, handle: BodyHandle, angvel: f32) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle.0) {
            rb.set_angvel(angvel, true);
        }
    }

    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle.0) {
            rb.apply_impulse(to_vector(impulse), true);
        }
    }

    /// Swap every collider of a body for a single new one
    pub fn replace_shape(&mut self, handle: BodyHandle, shape: Shape, flags: BodyFlags) -> bool {
        let Some(rb) = self.rigid_body_set.get(handle.0) else {
            return false;
        };
        let old: Vec<ColliderHandle> = rb.colliders().to_vec();
        for collider in old {
            self.collider_set.remove(
                collider,
                &mut self.island_manager,
                &mut self.rigid_body_set,
                true,
            );
        }
        let collider = build_collider(&shape, &flags);
        self.collider_set
            .insert_with_parent(collider, handle.0, &mut self.rigid_body_set);
        true
    }

    /// Horizontal extent of a body's colliders, in world units
    pub fn body_width(&self, handle: BodyHandle) -> Option<f32> {
        let rb = self.rigid_body_set.get(handle.0)?;
        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        for collider in rb.colliders() {
            let aabb = self.collider_set.get(*collider)?.compute_aabb();
            min_x = min_x.min(aabb.mins.x);
            max_x = max_x.max(aabb.maxs.x);
        }
        (max_x >= min_x).then_some(max_x - min_x)
    }
}

impl BodyTeardown for PhysicsWorld {
    fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        let Some(tag) = self.tags.remove(&handle) else {
            return false;
        };
        self.rigid_body_set.remove(
            handle.0,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        log::trace!("Destroyed body {:?} ({:?})", handle.raw_parts(), tag);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(Vec2::new(0.0, GRAVITY_Y))
    }

    #[test]
    fn test_falling_ball_reports_floor_contact() {
        let mut world = world();
        let floor = world.create_static_body(
            Shape::Cuboid {
                half_width: 32.0,
                half_height: 0.05,
            },
            Vec2::new(16.0, 24.0),
            BodyFlags::sensor(),
            EntityKind::Floor,
        );
        world.create_dynamic_body(
            Shape::Ball { radius: 0.4 },
            Vec2::new(16.0, 22.0),
            BodyFlags::default(),
            EntityKind::Ball(7),
        );

        let mut contacts = Vec::new();
        for _ in 0..120 {
            contacts.extend(world.step(SIM_DT, VELOCITY_ITERATIONS, POSITION_ITERATIONS));
        }

        assert!(contacts.iter().any(|c| {
            matches!(
                (c.a, c.b),
                (EntityKind::Ball(7), EntityKind::Floor) | (EntityKind::Floor, EntityKind::Ball(7))
            )
        }));
        assert_eq!(world.tag(floor), Some(EntityKind::Floor));
    }

    #[test]
    fn test_destroy_body_once() {
        let mut world = world();
        let body = world.create_dynamic_body(
            Shape::Ball { radius: 0.4 },
            Vec2::ZERO,
            BodyFlags::default(),
            EntityKind::Ball(1),
        );
        assert_eq!(world.body_count(), 1);

        assert!(world.destroy_body(body));
        assert!(!world.destroy_body(body));
        assert!(!world.contains(body));
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.position(body), None);
    }

    #[test]
    fn test_replace_shape_changes_width() {
        let mut world = world();
        let body = world.create_kinematic_body(
            Shape::Cuboid {
                half_width: 2.0,
                half_height: 0.5,
            },
            Vec2::new(10.0, 10.0),
            BodyFlags::default(),
            EntityKind::Paddle,
        );
        let before = world.body_width(body).unwrap();
        assert!((before - 4.0).abs() < 0.01);

        assert!(world.replace_shape(
            body,
            Shape::Cuboid {
                half_width: 3.0,
                half_height: 0.5,
            },
            BodyFlags::default(),
        ));
        let after = world.body_width(body).unwrap();
        assert!((after - 6.0).abs() < 0.01);
        assert_eq!(world.tag(body), Some(EntityKind::Paddle));
    }
}
