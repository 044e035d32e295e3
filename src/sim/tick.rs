//! Fixed timestep frame loop and game modes
//!
//! [`Game`] owns the physics world, the destruction queue, the current
//! [`GameSession`] and the collaborators. One call to [`Game::tick`] advances
//! exactly one frame of `SIM_DT`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::dispatch;
use super::destruction::DestructionQueue;
use super::physics::{BodyFlags, EntityKind, PhysicsWorld, Shape};
use super::powerups::collect_powerups;
use super::state::{BallState, GameEvent, GameSession, Metrics, Sound};
use crate::assets::AssetProvider;
use crate::consts::*;
use crate::levels::LevelProvider;
use crate::persistence::ProgressStore;
use crate::settings::Tuning;
use crate::to_world;

/// Top-level game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    StartMenu,
    Playing,
    GameOver,
}

/// Input commands for a single frame. Flags are one-shot.
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer x in pixels (paddle target)
    pub pointer_x: Option<f32>,
    /// Launch balls resting on the paddle (primary button)
    pub launch: bool,
    /// Fire a bullet (secondary button)
    pub shoot: bool,
    /// Start menu: new game from level 0
    pub new_game: bool,
    /// Start menu: resume from the saved level
    pub continue_game: bool,
    /// Game over screen: back to the start menu
    pub acknowledge: bool,
    /// Let the built-in autopilot play
    pub autopilot: bool,
}

/// Thickness of the boundary walls (world units)
const WALL_THICKNESS: f32 = 1.0;

/// Static walls on three sides and the floor sensor below the field
fn build_walls(world: &mut PhysicsWorld) {
    let width = to_world(SCREEN_WIDTH);
    let height = to_world(SCREEN_HEIGHT);
    let half = WALL_THICKNESS / 2.0;
    let wall = |half_width, half_height| Shape::Cuboid {
        half_width,
        half_height,
    };

    let walls = [
        (wall(width / 2.0 + WALL_THICKNESS, half), Vec2::new(width / 2.0, -half)),
        (wall(half, height), Vec2::new(-half, height / 2.0)),
        (wall(half, height), Vec2::new(width + half, height / 2.0)),
    ];
    for (shape, position) in walls {
        world.create_static_body(shape, position, BodyFlags::default(), EntityKind::Wall);
    }

    world.create_static_body(
        wall(width / 2.0 + WALL_THICKNESS, half),
        Vec2::new(width / 2.0, height + half),
        BodyFlags::sensor(),
        EntityKind::Floor,
    );
}

/// What the frame's checks decided after the entity updates
enum FrameOutcome {
    Continue,
    Lost,
    Cleared,
}

/// The game: world, session, mode and collaborators
pub struct Game<A, L, P> {
    world: PhysicsWorld,
    queue: DestructionQueue,
    mode: Mode,
    session: Option<GameSession>,
    assets: A,
    levels: L,
    progress: P,
    tuning: Tuning,
    metrics: Metrics,
    seed: u64,
    sessions_started: u64,
    frame: u64,
    /// Events raised outside the session (mode changes)
    events: Vec<GameEvent>,
}

impl<A: AssetProvider, L: LevelProvider, P: ProgressStore> Game<A, L, P> {
    pub fn new(assets: A, levels: L, progress: P, tuning: Tuning, seed: u64) -> Self {
        let mut world = PhysicsWorld::new(Vec2::new(0.0, GRAVITY_Y));
        build_walls(&mut world);
        let metrics = Metrics::from_assets(&assets);
        log::info!(
            "Game ready: {} levels, progress saved: {}",
            levels.level_count(),
            progress.has_progress()
        );

        Self {
            world,
            queue: DestructionQueue::new(),
            mode: Mode::StartMenu,
            session: None,
            assets,
            levels,
            progress,
            tuning,
            metrics,
            seed,
            sessions_started: 0,
            frame: 0,
            events: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The running session; `None` in the start menu
    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Frames simulated so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Whether the pointer should be grabbed and hidden
    pub fn pointer_grabbed(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.pointer_grabbed)
    }

    /// "Continue" is only offered once progress has been saved
    pub fn can_continue(&self) -> bool {
        self.progress.has_progress()
    }

    /// Advance one frame and return what happened during it
    pub fn tick(&mut self, input: &TickInput) -> Vec<GameEvent> {
        self.frame += 1;

        match self.mode {
            Mode::StartMenu => {
                if input.new_game {
                    self.start_session(false);
                } else if input.continue_game && self.can_continue() {
                    self.start_session(true);
                }
            }
            Mode::Playing => self.step_playing(input),
            Mode::GameOver => {
                if input.acknowledge {
                    self.end_session();
                    self.set_mode(Mode::StartMenu);
                }
            }
        }

        self.flush_events()
    }

    fn step_playing(&mut self, input: &TickInput) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let world = &mut self.world;
        let queue = &mut self.queue;
        let tuning = &self.tuning;

        let input = if input.autopilot {
            autopilot(input, session, world, self.frame)
        } else {
            input.clone()
        };

        if input.launch {
            session.launch_balls(world, tuning);
        }
        if input.shoot {
            session.shoot(world, tuning);
        }

        queue.drain(world);

        if session.spawn_ball_pending {
            session.spawn_ball_pending = false;
            session.spawn_ball(world);
        }

        let contacts = world.step(SIM_DT, VELOCITY_ITERATIONS, POSITION_ITERATIONS);
        for contact in contacts {
            dispatch(session, queue, contact, tuning);
        }

        if session.resize_pending {
            session.resize_pending = false;
            let width = session.paddle.base_width;
            session.paddle.resize(world, width);
        }

        session.update_entities(world, queue, tuning, input.pointer_x);
        collect_powerups(session, world, tuning);

        let outcome = if session.lives <= 0 {
            FrameOutcome::Lost
        } else if session.bricks.is_empty() {
            FrameOutcome::Cleared
        } else {
            FrameOutcome::Continue
        };

        match outcome {
            FrameOutcome::Continue => {}
            FrameOutcome::Lost => self.game_over(),
            FrameOutcome::Cleared => self.advance_level(),
        }
    }

    /// Tear down any previous session and start a new one
    fn start_session(&mut self, resume: bool) {
        self.end_session();

        let level = if resume {
            self.progress.load_progress()
        } else {
            0
        };
        let seed = self.seed.wrapping_add(self.sessions_started);
        self.sessions_started += 1;

        let mut session =
            GameSession::new(&mut self.world, self.metrics, &self.tuning, level, seed);
        session.play(Sound::GameStart);
        log::info!("Session started at level {} (seed {})", level, seed);

        let grid = self.levels.get_level(level);
        if let Some(grid) = &grid {
            session.load_bricks(&mut self.world, &mut self.queue, grid);
        }
        self.session = Some(session);
        self.set_mode(Mode::Playing);

        if grid.is_none() {
            log::warn!("No level {}", level);
            self.game_over();
        }
    }

    /// Route every session body through the queue and drop the session
    fn end_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.teardown(&mut self.queue);
            log::info!("Session ended: level {}, score {}", session.level, session.score);
        }
        self.queue.drain(&mut self.world);
    }

    fn game_over(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.set_pointer_grabbed(false);
            log::info!("Game over with score {}", session.score);
        }
        self.set_mode(Mode::GameOver);
    }

    fn advance_level(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let cleared = session.level;
        let next = cleared + 1;
        session.emit(GameEvent::LevelCleared { level: cleared });
        log::info!("Level {} cleared", cleared);

        if next >= self.levels.level_count() {
            self.game_over();
            return;
        }
        if next > self.progress.load_progress() {
            self.progress.save_progress(next);
        }
        let Some(grid) = self.levels.get_level(next) else {
            log::warn!("No level {}", next);
            self.game_over();
            return;
        };

        session.level = next;
        session.load_bricks(&mut self.world, &mut self.queue, &grid);
        for ball in session.balls.drain(..) {
            self.queue.enqueue(ball.body);
        }
        session.spawn_ball_pending = false;
        session.spawn_ball(&mut self.world);
        log::info!("Level {} loaded with {} bricks", next, session.bricks.len());
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        log::info!("Mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.events.push(GameEvent::ModeChanged(mode));
    }

    /// Collect the frame's events and play their sounds
    fn flush_events(&mut self) -> Vec<GameEvent> {
        let mut events = std::mem::take(&mut self.events);
        if let Some(session) = self.session.as_mut() {
            events.extend(session.take_events());
        }
        for event in &events {
            if let GameEvent::Sound(sound) = event {
                self.assets.play_sound(sound.asset_name());
            }
        }
        events
    }
}

/// Fill in the input for a frame played by the autopilot
fn autopilot(input: &TickInput, session: &GameSession, world: &PhysicsWorld, frame: u64) -> TickInput {
    let mut input = input.clone();

    if session.balls.iter().any(|b| b.state == BallState::OnPaddle) {
        input.launch = true;
    }
    if session.ammo > 0 {
        input.shoot = true;
    }

    // Lowest ball that is on its way down
    let falling = session
        .balls
        .iter()
        .filter(|b| b.state == BallState::Moving)
        .filter_map(|b| {
            let velocity = world.linear_velocity(b.body)?;
            let position = b.position(world)?;
            (velocity.y > 0.0).then_some(position)
        })
        .max_by(|a, b| a.y.total_cmp(&b.y));

    let paddle_center = session.paddle.rect().center();
    let target = match falling {
        Some(ball) => {
            // Vary the contact point so the ball does not loop
            let offset = (frame as f32 * 0.05).sin() * session.paddle.width * 0.3;
            Some(ball.x + offset)
        }
        None => session
            .powerups
            .iter()
            .map(|p| p.rect.center())
            .min_by(|a, b| {
                a.distance_squared(paddle_center)
                    .total_cmp(&b.distance_squared(paddle_center))
            })
            .map(|p| p.x),
    };
    if target.is_some() {
        input.pointer_x = target;
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetTable;
    use crate::levels::{Grid, MapLoader};
    use crate::persistence::MemoryProgress;
    use crate::sim::powerups::apply_powerup;
    use crate::sim::rect::Rect;
    use crate::sim::state::{PowerUp, PowerUpKind};

    type TestGame = Game<AssetTable, MapLoader, MemoryProgress>;

    fn levels(count: usize) -> Vec<Grid> {
        (0..count).map(|_| vec![vec![1, 2, 1], vec![0, 3, 0]]).collect()
    }

    fn game_with(count: usize, progress: MemoryProgress) -> TestGame {
        Game::new(
            AssetTable::builtin(),
            MapLoader::from_grids(levels(count)),
            progress,
            Tuning::default(),
            1234,
        )
    }

    fn new_game(game: &mut TestGame) -> Vec<GameEvent> {
        game.tick(&TickInput {
            new_game: true,
            ..Default::default()
        })
    }

    /// Break every brick without touching the world
    fn clear_bricks(game: &mut TestGame) {
        let Some(session) = game.session.as_mut() else {
            panic!("no session");
        };
        let ids: Vec<_> = session.bricks.iter().map(|b| b.id).collect();
        for id in ids {
            session.destroy_brick(id, &mut game.queue, &game.tuning);
        }
    }

    #[test]
    fn test_new_game_enters_playing() {
        let mut game = game_with(3, MemoryProgress::default());
        assert_eq!(game.mode(), Mode::StartMenu);
        assert!(game.session().is_none());

        // Nothing happens without a menu choice
        game.tick(&TickInput::default());
        assert_eq!(game.mode(), Mode::StartMenu);

        let events = new_game(&mut game);
        assert_eq!(game.mode(), Mode::Playing);
        assert!(events.contains(&GameEvent::ModeChanged(Mode::Playing)));
        assert!(events.contains(&GameEvent::Sound(Sound::GameStart)));
        assert_eq!(game.assets().played(), ["sfx-08".to_string()]);

        let session = game.session().unwrap();
        assert_eq!(session.level, 0);
        assert_eq!(session.lives, 5);
        assert_eq!(session.bricks.len(), 4);
        assert_eq!(session.balls.len(), 1);
    }

    #[test]
    fn test_continue_requires_progress() {
        let mut game = game_with(3, MemoryProgress::default());
        game.tick(&TickInput {
            continue_game: true,
            ..Default::default()
        });
        assert_eq!(game.mode(), Mode::StartMenu);

        let mut game = game_with(3, MemoryProgress::with_level(2));
        game.tick(&TickInput {
            continue_game: true,
            ..Default::default()
        });
        assert_eq!(game.mode(), Mode::Playing);
        assert_eq!(game.session().unwrap().level, 2);
    }

    #[test]
    fn test_level_clear_advances_and_saves() {
        let mut game = game_with(3, MemoryProgress::default());
        new_game(&mut game);
        clear_bricks(&mut game);

        let events = game.tick(&TickInput::default());
        assert!(events.contains(&GameEvent::LevelCleared { level: 0 }));
        assert_eq!(game.mode(), Mode::Playing);
        let session = game.session().unwrap();
        assert_eq!(session.level, 1);
        assert_eq!(session.bricks.len(), 4);
        assert_eq!(session.balls.len(), 1);
        assert_eq!(session.balls[0].state, BallState::OnPaddle);
        assert_eq!(game.progress().saved, Some(1));
        assert_eq!(game.progress().writes, 1);
    }

    #[test]
    fn test_level_clear_keeps_higher_progress() {
        let mut game = game_with(3, MemoryProgress::with_level(2));
        new_game(&mut game);
        clear_bricks(&mut game);
        game.tick(&TickInput::default());

        assert_eq!(game.session().unwrap().level, 1);
        assert_eq!(game.progress().saved, Some(2));
        assert_eq!(game.progress().writes, 0);
    }

    #[test]
    fn test_clearing_last_level_ends_game() {
        let mut game = game_with(1, MemoryProgress::default());
        new_game(&mut game);
        clear_bricks(&mut game);

        let events = game.tick(&TickInput::default());
        assert_eq!(game.mode(), Mode::GameOver);
        assert!(events.contains(&GameEvent::ModeChanged(Mode::GameOver)));
        assert_eq!(game.progress().writes, 0);
    }

    #[test]
    fn test_last_life_lost_ends_game() {
        let mut game = game_with(3, MemoryProgress::default());
        new_game(&mut game);
        game.tick(&TickInput {
            launch: true,
            ..Default::default()
        });

        {
            let session = game.session.as_mut().unwrap();
            session.lives = 1;
            apply_powerup(PowerUpKind::Grow, session, &mut game.world, &game.tuning);
            assert!(session.paddle.width > session.paddle.base_width);

            // Drop the ball onto the floor sensor, away from the paddle
            let ball = &session.balls[0];
            let floor = Vec2::new(to_world(50.0), to_world(SCREEN_HEIGHT) + WALL_THICKNESS / 2.0);
            game.world.set_position(ball.body, floor);
            game.world.set_linear_velocity(ball.body, Vec2::new(0.0, 15.0));
        }

        let events = game.tick(&TickInput::default());
        assert_eq!(game.mode(), Mode::GameOver);
        assert!(events.contains(&GameEvent::BallLost { lives: 0 }));
        assert!(events.contains(&GameEvent::Sound(Sound::BallLost)));

        let session = game.session().unwrap();
        assert_eq!(session.lives, 0);
        assert!(!session.grow_active);
        assert_eq!(session.paddle.width, session.paddle.base_width);
        let body_width = game.world().body_width(session.paddle.body).unwrap();
        assert!((body_width - to_world(session.paddle.base_width)).abs() < 1e-3);
        assert!(!game.pointer_grabbed());
    }

    #[test]
    fn test_lost_ball_respawns_next_frame() {
        let mut game = game_with(3, MemoryProgress::default());
        new_game(&mut game);
        game.tick(&TickInput {
            launch: true,
            ..Default::default()
        });
        {
            let session = game.session.as_mut().unwrap();
            let ball = &session.balls[0];
            let floor = Vec2::new(to_world(50.0), to_world(SCREEN_HEIGHT) + WALL_THICKNESS / 2.0);
            game.world.set_position(ball.body, floor);
        }

        game.tick(&TickInput::default());
        let session = game.session().unwrap();
        assert_eq!(session.lives, 4);
        assert!(session.balls.is_empty());
        assert!(session.spawn_ball_pending);

        game.tick(&TickInput::default());
        let session = game.session().unwrap();
        assert_eq!(session.balls.len(), 1);
        assert_eq!(session.balls[0].state, BallState::OnPaddle);
        assert_eq!(game.mode(), Mode::Playing);
    }

    #[test]
    fn test_acknowledge_returns_to_menu() {
        let mut game = game_with(1, MemoryProgress::default());
        let walls = game.world().body_count();
        new_game(&mut game);
        clear_bricks(&mut game);
        game.tick(&TickInput::default());
        assert_eq!(game.mode(), Mode::GameOver);

        // Score stays readable until acknowledged
        assert!(game.session().is_some());
        game.tick(&TickInput {
            acknowledge: true,
            ..Default::default()
        });
        assert_eq!(game.mode(), Mode::StartMenu);
        assert!(game.session().is_none());
        assert_eq!(game.world().body_count(), walls);
    }

    #[test]
    fn test_restart_tears_down_previous_session() {
        let mut game = game_with(1, MemoryProgress::default());
        let walls = game.world().body_count();
        new_game(&mut game);
        clear_bricks(&mut game);
        game.tick(&TickInput::default());
        game.tick(&TickInput {
            acknowledge: true,
            ..Default::default()
        });
        new_game(&mut game);

        // paddle + ball + 4 bricks
        assert_eq!(game.world().body_count(), walls + 6);
        assert_eq!(game.session().unwrap().score, 0);
    }

    #[test]
    fn test_autopilot_launches_and_shoots() {
        let mut game = game_with(3, MemoryProgress::default());
        new_game(&mut game);
        game.session.as_mut().unwrap().ammo = 3;

        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        let events = game.tick(&input);
        let session = game.session().unwrap();
        assert_eq!(session.balls[0].state, BallState::Moving);
        assert_eq!(session.ammo, 2);
        assert!(events.contains(&GameEvent::Sound(Sound::Launch)));
        assert!(events.contains(&GameEvent::Sound(Sound::Shot)));
    }

    fn assert_ball_speeds(game: &TestGame) {
        let Some(session) = game.session() else {
            return;
        };
        let tuning = game.tuning();
        for ball in session.balls.iter().filter(|b| b.state == BallState::Moving) {
            let speed = game.world().linear_velocity(ball.body).unwrap().length();
            assert!(
                speed == 0.0
                    || (speed >= tuning.min_ball_speed - 1e-3
                        && speed <= tuning.max_ball_speed + 1e-3),
                "frame {} ball {} speed {}",
                game.frame(),
                ball.id,
                speed
            );
        }
    }

    #[test]
    fn test_picked_up_balls_respect_speed_limits() {
        let mut game = game_with(3, MemoryProgress::default());
        new_game(&mut game);
        game.tick(&TickInput {
            launch: true,
            ..Default::default()
        });

        for kind in [PowerUpKind::BallMulti, PowerUpKind::Ball] {
            let session = game.session.as_mut().unwrap();
            let id = session.next_entity_id();
            let size = session.metrics().powerup;
            let center = session.paddle.rect().center();
            session.powerups.push(PowerUp {
                id,
                kind,
                rect: Rect::from_center(center, size.x, size.y),
            });

            let events = game.tick(&TickInput::default());
            assert!(events.contains(&GameEvent::PowerUpCollected(kind)));
            assert!(!events.contains(&GameEvent::PointerCapture(false)));
            assert_ball_speeds(&game);
        }
        assert_eq!(game.session().unwrap().balls.len(), 6);

        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        for _ in 0..600 {
            game.tick(&input);
            assert_ball_speeds(&game);
        }
    }

    #[test]
    fn test_determinism() {
        let mut game1 = game_with(3, MemoryProgress::default());
        let mut game2 = game_with(3, MemoryProgress::default());
        new_game(&mut game1);
        new_game(&mut game2);

        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        for _ in 0..240 {
            game1.tick(&input);
            game2.tick(&input);
        }

        let (s1, s2) = (game1.session().unwrap(), game2.session().unwrap());
        assert_eq!(s1.score, s2.score);
        assert_eq!(s1.lives, s2.lives);
        assert_eq!(s1.balls.len(), s2.balls.len());
        assert_eq!(s1.paddle.x, s2.paddle.x);
    }
}
