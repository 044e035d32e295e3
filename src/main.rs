//! Box Breaker headless runner
//!
//! Runs the simulation without a display, with the autopilot at the paddle.
//! Usage: `box-breaker [settings.json]`

use std::path::Path;

use box_breaker::consts::*;
use box_breaker::levels::Grid;
use box_breaker::sim::{Game, GameEvent, Mode, TickInput};
use box_breaker::{AssetTable, LevelProvider, MapLoader, SaveFile, Settings};

/// Frame interval of the simulated display
const RENDER_DT: f32 = 1.0 / 30.0;

/// Levels used when no map directory is available
fn demo_levels() -> Vec<Grid> {
    vec![
        vec![
            vec![1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
            vec![1, 2, 2, 2, 2, 2, 2, 2, 2, 1],
            vec![1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
        ],
        vec![
            vec![0, 3, 3, 3, 3, 3, 3, 3, 3, 0],
            vec![2, 0, 2, 0, 2, 2, 0, 2, 0, 2],
            vec![1, 1, 4, 1, 1, 1, 1, 4, 1, 1],
            vec![0, 5, 0, 5, 0, 0, 5, 0, 5, 0],
        ],
        vec![
            vec![8, 7, 6, 5, 4, 4, 5, 6, 7, 8],
            vec![7, 6, 5, 4, 3, 3, 4, 5, 6, 7],
            vec![6, 5, 4, 3, 2, 2, 3, 4, 5, 6],
            vec![5, 4, 3, 2, 1, 1, 2, 3, 4, 5],
        ],
    ]
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Box Breaker (headless) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(Path::new(&path)),
        None => Settings::default(),
    };

    let levels = match MapLoader::load_dir(&settings.map_dir) {
        Ok(maps) if maps.level_count() > 0 => maps,
        Ok(_) => {
            log::warn!("No maps in {}, using demo levels", settings.map_dir.display());
            MapLoader::from_grids(demo_levels())
        }
        Err(e) => {
            log::warn!(
                "Could not read maps from {}: {}, using demo levels",
                settings.map_dir.display(),
                e
            );
            MapLoader::from_grids(demo_levels())
        }
    };

    let mut game = Game::new(
        AssetTable::builtin(),
        levels,
        SaveFile::new(settings.save_path.clone()),
        settings.tuning.clone(),
        settings.seed,
    );

    let mut input = if settings.continue_game && game.can_continue() {
        TickInput {
            continue_game: true,
            ..Default::default()
        }
    } else {
        TickInput {
            new_game: true,
            ..Default::default()
        }
    };
    input.autopilot = true;

    let mut accumulator = 0.0;
    let mut ticks = 0;
    'run: while ticks < settings.max_frames {
        accumulator += RENDER_DT;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            for event in game.tick(&input) {
                report(&event);
            }
            accumulator -= SIM_DT;
            substeps += 1;
            ticks += 1;

            // Clear one-shot inputs after processing
            input.new_game = false;
            input.continue_game = false;

            if game.mode() == Mode::GameOver || ticks >= settings.max_frames {
                break 'run;
            }
        }
    }

    match game.session() {
        Some(session) => log::info!(
            "Stopped after {} frames in {:?}: level {}, score {}, lives {}",
            ticks,
            game.mode(),
            session.level,
            session.score,
            session.lives
        ),
        None => log::info!("Stopped after {} frames without a session", ticks),
    }
}

fn report(event: &GameEvent) {
    match event {
        GameEvent::LevelCleared { level } => log::info!("Level {} cleared", level),
        GameEvent::BallLost { lives } => log::info!("Ball lost, {} lives left", lives),
        GameEvent::PowerUpCollected(kind) => log::info!("Picked up {:?}", kind),
        GameEvent::ModeChanged(mode) => log::info!("Mode: {:?}", mode),
        _ => log::trace!("{:?}", event),
    }
}
