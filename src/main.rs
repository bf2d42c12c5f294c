/// Entry point and frame loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::KeyCode;
use log::info;

use config::{GameConfig, SourceKind};
use sim::event::{Notice, SessionEvent};
use sim::level::AnyProvider;
use sim::runtime::SessionRuntime;
use sim::session::{GamePhase, GameSession, PhaseTiming};
use ui::input::InputState;
use ui::renderer::{Overlay, Renderer};

/// How long a notice stays on screen.
const NOTICE_TTL: Duration = Duration::from_millis(2500);

#[derive(Parser, Debug)]
#[command(name = "chromatic-recall", version, about = "Memorize a colored path, then retrace it")]
struct Args {
    /// Config file (default: search for config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where levels come from
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// Directory of *.txt mazes for `--source levels`
    #[arg(long)]
    levels_dir: Option<PathBuf>,

    /// Seed for the procedural generator
    #[arg(long)]
    seed: Option<u64>,

    /// Level to begin at
    #[arg(long, default_value_t = 1)]
    level: u32,

    /// Write logs here (the terminal is busy with the game)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    init_logging(args.log_file.as_ref());

    let mut config = GameConfig::load(args.config.as_deref());
    if let Some(source) = args.source {
        config.generator.source = source;
    }
    if let Some(dir) = args.levels_dir.clone() {
        config.generator.levels_dir = dir;
    }
    if args.seed.is_some() {
        config.generator.seed = args.seed;
    }

    let tokio_rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Could not start runtime: {e}");
            return;
        }
    };

    let provider = AnyProvider::from_config(&config.generator);
    info!("level source: {}", provider.describe());

    let mut session = GameSession::new(PhaseTiming::from(&config.timing));
    session.level = args.level.max(1);
    let mut runtime = SessionRuntime::new(
        session,
        provider,
        tokio_rt.handle().clone(),
        Duration::from_millis(config.timing.generation_timeout_ms),
    );

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut runtime, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    let session = runtime.session();
    println!();
    println!("Thanks for playing Chromatic Recall!");
    println!("Reached level {}, final score: {}", session.level, session.score);
}

fn init_logging(log_file: Option<&PathBuf>) {
    let default_filter = if log_file.is_some() { "info" } else { "off" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Could not open log file {}: {e}", path.display()),
        }
    }
    builder.init();
}

fn game_loop(
    runtime: &mut SessionRuntime<AnyProvider>,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let source = runtime.provider().describe();

    let mut notice: Option<(Notice, Instant)> = None;
    let mut tick: u32 = 0;

    loop {
        let frame_start = Instant::now();
        kb.drain_events();

        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) {
            break;
        }

        let mut notices = vec![];
        for &code in kb.presses() {
            if let Some(event) = map_key(runtime.session(), code) {
                notices.extend(runtime.dispatch(event));
            }
        }
        notices.extend(runtime.pump());

        if let Some(latest) = notices.pop() {
            notice = Some((latest, Instant::now()));
        }
        if notice.as_ref().map_or(false, |(_, at)| at.elapsed() >= NOTICE_TTL) {
            notice = None;
        }

        let overlay = Overlay {
            notice: notice.as_ref().map(|(n, _)| n),
            source: &source,
            tick,
        };
        renderer.render(runtime.session(), &overlay)?;
        tick = tick.wrapping_add(1);

        if let Some(rest) = tick_rate.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

/// Translate one key press into a session event for the current phase.
/// Steps are relative to the last confirmed cell on the path.
fn map_key(session: &GameSession, code: KeyCode) -> Option<SessionEvent> {
    if KEYS_CONFIRM.contains(&code) {
        return session
            .phase
            .can_start()
            .then(|| SessionEvent::Start { level: session.next_level() });
    }
    if KEYS_RESTART.contains(&code) {
        return session.phase.can_restart().then_some(SessionEvent::Restart);
    }

    let (dx, dy) = if KEYS_UP.contains(&code) {
        (0, -1)
    } else if KEYS_DOWN.contains(&code) {
        (0, 1)
    } else if KEYS_LEFT.contains(&code) {
        (-1, 0)
    } else if KEYS_RIGHT.contains(&code) {
        (1, 0)
    } else {
        return None;
    };

    if session.phase != GamePhase::Movement {
        return None;
    }
    let target = session.path_head()?.offset(dx, dy);
    let maze = session.maze.as_ref()?;
    maze.in_bounds(target).then_some(SessionEvent::Move(target))
}
