use crossterm::{
    cursor::{Hide, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::env;
use std::fs::File;
use std::io::{BufWriter, Stdout, stdout};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod canvas;
mod clock;
mod config;
mod error;
mod fireworks;
mod fps;
mod surface;

use canvas::TerminalCanvas;
use clock::FrameDelta;
use config::{Config, Tier};
use error::{AppError, AppResult};
use fireworks::FireworkShow;
use surface::{Rgb, Surface};

fn print_usage() {
    eprintln!("fireworks - Terminal fireworks display");
    eprintln!();
    eprintln!("Usage: fireworks [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config FILE      Load settings from a TOML file");
    eprintln!("  --tier TIER        Performance tier: high, standard (default), low");
    eprintln!("  --seed N           Seed the random generator for a reproducible show");
    eprintln!("  --bg-color RRGGBB  Set background color as hex (e.g., --bg-color 1a1b26)");
    eprintln!("  --fps              Start with the FPS counter shown");
    eprintln!("  --clicks           Start with click-to-launch enabled");
    eprintln!("  --log FILE         Write logs to FILE (filter with RUST_LOG)");
    eprintln!();
    eprintln!("Controls:");
    eprintln!("  Alt+Shift+Z  toggle click-to-launch");
    eprintln!("  Alt+Shift+X  toggle FPS counter");
    eprintln!();
    eprintln!("Press 'q', ESC, or Ctrl+C to exit");
}

#[derive(Default)]
struct Args {
    config: Option<PathBuf>,
    tier: Option<Tier>,
    seed: Option<u64>,
    bg_color: Option<Rgb>,
    show_fps: bool,
    clicks: bool,
    log_file: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(tier) = self.tier {
            config.tier = tier;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(color) = self.bg_color {
            config.render.background = color;
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
        config.show_fps |= self.show_fps;
        config.clicking_enabled |= self.clicks;
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    eprintln!();
    print_usage();
    std::process::exit(1);
}

/// `None` means usage was requested.
fn parse_args(args: &[String]) -> Option<Args> {
    let mut parsed = Args::default();

    let value = |i: usize, flag: &str| -> String {
        match args.get(i + 1) {
            Some(v) => v.clone(),
            None => fail(&format!("{flag} requires a value")),
        }
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                parsed.config = Some(PathBuf::from(value(i, "--config")));
                i += 2;
            }
            "--log" => {
                parsed.log_file = Some(PathBuf::from(value(i, "--log")));
                i += 2;
            }
            "--tier" => {
                let tier = value(i, "--tier");
                match tier.parse() {
                    Ok(tier) => parsed.tier = Some(tier),
                    Err(_) => fail(&format!("Invalid tier: {tier}")),
                }
                i += 2;
            }
            "--seed" => {
                let seed = value(i, "--seed");
                match seed.parse() {
                    Ok(seed) => parsed.seed = Some(seed),
                    Err(_) => fail(&format!("Invalid seed: {seed}")),
                }
                i += 2;
            }
            "--bg-color" => {
                let hex = value(i, "--bg-color");
                match Rgb::from_hex(&hex) {
                    Some(color) => parsed.bg_color = Some(color),
                    None => fail(&format!(
                        "Invalid hex color: {hex}\nExpected format: RRGGBB (e.g., 1a1b26)"
                    )),
                }
                i += 2;
            }
            "--fps" => {
                parsed.show_fps = true;
                i += 1;
            }
            "--clicks" => {
                parsed.clicks = true;
                i += 1;
            }
            "help" | "--help" | "-h" => return None,
            arg => fail(&format!("Unknown option: {arg}")),
        }
    }

    Some(parsed)
}

/// Logs go to `log_file` when set. Otherwise only warnings and errors reach
/// stderr, which is only visible outside the alternate screen.
fn init_logging(log_file: Option<&Path>) -> AppResult<()> {
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("warn"))
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
    Ok(())
}

fn run_show(
    stdout: &mut BufWriter<Stdout>,
    config: &Config,
    show: &mut FireworkShow,
    canvas: &mut TerminalCanvas,
) -> AppResult<()> {
    let frame_budget = clock::frame_budget(config.target_fps);
    let mut last_frame = Instant::now();

    loop {
        // Input runs to completion before the next frame is simulated.
        loop {
            let timeout = clock::poll_timeout(last_frame, frame_budget, Instant::now());
            if !event::poll(timeout)? {
                break;
            }
            let event = event::read()?;
            match &event {
                Event::Key(key_event) => {
                    if key_event.code == KeyCode::Char('q')
                        || key_event.code == KeyCode::Esc
                        || (key_event.code == KeyCode::Char('c')
                            && key_event.modifiers.contains(event::KeyModifiers::CONTROL))
                    {
                        return Ok(());
                    }
                    show.handle_event(&event);
                }
                Event::Resize(cols, rows) => {
                    let (width, height) = (*cols as usize, *rows as usize * 2);
                    show.resize(width, height);
                    canvas.resize(width, height);
                    execute!(stdout, Clear(ClearType::All))?;
                    info!(
                        width,
                        height,
                        particles = show.particle_count(),
                        "surface resized"
                    );
                }
                _ => show.handle_event(&event),
            }
            if clock::poll_timeout(last_frame, frame_budget, Instant::now()).is_zero() {
                break;
            }
        }

        let now = Instant::now();
        let frame = FrameDelta::between(last_frame, now, config.max_frame_ms);
        last_frame = now;

        if frame.is_clamped() {
            debug!(wall_ms = frame.wall_ms, sim_ms = frame.sim_ms, "frame delta clamped");
        }

        show.update(frame);
        show.render(canvas);
        canvas.present(stdout)?;
    }
}

fn run() -> AppResult<()> {
    let args: Vec<String> = env::args().collect();
    let Some(args) = parse_args(&args) else {
        print_usage();
        return Ok(());
    };

    let mut config = match &args.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides(|key| env::var(key).ok())?;
    args.apply(&mut config);
    config.validate()?;

    init_logging(config.log_file.as_deref())?;
    info!(
        tier = ?config.tier,
        generation_rate = config.generation_rate(),
        particle_count = config.particle_count(),
        seed = ?config.seed,
        "starting fireworks"
    );

    let (cols, rows) = terminal::size()?;
    if cols == 0 || rows == 0 {
        return Err(AppError::Surface(format!(
            "terminal reports {cols}x{rows} cells"
        )));
    }
    let (width, height) = (cols as usize, rows as usize * 2);

    let rng = match config.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let mut show = FireworkShow::new(&config, width, height, rng);
    let mut canvas = TerminalCanvas::new(width, height, config.render.background);

    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);

    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All), EnableMouseCapture)?;

    let result = run_show(&mut stdout, &config, &mut show, &mut canvas);

    // Restore the terminal even when the show failed.
    let restored = execute!(stdout, Show, LeaveAlternateScreen, DisableMouseCapture);
    let raw_off = terminal::disable_raw_mode();

    result?;
    restored?;
    raw_off?;
    info!("fireworks finished");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        error!(%err, "fireworks failed");
        eprintln!("fireworks: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("fireworks")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn parses_flags_into_config() {
        let args = parse_args(&argv(&[
            "--tier", "low", "--seed", "9", "--bg-color", "#102030", "--fps", "--clicks",
        ]))
        .unwrap();

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.tier, Tier::Low);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.render.background, Rgb(0x10, 0x20, 0x30));
        assert!(config.show_fps);
        assert!(config.clicking_enabled);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn help_returns_none() {
        assert!(parse_args(&argv(&["--help"])).is_none());
        assert!(parse_args(&argv(&["-h"])).is_none());
    }

    #[test]
    fn flags_keep_config_toggles_when_absent() {
        let args = parse_args(&argv(&[])).unwrap();
        let mut config = Config {
            show_fps: true,
            ..Config::default()
        };
        args.apply(&mut config);
        assert!(config.show_fps);
        assert!(!config.clicking_enabled);
    }
}
