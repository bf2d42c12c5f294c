/// External configuration loader.
///
/// Reads `config.toml` from an explicit path, or searches the executable's
/// directory, the CWD and the data directories. Falls back to defaults if
/// the file is missing or incomplete. Command-line flags are applied on top
/// by `main`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use log::{info, warn};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub generator: GeneratorConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub observation_ms: u64,
    pub fail_reset_ms: u64,
    pub generation_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub source: SourceKind,
    pub levels_dir: PathBuf,
    /// Fixed seed for the procedural generator (None = entropy).
    pub seed: Option<u64>,
}

#[derive(Deserialize, clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Fresh maze per level.
    Procedural,
    /// `*.txt` files from `levels_dir`.
    Levels,
    /// The handcrafted set compiled into the binary.
    Builtin,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    generator: TomlGenerator,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_observation")]
    observation_ms: u64,
    #[serde(default = "default_fail_reset")]
    fail_reset_ms: u64,
    #[serde(default = "default_generation_timeout")]
    generation_timeout_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGenerator {
    #[serde(default = "default_source")]
    source: SourceKind,
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default)]
    seed: Option<u64>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 50 }
fn default_observation() -> u64 { 3000 }
fn default_fail_reset() -> u64 { 1500 }
fn default_generation_timeout() -> u64 { 10_000 }
fn default_source() -> SourceKind { SourceKind::Procedural }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            observation_ms: default_observation(),
            fail_reset_ms: default_fail_reset(),
            generation_timeout_ms: default_generation_timeout(),
        }
    }
}

impl Default for TomlGenerator {
    fn default() -> Self {
        TomlGenerator {
            source: default_source(),
            levels_dir: default_levels_dir(),
            seed: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TomlTiming::default().into()
    }
}

impl From<TomlTiming> for TimingConfig {
    fn from(t: TomlTiming) -> Self {
        TimingConfig {
            tick_rate_ms: t.tick_rate_ms.max(1),
            observation_ms: t.observation_ms,
            fail_reset_ms: t.fail_reset_ms,
            generation_timeout_ms: t.generation_timeout_ms.max(1),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `explicit`, or from the first `config.toml` found in
    /// the search directories. A file that fails to read or parse is
    /// reported and replaced by defaults.
    pub fn load(explicit: Option<&Path>) -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = match explicit {
            Some(path) => read_toml(path).unwrap_or_default(),
            None => load_toml(&search_dirs),
        };
        Self::resolve(toml_cfg, &search_dirs)
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir = resolve_levels_dir(&toml_cfg.generator.levels_dir, search_dirs);
        GameConfig {
            timing: toml_cfg.timing.into(),
            generator: GeneratorConfig {
                source: toml_cfg.generator.source,
                levels_dir,
                seed: toml_cfg.generator.seed,
            },
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::resolve(TomlConfig::default(), &[])
    }
}

/// Absolute paths are kept; relative ones are looked up in the search
/// directories, defaulting to the CWD.
pub fn resolve_levels_dir(dir: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(dir);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(dir))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // ~/.local/share/chromatic-recall
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/chromatic-recall");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share/chromatic-recall");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            return read_toml(&path).unwrap_or_default();
        }
    }
    TomlConfig::default()
}

fn read_toml(path: &Path) -> Option<TomlConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("could not read {}: {e}", path.display());
            return None;
        }
    };
    match toml::from_str::<TomlConfig>(&text) {
        Ok(cfg) => {
            info!("loaded {}", path.display());
            Some(cfg)
        }
        Err(e) => {
            warn!("{} parse error, using default settings: {e}", path.display());
            None
        }
    }
}
