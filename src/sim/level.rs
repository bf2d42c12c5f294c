/// Level sources.
///
/// Every level is requested through `MazeProvider::generate`, which takes the
/// difficulty parameters and resolves (asynchronously) to a maze description
/// in the text format read by `domain::maze::parse`.
///
/// ## Providers in this crate:
///   1. `ProceduralProvider` (sim/generator.rs): builds a fresh maze per call
///   2. `LevelSetProvider` over a directory: `*.txt` files, sorted by name
///   3. `LevelSetProvider` over the built-in set: a few handcrafted mazes
///
/// For the level sets, level N is file N (1-based), wrapping around once the
/// set is exhausted.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use thiserror::Error;

use crate::config::{GeneratorConfig, SourceKind};
use super::generator::ProceduralProvider;

// ══════════════════════════════════════════════════════════════
// Difficulty
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GenerationParams {
    pub level: u32,
    /// 1..=10
    pub maze_complexity: u32,
    /// 0.0..=1.0, higher means more alike colors.
    pub color_palette_similarity: f64,
    /// 5..=25
    pub path_length: u32,
}

impl GenerationParams {
    pub fn for_level(level: u32) -> Self {
        GenerationParams {
            level,
            maze_complexity: level.saturating_add(1).min(10),
            color_palette_similarity: (0.1 + level as f64 * 0.05).min(0.8),
            path_length: level.saturating_add(5).min(25),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Provider seam
// ══════════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("no maze files found in {0}")]
    NoLevels(PathBuf),

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("maze generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("maze generation did not finish: {0}")]
    Interrupted(String),
}

pub trait MazeProvider: Send + Sync + 'static {
    /// Produce the description text for one level attempt.
    fn generate(
        &self,
        params: GenerationParams,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

// ══════════════════════════════════════════════════════════════
// Level sets
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub enum LevelSource {
    Directory(PathBuf),
    Builtin,
}

pub struct LevelSetProvider {
    source: LevelSource,
}

impl LevelSetProvider {
    pub fn new(source: LevelSource) -> Self {
        LevelSetProvider { source }
    }

    pub fn source(&self) -> &LevelSource {
        &self.source
    }
}

impl MazeProvider for LevelSetProvider {
    fn generate(
        &self,
        params: GenerationParams,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send {
        let source = self.source.clone();
        async move {
            match source {
                LevelSource::Builtin => Ok(pick(BUILTIN_LEVELS, params.level).to_string()),
                LevelSource::Directory(dir) => {
                    let files = list_level_files(&dir).await?;
                    let path = pick(&files, params.level);
                    debug!("level {} -> {}", params.level, path.display());
                    tokio::fs::read_to_string(path)
                        .await
                        .map_err(|source| ProviderError::Io { path: path.clone(), source })
                }
            }
        }
    }
}

/// Level N (1-based) of a non-empty set, wrapping around.
fn pick<T>(set: &[T], level: u32) -> &T {
    let idx = (level.max(1) as usize - 1) % set.len();
    &set[idx]
}

/// `*.txt` files in `dir`, sorted by file name.
async fn list_level_files(dir: &Path) -> Result<Vec<PathBuf>, ProviderError> {
    let io_err = |source| ProviderError::Io { path: dir.to_path_buf(), source };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;

    let mut files = vec![];
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "txt") {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(ProviderError::NoLevels(dir.to_path_buf()));
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

// ══════════════════════════════════════════════════════════════
// Selection
// ══════════════════════════════════════════════════════════════

/// The provider chosen at startup.
pub enum AnyProvider {
    Procedural(ProceduralProvider),
    LevelSet(LevelSetProvider),
}

impl AnyProvider {
    pub fn from_config(cfg: &GeneratorConfig) -> Self {
        match cfg.source {
            SourceKind::Procedural => AnyProvider::Procedural(ProceduralProvider::new(cfg.seed)),
            SourceKind::Levels => AnyProvider::LevelSet(LevelSetProvider::new(
                LevelSource::Directory(cfg.levels_dir.clone()),
            )),
            SourceKind::Builtin => AnyProvider::LevelSet(LevelSetProvider::new(LevelSource::Builtin)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AnyProvider::Procedural(_) => "procedural".into(),
            AnyProvider::LevelSet(p) => match p.source() {
                LevelSource::Directory(dir) => format!("levels in {}", dir.display()),
                LevelSource::Builtin => "built-in levels".into(),
            },
        }
    }
}

impl MazeProvider for AnyProvider {
    fn generate(
        &self,
        params: GenerationParams,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send {
        async move {
            match self {
                AnyProvider::Procedural(p) => p.generate(params).await,
                AnyProvider::LevelSet(p) => p.generate(params).await,
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Built-in levels
// ══════════════════════════════════════════════════════════════
//
// The history [S] occupies the first slot of the sequence, so each level
// carries one `0` decoy: it sorts first and the route then reads 1, 2, 3...
// Stepping on the decoy is always a wrong step.

const BUILTIN_LEVELS: &[&str] = &[
    "\
#########
#S12 0  #
#  3    #
#  456E #
#########
Colors:
0: Dark slate gray
1: Red
2: Deep sky blue
3: Yellow
4: Hot pink
5: Chartreuse
6: Orange red
",
    "\
##########
#S1  . 0 #
# 2 ###  #
# 34567  #
#   # 8E #
##########
Colors:
0: Spring green
1: Electric Indigo
2: Luminous Vivid Violet
3: Dark slate gray
4: Electric Indigo
5: Luminous Vivid Violet
6: Dark slate gray
7: Electric Indigo
8: Luminous Vivid Violet
",
    "\
###########
#0   .    #
# ####### #
#S1122334 #
########4 #
#  E98765 #
###########
Colors:
0: Magenta
1: Cyan
2: Cyan
3: Deep sky blue
4: Deep sky blue
5: Blue
6: Blue
7: Electric Indigo
8: Electric Indigo
9: Luminous Vivid Violet
",
];
