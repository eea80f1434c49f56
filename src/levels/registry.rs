//! Level registry.
//!
//! Holds the configured levels in declaration order and answers ordering
//! questions by rank.

use std::collections::HashSet;
use std::fmt;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{LoggerError, Result};

/// Terminal color token attached to a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    #[serde(alias = "grey")]
    Gray,
}

impl Color {
    /// ANSI foreground escape for this color.
    pub fn ansi_open(self) -> &'static str {
        match self {
            Color::Black => "\x1b[30m",
            Color::Red => "\x1b[31m",
            Color::Green => "\x1b[32m",
            Color::Yellow => "\x1b[33m",
            Color::Blue => "\x1b[34m",
            Color::Magenta => "\x1b[35m",
            Color::Cyan => "\x1b[36m",
            Color::White => "\x1b[37m",
            Color::Gray => "\x1b[90m",
        }
    }

    /// Reset to the default foreground.
    pub fn ansi_close(self) -> &'static str {
        "\x1b[39m"
    }

    /// Wrap `text` in this color's escapes.
    pub fn paint(self, text: &str) -> String {
        format!("{}{}{}", self.ansi_open(), text, self.ansi_close())
    }
}

/// A named severity level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    pub rank: i64,
    pub color: Color,
}

impl Level {
    pub fn new(name: &str, rank: i64, color: Color) -> Self {
        Self {
            name: name.to_string(),
            rank,
            color,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.rank)
    }
}

lazy_static! {
    /// Built-in level table.
    static ref DEFAULT_LEVELS: Vec<Level> = vec![
        Level::new("ERROR", 40_000, Color::Red),
        Level::new("WARN", 30_000, Color::Yellow),
        Level::new("INFO", 20_000, Color::Green),
        Level::new("DEBUG", 10_000, Color::Blue),
        Level::new("TRACE", 5_000, Color::Cyan),
    ];
}

/// The built-in ERROR/WARN/INFO/DEBUG/TRACE levels.
pub fn default_levels() -> Vec<Level> {
    DEFAULT_LEVELS.clone()
}

/// Ordered set of uniquely named levels.
#[derive(Debug, Clone)]
pub struct LevelRegistry {
    levels: Vec<Level>,
}

impl LevelRegistry {
    /// Build a registry, rejecting empty sets and duplicate names.
    pub fn new(levels: Vec<Level>) -> Result<Self> {
        if levels.is_empty() {
            return Err(LoggerError::NoLevels);
        }

        let mut seen = HashSet::new();
        for level in &levels {
            if !seen.insert(level.name.as_str()) {
                return Err(LoggerError::DuplicateLevel(level.name.clone()));
            }
        }

        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Level> {
        self.levels.iter().find(|l| l.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Level names from highest rank to lowest.
    ///
    /// Recomputed on every call. Levels sharing a rank keep their
    /// declaration order.
    pub fn descending_level_names(&self) -> Vec<String> {
        let mut sorted: Vec<&Level> = self.levels.iter().collect();
        sorted.sort_by(|a, b| b.rank.cmp(&a.rank));
        sorted.into_iter().map(|l| l.name.clone()).collect()
    }

    /// Name at `index` in descending order, or `fallback` when fewer levels
    /// are configured.
    pub fn descending_name_or(&self, index: usize, fallback: &str) -> String {
        self.descending_level_names()
            .into_iter()
            .nth(index)
            .unwrap_or_else(|| fallback.to_string())
    }

    /// The highest-ranked level.
    pub fn most_severe(&self) -> &Level {
        // Non-empty is enforced by `new`.
        self.levels
            .iter()
            .reduce(|best, l| if l.rank > best.rank { l } else { best })
            .unwrap_or(&self.levels[0])
    }

    /// The lowest-ranked level.
    pub fn least_severe(&self) -> &Level {
        self.levels
            .iter()
            .reduce(|best, l| if l.rank < best.rank { l } else { best })
            .unwrap_or(&self.levels[0])
    }
}
