//! Logger configuration.
//!
//! [`LoggerOptions`] is what callers supply; every field is optional and is
//! merged over the defaults by [`LoggerConfig::from_options`].

use std::collections::{HashMap, HashSet};
use std::env;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{LoggerError, Result};
use crate::levels::{default_levels, Color, Level, LevelRegistry};

/// Environment variable consulted for the production default.
pub const ENVIRONMENT_VAR: &str = "APP_ENV";

/// Value of [`ENVIRONMENT_VAR`] that selects production mode.
pub const PRODUCTION_ENVIRONMENT: &str = "production";

/// Levels written to the error stream unless configured otherwise.
pub const DEFAULT_STDERR_LEVELS: &[&str] = &["ERROR"];

/// Color for configured levels that have no color entry.
const FALLBACK_COLOR: Color = Color::White;

/// Caller-supplied logger options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerOptions {
    pub service: Option<String>,
    pub level: Option<String>,
    pub is_production: Option<bool>,
    pub colorize: Option<bool>,
    pub stderr_levels: Option<Vec<String>>,
    /// Level name to integer rank, in declaration order.
    pub levels: Option<Map<String, Value>>,
    pub colors: Option<HashMap<String, Color>>,
    pub exit_on_fault: Option<bool>,
}

impl LoggerOptions {
    pub fn new(service: &str) -> Self {
        Self {
            service: Some(service.to_string()),
            ..Self::default()
        }
    }

    pub fn level(mut self, level: &str) -> Self {
        self.level = Some(level.to_string());
        self
    }

    pub fn production(mut self, is_production: bool) -> Self {
        self.is_production = Some(is_production);
        self
    }

    pub fn colorize(mut self, colorize: bool) -> Self {
        self.colorize = Some(colorize);
        self
    }

    pub fn stderr_levels(mut self, names: &[&str]) -> Self {
        self.stderr_levels = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn levels(mut self, levels: &[(&str, i64)]) -> Self {
        self.levels = Some(
            levels
                .iter()
                .map(|(n, r)| (n.to_string(), Value::from(*r)))
                .collect(),
        );
        self
    }

    pub fn colors(mut self, colors: &[(&str, Color)]) -> Self {
        self.colors = Some(colors.iter().map(|(n, c)| (n.to_string(), *c)).collect());
        self
    }

    pub fn exit_on_fault(mut self, exit: bool) -> Self {
        self.exit_on_fault = Some(exit);
        self
    }
}

/// Whether [`ENVIRONMENT_VAR`] selects production.
pub fn production_from_env() -> bool {
    env::var(ENVIRONMENT_VAR)
        .map(|v| v == PRODUCTION_ENVIRONMENT)
        .unwrap_or(false)
}

/// Fully resolved logger configuration.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub service: String,
    pub is_production: bool,
    pub colorize: bool,
    /// Name of the threshold level; always present in `registry`.
    pub level: String,
    pub stderr_levels: HashSet<String>,
    pub registry: LevelRegistry,
    /// Exit after logging a non-panic fault.
    pub exit_on_fault: bool,
}

impl LoggerConfig {
    /// Merge `opts` over the defaults.
    ///
    /// Without an explicit `level`, production logs everything and
    /// development starts at the third most severe level.
    pub fn from_options(opts: LoggerOptions) -> Result<Self> {
        let service = match opts.service {
            Some(s) if !s.trim().is_empty() => s,
            _ => return Err(LoggerError::MissingService),
        };

        let is_production = opts.is_production.unwrap_or_else(production_from_env);
        let colorize = opts.colorize.unwrap_or(!production_from_env());

        let registry = LevelRegistry::new(resolve_levels(opts.levels, opts.colors)?)?;

        let level = match opts.level {
            Some(name) if registry.contains(&name) => name,
            Some(name) => return Err(LoggerError::UnknownLevel(name)),
            None => default_threshold(&registry, is_production),
        };

        let stderr_levels = opts
            .stderr_levels
            .unwrap_or_else(|| DEFAULT_STDERR_LEVELS.iter().map(|s| s.to_string()).collect())
            .into_iter()
            .collect();

        Ok(Self {
            service,
            is_production,
            colorize,
            level,
            stderr_levels,
            registry,
            exit_on_fault: opts.exit_on_fault.unwrap_or(true),
        })
    }

    /// The threshold level.
    pub fn threshold(&self) -> &Level {
        // `level` is validated against the registry in `from_options`.
        self.registry
            .get(&self.level)
            .unwrap_or_else(|| self.registry.least_severe())
    }
}

fn resolve_levels(
    levels: Option<Map<String, Value>>,
    colors: Option<HashMap<String, Color>>,
) -> Result<Vec<Level>> {
    let defaults = default_levels();

    let mut palette: HashMap<String, Color> = defaults
        .iter()
        .map(|l| (l.name.clone(), l.color))
        .collect();
    if let Some(colors) = colors {
        palette.extend(colors);
    }

    let ranks: Vec<(String, i64)> = match levels {
        Some(levels) => levels
            .into_iter()
            .map(|(name, rank)| match rank.as_i64() {
                Some(rank) => Ok((name, rank)),
                None => Err(LoggerError::InvalidRank(name)),
            })
            .collect::<Result<_>>()?,
        None => defaults.into_iter().map(|l| (l.name, l.rank)).collect(),
    };

    Ok(ranks
        .into_iter()
        .map(|(name, rank)| {
            let color = palette.get(&name).copied().unwrap_or(FALLBACK_COLOR);
            Level { name, rank, color }
        })
        .collect())
}

fn default_threshold(registry: &LevelRegistry, is_production: bool) -> String {
    if is_production {
        return registry.least_severe().name.clone();
    }
    registry.descending_name_or(2, &registry.least_severe().name)
}
