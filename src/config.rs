use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Where the user overlay lives unless `--config` names another file.
pub const USER_CONFIG_PATH: &str = "~/.config/bash-minifier/config.toml";

// ── Final (merged) config types ──

#[derive(Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub passes: Passes,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub logging: Logging,
}

/// Which passes run. Their order is fixed.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Passes {
    #[serde(default = "enabled")]
    pub strip_comments: bool,
    #[serde(default = "enabled")]
    pub normalize_whitespace: bool,
    #[serde(default = "enabled")]
    pub join_lines: bool,
    #[serde(default = "enabled")]
    pub trim_operators: bool,
}

impl Default for Passes {
    fn default() -> Self {
        Self {
            strip_comments: true,
            normalize_whitespace: true,
            join_lines: true,
            trim_operators: true,
        }
    }
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Set a leading `#!` line aside and restore it after minifying.
    #[serde(default)]
    pub keep_shebang: bool,
    /// Remove `\r` before minifying.
    #[serde(default)]
    pub normalize_line_endings: bool,
    /// Reject output that tree-sitter-bash cannot parse.
    #[serde(default)]
    pub verify: bool,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Logging {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub record_runs: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_level(),
            record_runs: false,
        }
    }
}

fn default_level() -> String {
    "warn".into()
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    passes: PassesOverlay,
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    logging: LoggingOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct PassesOverlay {
    strip_comments: Option<bool>,
    normalize_whitespace: Option<bool>,
    join_lines: Option<bool>,
    trim_operators: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    keep_shebang: Option<bool>,
    normalize_line_endings: Option<bool>,
    verify: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingOverlay {
    level: Option<String>,
    record_runs: Option<bool>,
}

// ── Merge logic ──

/// Scalars override: a value present in the overlay replaces the base.
fn merge<T>(base: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *base = v;
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/bash-minifier/config.toml (if exists)
    ///
    /// A user file that does not parse is reported and skipped.
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay() {
            config.apply_overlay(overlay);
        }
        config
    }

    /// Defaults merged with the overlay at `path`. Unlike [`load`](Self::load),
    /// a missing or malformed file is an error.
    pub fn load_from(path: &str) -> Result<Self, Error> {
        let expanded = shellexpand::tilde(path);
        let content =
            std::fs::read_to_string(&*expanded).map_err(|e| Error::Config {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        let overlay: ConfigOverlay = toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let mut config = Self::default_config();
        config.apply_overlay(overlay);
        Ok(config)
    }

    /// Try to load the user overlay from [`USER_CONFIG_PATH`].
    fn load_overlay() -> Option<ConfigOverlay> {
        let path = shellexpand::tilde(USER_CONFIG_PATH);
        let content = std::fs::read_to_string(&*path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                eprintln!("bash-minifier: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config.
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let p = overlay.passes;
        merge(&mut self.passes.strip_comments, p.strip_comments);
        merge(&mut self.passes.normalize_whitespace, p.normalize_whitespace);
        merge(&mut self.passes.join_lines, p.join_lines);
        merge(&mut self.passes.trim_operators, p.trim_operators);

        let s = overlay.settings;
        merge(&mut self.settings.keep_shebang, s.keep_shebang);
        merge(
            &mut self.settings.normalize_line_endings,
            s.normalize_line_endings,
        );
        merge(&mut self.settings.verify, s.verify);

        let l = overlay.logging;
        merge(&mut self.logging.level, l.level);
        merge(&mut self.logging.record_runs, l.record_runs);
    }

    /// Serialize the merged configuration back to TOML.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::Config {
            path: "<merged>".into(),
            message: e.to_string(),
        })
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}
