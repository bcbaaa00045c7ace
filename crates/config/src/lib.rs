//! Hookbridge Configuration Management
//!
//! Loads the scripting engine configuration from a key=value text file.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the engine configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/hookbridge.conf";

/// Scripting engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Master switch (from "Lua.Enabled" option)
    pub enabled: bool,
    /// Run every event on the world state only (from "Lua.CompatibilityMode" option)
    pub compatibility_mode: bool,
    /// Append stack traces to callback errors (from "Lua.TraceBack" option)
    pub trace_back: bool,
    /// Reload scripts when files change on disk (from "Lua.ScriptReloader" option)
    pub script_reloader: bool,
    /// Root folder scanned for scripts (from "Lua.ScriptPath" option)
    pub script_path: String,
    /// Maps allowed to own a map state; empty means all (from "Lua.OnlyOnMaps" option)
    pub only_on_maps: BTreeSet<u32>,
    /// Extra `package.path` entries (from "Lua.RequirePaths" option)
    pub require_paths: String,
    /// Extra `package.cpath` entries (from "Lua.RequireCPaths" option)
    pub require_cpaths: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compatibility_mode: false,
            trace_back: false,
            script_reloader: false,
            script_path: "lua_scripts".into(),
            only_on_maps: BTreeSet::new(),
            require_paths: String::new(),
            require_cpaths: String::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        Ok(config)
    }

    /// Load configuration from [`DEFAULT_CONFIG_PATH`]
    pub fn load_default() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    /// Parse configuration file content
    pub fn parse(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(eq_pos) = line.find('=') {
                let key = line[..eq_pos].trim();
                let value = line[eq_pos + 1..].trim().trim_matches('"');

                config.parse_option(key, value);
            }
        }

        Ok(config)
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        match key {
            "Lua.Enabled" => self.enabled = parse_bool(value, true),
            "Lua.CompatibilityMode" => self.compatibility_mode = parse_bool(value, false),
            "Lua.TraceBack" => self.trace_back = parse_bool(value, false),
            "Lua.ScriptReloader" => self.script_reloader = parse_bool(value, false),
            "Lua.ScriptPath" => self.script_path = value.into(),
            "Lua.OnlyOnMaps" => self.only_on_maps = tokenize_maps(value),
            "Lua.RequirePaths" => self.require_paths = value.into(),
            "Lua.RequireCPaths" => self.require_cpaths = value.into(),
            _ => tracing::debug!("Ignoring unknown config option `{}`", key),
        }
    }

    /// Whether a map is allowed to own its own script state
    pub fn should_map_load(&self, map_id: u32) -> bool {
        self.only_on_maps.is_empty() || self.only_on_maps.contains(&map_id)
    }

    /// Script root with a leading `~` expanded to the home directory
    pub fn resolved_script_path(&self) -> PathBuf {
        if let Some(rest) = self.script_path.strip_prefix('~') {
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(format!("{}{}", home, rest));
            }
        }
        PathBuf::from(&self.script_path)
    }

    /// Display configuration summary
    pub fn display(&self) {
        tracing::info!("Scripting configuration:");
        tracing::info!("    Enabled: {}", self.enabled);
        tracing::info!("    Compatibility Mode: {}", self.compatibility_mode);
        tracing::info!("    TraceBack: {}", self.trace_back);
        tracing::info!("    Script Reloader: {}", self.script_reloader);
        tracing::info!("    Script Path: {}", self.resolved_script_path().display());
        if self.only_on_maps.is_empty() {
            tracing::info!("    Only On Maps: (all)");
        } else {
            tracing::info!("    Only On Maps: {:?}", self.only_on_maps);
        }
        if !self.require_paths.is_empty() {
            tracing::info!("    Require Paths: {}", self.require_paths);
        }
        if !self.require_cpaths.is_empty() {
            tracing::info!("    Require CPaths: {}", self.require_cpaths);
        }
    }
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn tokenize_maps(value: &str) -> BTreeSet<u32> {
    let mut maps = BTreeSet::new();

    for token in value.split(',') {
        let token: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        if token.is_empty() {
            continue;
        }
        match token.parse::<u32>() {
            Ok(map_id) => {
                maps.insert(map_id);
            }
            Err(_) => {
                tracing::error!("Error tokenizing Lua.OnlyOnMaps, invalid config value '{}'", token);
            }
        }
    }

    maps
}
