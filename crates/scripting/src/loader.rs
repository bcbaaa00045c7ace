//! Script loader
//!
//! Scans the script folder once and hands the result to every engine.
//! Extensions (`.ext`) always run before plain scripts (`.lua`), each group in
//! path order. A file below a numeric top-level folder (`571/boss.lua`) only
//! loads into states of that map.

use hookbridge_config::EngineConfig;
use hookbridge_core::StateKey;
use mlua::{Lua, Table, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What a file is loaded as
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScriptKind {
    /// `.ext`, runs first
    Extension,
    /// `.lua`
    Script,
}

/// One file found by the scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuaScript {
    /// File stem, the module name in `package.loaded`
    pub name: String,
    pub path: PathBuf,
    pub kind: ScriptKind,
    /// Map the file is bound to, `None` for every state
    pub map_id: Option<u32>,
}

impl LuaScript {
    /// Whether this file runs in the state `key`
    pub fn loads_into(&self, key: StateKey, compatibility_mode: bool) -> bool {
        if compatibility_mode {
            return true;
        }
        match self.map_id {
            None => true,
            Some(map_id) => key.map_id() == Some(map_id),
        }
    }
}

/// Result of a script folder scan, in run order
#[derive(Debug, Clone, Default)]
pub struct ScriptCatalog {
    scripts: Vec<LuaScript>,
    /// `dir/?.lua;dir/?.ext` for every scanned directory
    require_path: String,
}

impl ScriptCatalog {
    /// Scan the configured script folder
    pub fn scan(config: &EngineConfig) -> Self {
        Self::scan_dir(&config.resolved_script_path())
    }

    /// Scan `root` recursively
    pub fn scan_dir(root: &Path) -> Self {
        let start = Instant::now();
        tracing::info!("Searching scripts from `{}`", root.display());

        let mut catalog = Self::default();
        let mut require_paths = Vec::new();
        catalog.read_dir(root, root, &mut require_paths);
        catalog.require_path = require_paths.join(";");

        // Extensions first, then scripts, each by full path
        catalog
            .scripts
            .sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.path.cmp(&b.path)));

        tracing::info!(
            "Loaded {} scripts in {} ms",
            catalog.scripts.len(),
            start.elapsed().as_millis()
        );
        catalog
    }

    fn read_dir(&mut self, root: &Path, dir: &Path, require_paths: &mut Vec<String>) {
        tracing::debug!("Reading scripts from `{}`", dir.display());

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("Cannot read script folder `{}`: {}", dir.display(), err);
                return;
            }
        };

        require_paths.push(format!("{0}/?.lua;{0}/?.ext", dir.display()));

        for entry in entries.flatten() {
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden {
                continue;
            }

            if path.is_dir() {
                self.read_dir(root, &path, require_paths);
            } else if path.is_file() {
                self.add_script(root, path);
            }
        }
    }

    fn add_script(&mut self, root: &Path, path: PathBuf) {
        let kind = match path.extension().and_then(|ext| ext.to_str()) {
            Some("lua") => ScriptKind::Script,
            Some("ext") => ScriptKind::Extension,
            _ => return,
        };
        let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
            return;
        };

        let script = LuaScript {
            name: name.to_string(),
            map_id: bound_map(root, &path),
            kind,
            path,
        };
        tracing::debug!("Added script `{}`", script.path.display());
        self.scripts.push(script);
    }

    pub fn scripts(&self) -> &[LuaScript] {
        &self.scripts
    }

    pub fn require_path(&self) -> &str {
        &self.require_path
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Map id of a numeric top-level folder under `root`
fn bound_map(root: &Path, path: &Path) -> Option<u32> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let first = components.next()?;
    // A top-level file is never bound, even if its name is numeric
    components.next()?;
    first.as_os_str().to_str()?.parse().ok()
}

/// Point `require` at the script folders and configured extra paths
pub(crate) fn configure_package(lua: &Lua, catalog: &ScriptCatalog, config: &EngineConfig) -> mlua::Result<()> {
    let package: Table = lua.globals().get("package")?;

    let path = join_paths(catalog.require_path(), &config.require_paths);
    package.set("path", path)?;
    package.set("cpath", config.require_cpaths.as_str())?;
    Ok(())
}

fn join_paths(base: &str, extra: &str) -> String {
    match (base.is_empty(), extra.is_empty()) {
        (_, true) => base.to_string(),
        (true, false) => extra.to_string(),
        (false, false) => format!("{};{}", base, extra),
    }
}

/// Run every script of `catalog` that belongs to `key`.
///
/// Returns the number of scripts that ran successfully. Failures are logged
/// and never stop the remaining scripts.
pub(crate) fn run_scripts(lua: &Lua, catalog: &ScriptCatalog, key: StateKey, compatibility_mode: bool) -> usize {
    let loaded: Table = match lua
        .globals()
        .get::<Table>("package")
        .and_then(|package| package.get::<Table>("loaded"))
    {
        Ok(loaded) => loaded,
        Err(err) => {
            tracing::error!("[{}] Cannot access package.loaded: {}", key, err);
            return 0;
        }
    };

    let mut seen: HashMap<&str, &Path> = HashMap::new();
    let mut count = 0;

    for script in catalog.scripts() {
        if !script.loads_into(key, compatibility_mode) {
            continue;
        }

        if let Some(previous) = seen.get(script.name.as_str()) {
            tracing::error!(
                "Error loading `{}`. File with same name already loaded from `{}`, rename either file",
                script.path.display(),
                previous.display()
            );
            continue;
        }
        seen.insert(&script.name, &script.path);

        match loaded.contains_key(script.name.as_str()) {
            Ok(true) => {
                tracing::debug!("`{}` was already loaded or required", script.path.display());
                continue;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::error!("Error loading `{}`: {}", script.path.display(), err);
                continue;
            }
        }

        match run_script(lua, script) {
            Ok(result) => {
                let result = match result {
                    Value::Nil | Value::Boolean(false) => Value::Boolean(true),
                    other => other,
                };
                if let Err(err) = loaded.set(script.name.as_str(), result) {
                    tracing::error!("Error loading `{}`: {}", script.path.display(), err);
                    continue;
                }
                tracing::debug!("Successfully loaded `{}`", script.path.display());
                count += 1;
            }
            Err(err) => {
                tracing::error!("Error loading `{}`", script.path.display());
                tracing::error!("{}", err);
            }
        }
    }

    count
}

fn run_script(lua: &Lua, script: &LuaScript) -> mlua::Result<Value> {
    let source = fs::read(&script.path).map_err(mlua::Error::external)?;
    lua.load(source)
        .set_name(format!("@{}", script.path.display()))
        .eval::<Value>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_order_and_filters() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.lua", "");
        write(dir.path(), "a.lua", "");
        write(dir.path(), "zz.ext", "");
        write(dir.path(), "notes.txt", "");
        write(dir.path(), ".hidden.lua", "");
        write(dir.path(), ".git/config.lua", "");
        write(dir.path(), "571/boss.lua", "");

        let catalog = ScriptCatalog::scan_dir(dir.path());
        let names: Vec<_> = catalog.scripts().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zz", "boss", "a", "b"]);

        let boss = catalog.scripts().iter().find(|s| s.name == "boss").unwrap();
        assert_eq!(boss.map_id, Some(571));
        assert!(catalog.require_path().contains("/?.ext"));
    }

    #[test]
    fn test_numeric_top_level_file_is_not_bound() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "123.lua", "");
        write(dir.path(), "common/1/x.lua", "");

        let catalog = ScriptCatalog::scan_dir(dir.path());
        assert!(catalog.scripts().iter().all(|s| s.map_id.is_none()));
    }

    #[test]
    fn test_loads_into() {
        let script = LuaScript {
            name: "boss".into(),
            path: PathBuf::from("571/boss.lua"),
            kind: ScriptKind::Script,
            map_id: Some(571),
        };
        assert!(script.loads_into(StateKey::map(571, 2), false));
        assert!(!script.loads_into(StateKey::map(1, 0), false));
        assert!(!script.loads_into(StateKey::GLOBAL, false));
        assert!(script.loads_into(StateKey::GLOBAL, true));
    }

    #[test]
    fn test_run_scripts_duplicates_and_results() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/shared.lua", "first = true");
        write(dir.path(), "b/shared.lua", "second = true");
        write(dir.path(), "module.lua", "return { value = 5 }");
        write(dir.path(), "broken.lua", "this is not lua");

        let catalog = ScriptCatalog::scan_dir(dir.path());
        let lua = Lua::new();
        let count = run_scripts(&lua, &catalog, StateKey::GLOBAL, false);
        assert_eq!(count, 2);

        let globals = lua.globals();
        assert_eq!(globals.get::<Option<bool>>("first").unwrap(), Some(true));
        assert_eq!(globals.get::<Option<bool>>("second").unwrap(), None);

        let loaded: Table = lua.load("return package.loaded").eval().unwrap();
        assert_eq!(loaded.get::<bool>("shared").unwrap(), true);
        let module: Table = loaded.get("module").unwrap();
        assert_eq!(module.get::<i64>("value").unwrap(), 5);
    }

    #[test]
    fn test_required_module_is_not_run_twice() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a_main.lua", "require('b_lib')");
        write(dir.path(), "b_lib.lua", "lib_runs = (lib_runs or 0) + 1");

        let catalog = ScriptCatalog::scan_dir(dir.path());
        let lua = Lua::new();
        configure_package(&lua, &catalog, &EngineConfig::default()).unwrap();
        run_scripts(&lua, &catalog, StateKey::GLOBAL, false);

        assert_eq!(lua.globals().get::<i64>("lib_runs").unwrap(), 1);
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("a/?.lua", ""), "a/?.lua");
        assert_eq!(join_paths("", "b/?.lua"), "b/?.lua");
        assert_eq!(join_paths("a/?.lua", "b/?.lua"), "a/?.lua;b/?.lua");
    }
}
