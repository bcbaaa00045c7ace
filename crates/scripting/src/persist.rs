//! Save-blob persistence for script-owned tables
//!
//! A table is snapshotted into a [`SavedValue`] tree, serialized with
//! bincode and wrapped in Base64 so the host can store it as text. Functions,
//! userdata and threads cannot be saved and are skipped.
//!
//! Tables are numbered in the order they are first reached. A table reached
//! again is saved as a [`SavedValue::Ref`] to that number, so shared
//! subtables and cycles come back as the same table instead of copies.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mlua::{Lua, Table, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::c_void;

use crate::error::{Result, ScriptError};

/// Nesting limit of saved tables
pub const MAX_DEPTH: usize = 64;

/// Serializable snapshot of a Lua value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SavedValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(Vec<u8>),
    Table(Vec<(SavedValue, SavedValue)>),
    /// A table already saved earlier in the same snapshot
    Ref(u32),
}

fn is_savable(value: &Value) -> bool {
    matches!(
        value,
        Value::Nil | Value::Boolean(_) | Value::Integer(_) | Value::Number(_) | Value::String(_) | Value::Table(_)
    )
}

/// Tables seen so far while capturing
#[derive(Default)]
struct Capture {
    tables: HashMap<*const c_void, u32>,
}

impl Capture {
    fn value(&mut self, value: &Value, depth: usize) -> Result<SavedValue> {
        let saved = match value {
            Value::Boolean(b) => SavedValue::Boolean(*b),
            Value::Integer(i) => SavedValue::Integer(*i),
            Value::Number(n) => SavedValue::Number(*n),
            Value::String(s) => SavedValue::String(s.as_bytes().to_vec()),
            Value::Table(table) => return self.table(table, depth),
            _ => SavedValue::Nil,
        };
        Ok(saved)
    }

    fn table(&mut self, table: &Table, depth: usize) -> Result<SavedValue> {
        if let Some(index) = self.tables.get(&table.to_pointer()) {
            return Ok(SavedValue::Ref(*index));
        }
        if depth >= MAX_DEPTH {
            return Err(ScriptError::Persistence(format!(
                "table nesting deeper than {} levels",
                MAX_DEPTH
            )));
        }

        let index = u32::try_from(self.tables.len())
            .map_err(|_| ScriptError::Persistence("too many tables".to_string()))?;
        self.tables.insert(table.to_pointer(), index);

        let mut pairs = Vec::new();
        for pair in table.pairs::<Value, Value>() {
            let (key, value) = pair?;
            // Skip before capturing so table numbering matches the restore order
            if !is_savable(&key) || !is_savable(&value) {
                continue;
            }
            let key = self.value(&key, depth + 1)?;
            let value = self.value(&value, depth + 1)?;
            pairs.push((key, value));
        }
        Ok(SavedValue::Table(pairs))
    }
}

/// Tables rebuilt so far, indexed like [`Capture`] numbered them
struct Restore<'a> {
    lua: &'a Lua,
    tables: Vec<Table>,
}

impl Restore<'_> {
    fn value(&mut self, saved: &SavedValue) -> Result<Value> {
        let value = match saved {
            SavedValue::Nil => Value::Nil,
            SavedValue::Boolean(b) => Value::Boolean(*b),
            SavedValue::Integer(i) => Value::Integer(*i),
            SavedValue::Number(n) => Value::Number(*n),
            SavedValue::String(bytes) => Value::String(self.lua.create_string(bytes)?),
            SavedValue::Ref(index) => {
                let table = self.tables.get(*index as usize).ok_or_else(|| {
                    ScriptError::Persistence(format!("invalid save data: unknown table reference {}", index))
                })?;
                Value::Table(table.clone())
            }
            SavedValue::Table(pairs) => {
                let table = self.lua.create_table_with_capacity(0, pairs.len())?;
                self.tables.push(table.clone());
                for (key, value) in pairs {
                    let key = self.value(key)?;
                    let value = self.value(value)?;
                    if key.is_nil() {
                        continue;
                    }
                    table.raw_set(key, value)?;
                }
                Value::Table(table)
            }
        };
        Ok(value)
    }
}

impl SavedValue {
    /// Snapshot a Lua value, `None` for values that cannot be saved
    pub fn from_lua(value: &Value) -> Result<Option<Self>> {
        if !is_savable(value) {
            return Ok(None);
        }
        Capture::default().value(value, 0).map(Some)
    }

    /// Rebuild the value inside `lua`
    pub fn to_lua(&self, lua: &Lua) -> Result<Value> {
        Restore {
            lua,
            tables: Vec::new(),
        }
        .value(self)
    }
}

/// Encode a table as Base64 text
pub fn encode_table(table: &Table) -> Result<String> {
    let saved = SavedValue::from_lua(&Value::Table(table.clone()))?.unwrap_or(SavedValue::Table(Vec::new()));
    let bytes = bincode::serialize(&saved).map_err(|e| ScriptError::Persistence(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

/// Decode Base64 text produced by [`encode_table`].
///
/// Empty text yields a fresh empty table. Anything that does not decode to a
/// table is an error.
pub fn decode_table(lua: &Lua, text: &str) -> Result<Table> {
    if text.is_empty() {
        return Ok(lua.create_table()?);
    }

    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| ScriptError::Persistence(format!("invalid base64: {}", e)))?;
    let saved: SavedValue =
        bincode::deserialize(&bytes).map_err(|e| ScriptError::Persistence(format!("invalid save data: {}", e)))?;

    match saved.to_lua(lua)? {
        Value::Table(table) => Ok(table),
        other => Err(ScriptError::Persistence(format!(
            "save data holds a {}, not a table",
            other.type_name()
        ))),
    }
}

/// [`decode_table`], logging failures and falling back to an empty table
pub fn decode_table_or_default(lua: &Lua, text: &str) -> Result<Table> {
    match decode_table(lua, text) {
        Ok(table) => Ok(table),
        Err(err) => {
            tracing::error!("Failed to load save data, starting fresh: {}", err);
            Ok(lua.create_table()?)
        }
    }
}
