//! Error types for the scripting crate

use hookbridge_core::BridgeError;

/// Script-specific error types
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Interpreter error
    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// Registration with an event id outside the category's taxonomy
    #[error("Unknown event type (regtype {regtype}, id {id}, event {event})")]
    UnknownEvent { regtype: u8, id: u32, event: u32 },

    /// Registration for an entry the host does not know
    #[error("Couldn't find a {kind} with (ID: {entry})!")]
    EntryNotFound { kind: &'static str, entry: u32 },

    /// Timed event with an inverted delay range
    #[error("min is bigger than max delay")]
    InvalidDelay { min: u32, max: u32 },

    /// Save-blob encode/decode failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Script folder or file access failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Scripting disabled in configuration
    #[error("Scripting is disabled")]
    Disabled,
}

impl From<ScriptError> for BridgeError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::Io(e) => BridgeError::Io(e),
            ScriptError::Persistence(msg) => BridgeError::Persistence(msg),
            other => BridgeError::Script(other.to_string()),
        }
    }
}

impl From<ScriptError> for mlua::Error {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::Lua(e) => e,
            other => mlua::Error::RuntimeError(other.to_string()),
        }
    }
}

/// Result type for scripting operations
pub type Result<T> = std::result::Result<T, ScriptError>;
