//! # HookBridge Scripting
//!
//! Lua scripting bridge for a game world host.
//!
//! ## Features
//! - Binding stores keyed by event, by entry and by unique object
//! - Typed hook call sites with fire-and-forget, boolean and in/out policies
//! - Timed events with reentrancy-safe deferred mutation
//! - Per-object timed event processors with deferred cleanup
//! - Hot reload of every script state
//! - Base64 save blobs for instance data
//!
//! ## States
//! One [`ScriptEngine`] exists for the world and, unless compatibility mode
//! is on, one per map instance. [`EngineManager`] owns them all.

pub mod binding;
pub mod context;
pub mod engine;
pub mod error;
pub mod event_mgr;
pub mod hooks;
pub mod host;
pub mod instance;
pub mod loader;
pub mod manager;
pub mod object;
pub mod persist;
pub mod timed;
mod triggers;

pub use binding::{BindingId, BindingStore, EntryKey, EventKey, HookKey, UniqueObjectKey};
pub use context::EngineContext;
pub use engine::{Bindings, CallState, ScriptEngine};
pub use error::{Result, ScriptError};
pub use event_mgr::{EventManager, ProcessorId};
pub use hooks::{HookEvent, RegisterType};
pub use host::{ApiExtension, EntryKind, Host, NullHost};
pub use instance::InstanceScript;
pub use loader::{LuaScript, ScriptCatalog, ScriptKind};
pub use manager::EngineManager;
pub use object::ScriptObject;
pub use timed::{EventId, EventState, TimedEvent, TimedEventProcessor, TimedFire};
