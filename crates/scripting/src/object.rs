//! Host objects as seen from Lua
//!
//! A [`ScriptObject`] is only valid during the callstack it was pushed in.
//! Once the outermost call of that dispatch returns, the engine's callstack
//! id moves on and every method of a stale object raises an error instead of
//! touching a host object that may no longer exist.

use hookbridge_core::HostObject;
use mlua::{Function, MetaMethod, UserData, UserDataMethods, Value};
use std::sync::Arc;

use crate::engine::{schedule_event, EngineShared};
use crate::timed::{EventId, EventState};

/// Userdata wrapper around a [`HostObject`]
pub struct ScriptObject {
    object: HostObject,
    callstack_id: u64,
    shared: Arc<EngineShared>,
}

impl ScriptObject {
    pub(crate) fn new(object: HostObject, shared: &Arc<EngineShared>) -> Self {
        Self {
            object,
            callstack_id: shared.calls.callstack_id(),
            shared: Arc::clone(shared),
        }
    }

    pub fn object(&self) -> &HostObject {
        &self.object
    }

    /// Whether the callstack this object was pushed in is still running
    pub fn is_valid(&self) -> bool {
        self.shared.calls.callstack_id() == self.callstack_id
    }

    fn checked(&self) -> mlua::Result<&HostObject> {
        if self.is_valid() {
            Ok(&self.object)
        } else {
            Err(mlua::Error::RuntimeError(format!(
                "Using an invalid {} object; objects are only valid during the callback they were passed to",
                self.object.kind.as_str()
            )))
        }
    }
}

impl UserData for ScriptObject {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("GetGUID", |_, this, ()| Ok(this.checked()?.guid.to_bits()));
        methods.add_method("GetEntry", |_, this, ()| Ok(this.checked()?.entry));
        methods.add_method("GetMapId", |_, this, ()| Ok(this.checked()?.map_id));
        methods.add_method("GetInstanceId", |_, this, ()| Ok(this.checked()?.instance_id));
        methods.add_method("GetTypeName", |_, this, ()| Ok(this.object.kind.as_str()));

        methods.add_method(
            "RegisterEvent",
            |lua, this, (func, delay, repeats): (Function, Value, Option<u32>)| -> mlua::Result<EventId> {
                let object = this.checked()?;
                let slot = this.shared.events.processor_for_object_or_create(object);
                schedule_event(lua, &this.shared, slot.processor(), func, delay, repeats)
            },
        );

        methods.add_method("RemoveEventById", |_, this, id: EventId| {
            let object = this.checked()?;
            if let Some(slot) = this.shared.events.processor_for_object(object.guid) {
                slot.processor().set_state(id, EventState::Abort);
            }
            Ok(())
        });

        methods.add_method("RemoveEvents", |_, this, ()| {
            let object = this.checked()?;
            if let Some(slot) = this.shared.events.processor_for_object(object.guid) {
                slot.processor().set_states(EventState::Abort);
            }
            Ok(())
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}: {}", this.object.kind.as_str(), this.object.guid))
        });
    }
}
