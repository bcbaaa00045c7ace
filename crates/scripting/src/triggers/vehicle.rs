use hookbridge_core::HostObject;

use crate::binding::EventKey;
use crate::engine::{bound, ScriptEngine};
use crate::hooks::VehicleEvent;

impl ScriptEngine {
    pub fn on_vehicle_install(&self, vehicle: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().vehicle, EventKey::new(VehicleEvent::OnInstall)), || {
            rt.object(vehicle)
        });
    }

    pub fn on_vehicle_uninstall(&self, vehicle: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().vehicle, EventKey::new(VehicleEvent::OnUninstall)), || {
            rt.object(vehicle)
        });
    }

    pub fn on_vehicle_add_passenger(&self, vehicle: &HostObject, passenger: &HostObject, seat: i8) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().vehicle, EventKey::new(VehicleEvent::OnAddPassenger)), || {
            (rt.object(vehicle), rt.object(passenger), seat)
        });
    }
}
