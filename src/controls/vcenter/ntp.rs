//! NTP servers and time synchronization mode.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::VCENTER;
use crate::controls::{into_drift, parse_desired};
use crate::domain::comparator::Comparator;
use crate::domain::controller::Controller;
use crate::domain::error::ControlError;
use crate::domain::types::SetOutcome;
use crate::vendor::ControlContext;

const KEYS: &[&str] = &["mode", "servers"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NtpSpec {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    servers: Option<Vec<String>>,
}

pub struct NtpControl;

impl Controller for NtpControl {
    fn name(&self) -> &'static str {
        "ntp"
    }

    fn product(&self) -> &'static str {
        VCENTER
    }

    fn description(&self) -> &'static str {
        "NTP servers and time sync mode of the vCenter appliance"
    }

    fn prepare_desired(&self, desired: &Value) -> Result<Value, ControlError> {
        parse_desired::<NtpSpec>(desired)?;
        Ok(desired.clone())
    }

    fn fetch(&self, ctx: &ControlContext) -> Result<Value, ControlError> {
        let appliance = ctx.appliance()?;
        let servers = appliance.ntp_servers()?;
        let mode = appliance.timesync_mode()?;
        Ok(json!({ "mode": mode, "servers": servers }))
    }

    fn compare(&self, current: &Value, desired: &Value) -> Result<Option<(Value, Value)>, ControlError> {
        // Server order carries no meaning for NTP.
        let comparator = Comparator::new(KEYS).unordered(&["servers"]);
        Ok(into_drift(comparator.non_compliant_configs(current, desired)))
    }

    fn apply(&self, ctx: &ControlContext, desired: &Value) -> Result<SetOutcome, ControlError> {
        let spec: NtpSpec = parse_desired(desired)?;
        let appliance = ctx.appliance()?;
        let mut applied = None;
        if let Some(servers) = &spec.servers {
            let previous = appliance.ntp_servers()?;
            appliance.set_ntp_servers(servers)?;
            applied = Some((json!({ "servers": previous }), json!({ "servers": servers })));
        }
        if let Some(mode) = &spec.mode {
            if let Err(e) = appliance.set_timesync_mode(mode) {
                // Servers may already be written; report them alongside the failure.
                let Some(changes) = applied else {
                    return Err(e.into());
                };
                return Err(ControlError::PartialFailure {
                    errors: vec![format!("mode: {e}")],
                    changes: Some(changes),
                });
            }
        }
        Ok(SetOutcome::success())
    }
}
