use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::VCENTER;
use crate::controls::{into_drift, parse_desired};
use crate::domain::comparator::Comparator;
use crate::domain::controller::Controller;
use crate::domain::error::ControlError;
use crate::domain::types::SetOutcome;
use crate::vendor::appliance::SyslogForwarding;
use crate::vendor::ControlContext;

/// The appliance accepts at most this many forwarding targets.
const MAX_TARGETS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SyslogSpec {
    servers: Vec<SyslogForwarding>,
}

pub struct SyslogControl;

impl Controller for SyslogControl {
    fn name(&self) -> &'static str {
        "syslog"
    }

    fn product(&self) -> &'static str {
        VCENTER
    }

    fn description(&self) -> &'static str {
        "Remote syslog forwarding targets"
    }

    fn prepare_desired(&self, desired: &Value) -> Result<Value, ControlError> {
        let spec: SyslogSpec = parse_desired(desired)?;
        if spec.servers.len() > MAX_TARGETS {
            return Err(ControlError::invalid(format!(
                "at most {MAX_TARGETS} syslog targets are supported, got {}",
                spec.servers.len()
            )));
        }
        for target in &spec.servers {
            if !matches!(target.protocol.as_str(), "TLS" | "UDP" | "TCP" | "RELP") {
                return Err(ControlError::invalid(format!(
                    "unsupported syslog protocol '{}'",
                    target.protocol
                )));
            }
        }
        Ok(json!({ "servers": spec.servers }))
    }

    fn fetch(&self, ctx: &ControlContext) -> Result<Value, ControlError> {
        let servers = ctx.appliance()?.syslog_forwarding()?;
        Ok(json!({ "servers": servers }))
    }

    fn compare(&self, current: &Value, desired: &Value) -> Result<Option<(Value, Value)>, ControlError> {
        let comparator = Comparator::new(&["servers"]).unordered(&["servers"]);
        Ok(into_drift(comparator.non_compliant_configs(current, desired)))
    }

    fn apply(&self, ctx: &ControlContext, desired: &Value) -> Result<SetOutcome, ControlError> {
        let spec: SyslogSpec = parse_desired(desired)?;
        ctx.appliance()?.set_syslog_forwarding(&spec.servers)?;
        Ok(SetOutcome::success())
    }
}
