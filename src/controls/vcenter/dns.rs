use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::VCENTER;
use crate::controls::{into_drift, parse_desired, to_value};
use crate::domain::comparator::Comparator;
use crate::domain::controller::Controller;
use crate::domain::error::ControlError;
use crate::domain::types::SetOutcome;
use crate::vendor::appliance::DnsServers;
use crate::vendor::ControlContext;

const KEYS: &[&str] = &["mode", "servers"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DnsSpec {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    servers: Option<Vec<String>>,
}

pub struct DnsControl;

impl Controller for DnsControl {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn product(&self) -> &'static str {
        VCENTER
    }

    fn description(&self) -> &'static str {
        "DNS resolution mode and server list (order is significant)"
    }

    fn prepare_desired(&self, desired: &Value) -> Result<Value, ControlError> {
        let spec: DnsSpec = parse_desired(desired)?;
        if let Some(mode) = &spec.mode {
            if mode != "dhcp" && mode != "is_static" {
                return Err(ControlError::invalid(format!(
                    "dns mode '{mode}' (expected dhcp or is_static)"
                )));
            }
        }
        Ok(desired.clone())
    }

    fn fetch(&self, ctx: &ControlContext) -> Result<Value, ControlError> {
        let dns = ctx.appliance()?.dns_servers()?;
        to_value(&dns)
    }

    fn compare(&self, current: &Value, desired: &Value) -> Result<Option<(Value, Value)>, ControlError> {
        Ok(into_drift(Comparator::new(KEYS).non_compliant_configs(current, desired)))
    }

    fn apply(&self, ctx: &ControlContext, desired: &Value) -> Result<SetOutcome, ControlError> {
        let spec: DnsSpec = parse_desired(desired)?;
        let appliance = ctx.appliance()?;
        // The API replaces mode and servers together.
        let current = appliance.dns_servers()?;
        let target = DnsServers {
            mode: spec.mode.unwrap_or(current.mode),
            servers: spec.servers.unwrap_or(current.servers),
        };
        appliance.set_dns_servers(&target)?;
        Ok(SetOutcome::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::*;
    use crate::vendor::testing::FakeAppliance;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn server_order_matters() {
        let appliance = Arc::new(FakeAppliance::default());
        appliance.state.lock().unwrap().dns.servers = vec!["10.0.0.53".into(), "10.0.0.54".into()];
        let ctx = ControlContext::default().with_appliance(appliance);

        let result = DnsControl.check_compliance(&ctx, &json!({ "servers": ["10.0.0.54", "10.0.0.53"] }));
        assert_eq!(result.status, ComplianceStatus::NonCompliant);
    }

    #[test]
    fn partial_spec_keeps_current_mode() {
        let appliance = Arc::new(FakeAppliance::default());
        let ctx = ControlContext::default().with_appliance(appliance.clone());

        let result = DnsControl.remediate(&ctx, &json!({ "servers": ["1.1.1.1"] }));
        assert_eq!(result.status, RemediateStatus::Success);
        let dns = appliance.snapshot().dns;
        assert_eq!(dns.mode, "is_static");
        assert_eq!(dns.servers, vec!["1.1.1.1"]);
    }

    #[test]
    fn bad_mode_is_rejected() {
        let ctx = ControlContext::default().with_appliance(Arc::new(FakeAppliance::default()));
        let result = DnsControl.check_compliance(&ctx, &json!({ "mode": "static" }));
        assert_eq!(result.status, ComplianceStatus::Failed);
    }
}
