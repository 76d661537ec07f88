use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::VCENTER;
use crate::controls::{into_drift, parse_desired};
use crate::domain::comparator::get_non_compliant_configs;
use crate::domain::controller::Controller;
use crate::domain::error::ControlError;
use crate::domain::types::SetOutcome;
use crate::vendor::ControlContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SshSpec {
    enabled: bool,
}

pub struct SshControl;

impl Controller for SshControl {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn product(&self) -> &'static str {
        VCENTER
    }

    fn description(&self) -> &'static str {
        "SSH access to the appliance shell"
    }

    fn min_version(&self) -> Option<Version> {
        Some(Version::new(7, 0, 0))
    }

    fn prepare_desired(&self, desired: &Value) -> Result<Value, ControlError> {
        let spec: SshSpec = parse_desired(desired)?;
        Ok(json!({ "enabled": spec.enabled }))
    }

    fn fetch(&self, ctx: &ControlContext) -> Result<Value, ControlError> {
        let enabled = ctx.appliance()?.ssh_enabled()?;
        Ok(json!({ "enabled": enabled }))
    }

    fn compare(&self, current: &Value, desired: &Value) -> Result<Option<(Value, Value)>, ControlError> {
        Ok(into_drift(get_non_compliant_configs(current, desired, &["enabled"])))
    }

    fn apply(&self, ctx: &ControlContext, desired: &Value) -> Result<SetOutcome, ControlError> {
        let spec: SshSpec = parse_desired(desired)?;
        ctx.appliance()?.set_ssh_enabled(spec.enabled)?;
        Ok(SetOutcome::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::*;
    use crate::vendor::testing::FakeAppliance;
    use std::sync::Arc;

    #[test]
    fn disables_ssh() {
        let appliance = Arc::new(FakeAppliance::default());
        let ctx = ControlContext::default()
            .with_appliance(appliance.clone())
            .with_product_version(Version::new(8, 0, 2));

        let result = SshControl.remediate(&ctx, &json!({ "enabled": false }));
        assert_eq!(result.status, RemediateStatus::Success);
        assert_eq!(result.old, Some(json!({ "enabled": true })));
        assert_eq!(result.new, Some(json!({ "enabled": false })));
        assert!(!appliance.snapshot().ssh_enabled);
    }

    #[test]
    fn skipped_on_6x() {
        let appliance = Arc::new(FakeAppliance::default());
        appliance.fail_on("ssh_enabled");
        let ctx = ControlContext::default()
            .with_appliance(appliance)
            .with_product_version(Version::new(6, 7, 0));

        let result = SshControl.check_compliance(&ctx, &json!({ "enabled": false }));
        assert_eq!(result.status, ComplianceStatus::Skipped);
        assert_eq!(result.errors, vec![NOT_APPLICABLE.to_string()]);
    }

    #[test]
    fn failed_set_is_reported() {
        let appliance = Arc::new(FakeAppliance::default());
        appliance.fail_on("set_ssh_enabled");
        let ctx = ControlContext::default().with_appliance(appliance);

        let result = SshControl.remediate(&ctx, &json!({ "enabled": false }));
        assert_eq!(result.status, RemediateStatus::Failed);
        assert_eq!(result.errors, vec!["set_ssh_enabled unavailable".to_string()]);
    }
}
