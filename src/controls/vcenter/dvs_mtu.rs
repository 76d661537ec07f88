use serde_json::Value;

use super::VCENTER;
use crate::controls::{records, to_value};
use crate::domain::comparator::{diff_against_spec, is_compliant, Comparator};
use crate::domain::controller::{CollectionRemediation, Controller};
use crate::domain::desired_state::DesiredStateResolver;
use crate::domain::error::ControlError;
use crate::domain::types::SetOutcome;
use crate::vendor::ControlContext;

const IDENTITY: &[&str] = &["switch_name"];
const KEYS: &[&str] = &["mtu"];
const MTU_RANGE: std::ops::RangeInclusive<u64> = 1280..=9000;

/// MTU of every distributed switch, overridable per switch.
pub struct DvsMtuControl;

fn valid_mtu(value: &Value) -> Result<u32, ControlError> {
    value
        .as_u64()
        .filter(|mtu| MTU_RANGE.contains(mtu))
        .map(|mtu| mtu as u32)
        .ok_or_else(|| {
            ControlError::invalid(format!(
                "mtu {value} is outside {}..={}",
                MTU_RANGE.start(),
                MTU_RANGE.end()
            ))
        })
}

impl Controller for DvsMtuControl {
    fn name(&self) -> &'static str {
        "dvs_mtu"
    }

    fn product(&self) -> &'static str {
        VCENTER
    }

    fn description(&self) -> &'static str {
        "Maximum transmission unit of distributed switches"
    }

    fn prepare_desired(&self, desired: &Value) -> Result<Value, ControlError> {
        DesiredStateResolver::new(desired, IDENTITY)?;
        Ok(desired.clone())
    }

    fn fetch(&self, ctx: &ControlContext) -> Result<Value, ControlError> {
        to_value(&ctx.dvs()?.switch_mtus()?)
    }

    fn compare(&self, current: &Value, desired: &Value) -> Result<Option<(Value, Value)>, ControlError> {
        diff_against_spec(&records(current)?, desired, IDENTITY, KEYS)
    }

    fn apply(&self, ctx: &ControlContext, desired: &Value) -> Result<SetOutcome, ControlError> {
        let dvs = ctx.dvs()?;
        let resolver = DesiredStateResolver::new(desired, IDENTITY)?;
        let comparator = Comparator::new(KEYS).with_identity(IDENTITY);
        let mut outcome = CollectionRemediation::new();

        for switch in dvs.switch_mtus()? {
            let current = to_value(&switch)?;
            let Some(object) = current.as_object() else {
                continue;
            };
            let wanted = resolver.resolve_record(object, KEYS);
            let (old, new) = comparator.non_compliant_configs(&current, &Value::Object(wanted));
            if is_compliant(&old) {
                continue;
            }
            let Some(target) = resolver.resolve(object, "mtu") else {
                continue;
            };

            let result = valid_mtu(target)
                .and_then(|mtu| dvs.set_switch_mtu(&switch.switch_name, mtu).map_err(ControlError::from));
            match result {
                Ok(()) => outcome.succeeded(old, new),
                Err(e) => outcome.failed(&switch.switch_name, e),
            }
        }

        Ok(outcome.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::*;
    use crate::vendor::dvs::SwitchMtu;
    use crate::vendor::testing::FakeDvs;
    use serde_json::json;
    use std::sync::Arc;

    fn setup(mtus: &[(&str, u32)]) -> (Arc<FakeDvs>, ControlContext) {
        let dvs = Arc::new(FakeDvs::default());
        *dvs.mtus.lock().unwrap() = mtus
            .iter()
            .map(|(name, mtu)| SwitchMtu {
                switch_name: name.to_string(),
                mtu: *mtu,
            })
            .collect();
        let ctx = ControlContext::default().with_dvs(dvs.clone());
        (dvs, ctx)
    }

    #[test]
    fn plain_value_applies_to_every_switch() {
        let (dvs, ctx) = setup(&[("dvs-01", 1500), ("dvs-02", 9000)]);
        let result = DvsMtuControl.remediate(&ctx, &json!({ "mtu": 9000 }));
        assert_eq!(result.status, RemediateStatus::Success);
        assert_eq!(result.old, Some(json!([{ "switch_name": "dvs-01", "mtu": 1500 }])));
        assert!(dvs.mtus.lock().unwrap().iter().all(|s| s.mtu == 9000));
    }

    #[test]
    fn override_exempts_a_switch() {
        let (_, ctx) = setup(&[("dvs-01", 9000), ("dvs-vmotion", 1500)]);
        let spec = json!({
            "__GLOBAL__": { "mtu": 9000 },
            "__OVERRIDES__": [{ "switch_name": "dvs-vmotion", "mtu": 1500 }]
        });
        let result = DvsMtuControl.check_compliance(&ctx, &spec);
        assert_eq!(result.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn out_of_range_mtu_fails_that_switch_only() {
        let (_, ctx) = setup(&[("dvs-01", 1500), ("dvs-02", 1500)]);
        let spec = json!({
            "__GLOBAL__": { "mtu": 9000 },
            "__OVERRIDES__": [{ "switch_name": "dvs-02", "mtu": 12000 }]
        });
        let result = DvsMtuControl.remediate(&ctx, &spec);
        assert_eq!(result.status, RemediateStatus::Partial);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("dvs-02: invalid desired state: mtu 12000"));
    }
}
