//! Security policy of every distributed port group.
//!
//! Desired spec example:
//!
//! ```yaml
//! dvpg_security_policy:
//!   value:
//!     __GLOBAL__:
//!       allow_promiscuous: false
//!       allow_mac_address_change: false
//!       allow_forged_transmits: false
//!     __OVERRIDES__:
//!       - switch_name: dvs-01
//!         port_group_name: pg-nested-esxi
//!         allow_promiscuous: true
//!         allow_mac_address_change: true
//!         allow_forged_transmits: true
//! ```

use serde_json::{Map, Value};

use super::VCENTER;
use crate::controls::{records, to_value};
use crate::domain::comparator::{diff_against_spec, is_compliant, Comparator};
use crate::domain::controller::{CollectionRemediation, Controller};
use crate::domain::desired_state::DesiredStateResolver;
use crate::domain::error::ControlError;
use crate::domain::types::SetOutcome;
use crate::vendor::dvs::PortGroupSecurityPolicy;
use crate::vendor::ControlContext;

const IDENTITY: &[&str] = &["switch_name", "port_group_name"];
const KEYS: &[&str] = &["allow_promiscuous", "allow_mac_address_change", "allow_forged_transmits"];

pub struct DvpgSecurityPolicyControl;

fn apply_flags(policy: &mut PortGroupSecurityPolicy, wanted: &Map<String, Value>) -> Result<(), ControlError> {
    for key in KEYS {
        let Some(value) = wanted.get(*key) else {
            continue;
        };
        let flag = value
            .as_bool()
            .ok_or_else(|| ControlError::invalid(format!("{key} must be a boolean")))?;
        match *key {
            "allow_promiscuous" => policy.allow_promiscuous = flag,
            "allow_mac_address_change" => policy.allow_mac_address_change = flag,
            _ => policy.allow_forged_transmits = flag,
        }
    }
    Ok(())
}

impl Controller for DvpgSecurityPolicyControl {
    fn name(&self) -> &'static str {
        "dvpg_security_policy"
    }

    fn product(&self) -> &'static str {
        VCENTER
    }

    fn description(&self) -> &'static str {
        "Promiscuous mode, MAC changes and forged transmits on distributed port groups"
    }

    fn prepare_desired(&self, desired: &Value) -> Result<Value, ControlError> {
        DesiredStateResolver::new(desired, IDENTITY)?;
        Ok(desired.clone())
    }

    fn fetch(&self, ctx: &ControlContext) -> Result<Value, ControlError> {
        to_value(&ctx.dvs()?.port_group_security_policies()?)
    }

    fn compare(&self, current: &Value, desired: &Value) -> Result<Option<(Value, Value)>, ControlError> {
        diff_against_spec(&records(current)?, desired, IDENTITY, KEYS)
    }

    fn apply(&self, ctx: &ControlContext, desired: &Value) -> Result<SetOutcome, ControlError> {
        let dvs = ctx.dvs()?;
        let resolver = DesiredStateResolver::new(desired, IDENTITY)?;
        let comparator = Comparator::new(KEYS).with_identity(IDENTITY);
        let mut outcome = CollectionRemediation::new();

        for policy in dvs.port_group_security_policies()? {
            let current = to_value(&policy)?;
            let Some(object) = current.as_object() else {
                continue;
            };
            let wanted = resolver.resolve_record(object, KEYS);
            let (old, new) = comparator.non_compliant_configs(&current, &Value::Object(wanted.clone()));
            if is_compliant(&old) {
                continue;
            }

            let identity = format!("{}/{}", policy.switch_name, policy.port_group_name);
            let mut next = policy.clone();
            if let Err(e) = apply_flags(&mut next, &wanted) {
                outcome.failed(&identity, e);
                continue;
            }
            match dvs.set_port_group_security_policy(&next) {
                Ok(()) => outcome.succeeded(old, new),
                Err(e) => outcome.failed(&identity, e),
            }
        }

        Ok(outcome.finish())
    }
}
