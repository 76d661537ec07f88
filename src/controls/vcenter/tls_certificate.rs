use serde_json::{json, Value};

use super::VCENTER;
use crate::controls::to_value;
use crate::domain::controller::Controller;
use crate::domain::error::ControlError;
use crate::domain::types::{SetOutcome, MANUAL_REMEDIATION};
use crate::vendor::ControlContext;

/// Machine SSL certificate issuer. The desired spec lists acceptable issuer
/// DNs; replacing a certificate is never automated.
pub struct TlsCertificateControl;

fn allowed_issuers(desired: &Value) -> Result<Vec<String>, ControlError> {
    match desired {
        Value::String(issuer) => Ok(vec![issuer.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ControlError::invalid("issuer entries must be strings"))
            })
            .collect(),
        _ => Err(ControlError::invalid("expected an issuer DN or a list of issuer DNs")),
    }
}

impl Controller for TlsCertificateControl {
    fn name(&self) -> &'static str {
        "tls_certificate"
    }

    fn product(&self) -> &'static str {
        VCENTER
    }

    fn description(&self) -> &'static str {
        "Machine SSL certificate is issued by an approved CA"
    }

    fn prepare_desired(&self, desired: &Value) -> Result<Value, ControlError> {
        Ok(json!({ "issuer_dn": allowed_issuers(desired)? }))
    }

    fn fetch(&self, ctx: &ControlContext) -> Result<Value, ControlError> {
        to_value(&ctx.appliance()?.tls_certificate()?)
    }

    fn compare(&self, current: &Value, desired: &Value) -> Result<Option<(Value, Value)>, ControlError> {
        let issuer = current.get("issuer_dn").cloned().unwrap_or(Value::Null);
        let allowed = desired.get("issuer_dn").and_then(Value::as_array);
        if allowed.is_some_and(|list| list.contains(&issuer)) {
            return Ok(None);
        }
        Ok(Some((json!({ "issuer_dn": issuer }), desired.clone())))
    }

    fn apply(&self, _ctx: &ControlContext, _desired: &Value) -> Result<SetOutcome, ControlError> {
        Err(ControlError::RemediationUnsupported(MANUAL_REMEDIATION.to_string()))
    }
}
