//! Appliance proxy, one record per protocol.
//!
//! The desired spec is override-capable on `protocol`, e.g. a global
//! "disabled" default with an override enabling `https` only.

use serde_json::{json, Map, Value};

use super::VCENTER;
use crate::controls::records;
use crate::domain::comparator::{diff_against_spec, is_compliant, Comparator};
use crate::domain::controller::{CollectionRemediation, Controller};
use crate::domain::desired_state::DesiredStateResolver;
use crate::domain::error::ControlError;
use crate::domain::types::SetOutcome;
use crate::vendor::appliance::{ProxyProtocol, ProxySettings};
use crate::vendor::ControlContext;

const IDENTITY: &[&str] = &["protocol"];
const KEYS: &[&str] = &["enabled", "server", "port", "username"];

pub struct ProxyControl;

fn to_record(protocol: ProxyProtocol, settings: &ProxySettings) -> Value {
    json!({
        "protocol": protocol.as_str(),
        "enabled": settings.enabled,
        "server": settings.server,
        "port": settings.port,
        // Unset username reads back as absent; compare it as "".
        "username": settings.username.clone().unwrap_or_default(),
    })
}

/// Overlay resolved desired fields onto the current settings.
fn merge(current: &ProxySettings, desired: &Map<String, Value>) -> Result<ProxySettings, ControlError> {
    let mut next = current.clone();
    if let Some(v) = desired.get("enabled") {
        next.enabled = v
            .as_bool()
            .ok_or_else(|| ControlError::invalid("proxy enabled must be a boolean"))?;
    }
    if let Some(v) = desired.get("server") {
        next.server = v
            .as_str()
            .ok_or_else(|| ControlError::invalid("proxy server must be a string"))?
            .to_string();
    }
    if let Some(v) = desired.get("port") {
        next.port = v
            .as_i64()
            .ok_or_else(|| ControlError::invalid("proxy port must be an integer"))?;
    }
    if let Some(v) = desired.get("username") {
        let username = v
            .as_str()
            .ok_or_else(|| ControlError::invalid("proxy username must be a string"))?;
        next.username = (!username.is_empty()).then(|| username.to_string());
    }
    next.password = desired.get("password").and_then(Value::as_str).map(str::to_string);
    Ok(next)
}

impl Controller for ProxyControl {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn product(&self) -> &'static str {
        VCENTER
    }

    fn description(&self) -> &'static str {
        "HTTP, HTTPS and FTP proxy configuration"
    }

    fn prepare_desired(&self, desired: &Value) -> Result<Value, ControlError> {
        let resolver = DesiredStateResolver::new(desired, IDENTITY)?;
        for protocol in ProxyProtocol::ALL {
            let mut identity = Map::new();
            identity.insert("protocol".to_string(), json!(protocol.as_str()));
            merge(&ProxySettings::default(), &resolver.resolve_record(&identity, KEYS))?;
        }
        Ok(desired.clone())
    }

    fn fetch(&self, ctx: &ControlContext) -> Result<Value, ControlError> {
        let (current, errors) = self.get(ctx);
        if errors.is_empty() {
            Ok(current)
        } else {
            Err(ControlError::RetrievalFailed(errors.join("; ")))
        }
    }

    /// Reads every protocol; one failing protocol doesn't hide the others.
    fn get(&self, ctx: &ControlContext) -> (Value, Vec<String>) {
        let appliance = match ctx.appliance() {
            Ok(appliance) => appliance,
            Err(e) => return (Value::Null, vec![e.to_string()]),
        };
        let mut current = Vec::new();
        let mut errors = Vec::new();
        for protocol in ProxyProtocol::ALL {
            match appliance.proxy(protocol) {
                Ok(settings) => current.push(to_record(protocol, &settings)),
                Err(e) => errors.push(format!("{protocol}: {e}")),
            }
        }
        (Value::Array(current), errors)
    }

    fn compare(&self, current: &Value, desired: &Value) -> Result<Option<(Value, Value)>, ControlError> {
        diff_against_spec(&records(current)?, desired, IDENTITY, KEYS)
    }

    fn apply(&self, ctx: &ControlContext, desired: &Value) -> Result<SetOutcome, ControlError> {
        let appliance = ctx.appliance()?;
        let resolver = DesiredStateResolver::new(desired, IDENTITY)?;
        let comparator = Comparator::new(KEYS).with_identity(IDENTITY);
        let mut outcome = CollectionRemediation::new();

        for protocol in ProxyProtocol::ALL {
            let current = match appliance.proxy(protocol) {
                Ok(settings) => settings,
                Err(e) => {
                    outcome.failed(protocol.as_str(), e);
                    continue;
                }
            };
            let record = to_record(protocol, &current);
            let Some(object) = record.as_object() else {
                continue;
            };
            let mut wanted = resolver.resolve_record(object, KEYS);
            let (old, new) = comparator.non_compliant_configs(&record, &Value::Object(wanted.clone()));
            if is_compliant(&old) {
                continue;
            }

            if let Some(password) = resolver.resolve(object, "password") {
                wanted.insert("password".to_string(), password.clone());
            }
            let next = merge(&current, &wanted)?;
            let result = if !next.enabled && next.server.is_empty() {
                appliance.clear_proxy(protocol)
            } else {
                appliance.set_proxy(protocol, &next)
            };
            match result {
                Ok(()) => outcome.succeeded(old, new),
                Err(e) => outcome.failed(protocol.as_str(), e),
            }
        }

        Ok(outcome.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::*;
    use crate::vendor::testing::FakeAppliance;
    use std::sync::Arc;

    fn spec() -> Value {
        json!({
            "__GLOBAL__": { "enabled": false, "server": "", "port": -1 },
            "__OVERRIDES__": [{
                "protocol": "https",
                "enabled": true,
                "server": "proxy.corp",
                "port": 3128,
                "username": "svc",
                "password": "s3cret"
            }]
        })
    }

    fn unset() -> ProxySettings {
        ProxySettings {
            port: -1,
            ..ProxySettings::default()
        }
    }

    fn setup() -> (Arc<FakeAppliance>, ControlContext) {
        let appliance = Arc::new(FakeAppliance::default());
        {
            let mut state = appliance.state.lock().unwrap();
            for protocol in ProxyProtocol::ALL {
                state.proxies.insert(protocol, unset());
            }
        }
        let ctx = ControlContext::default().with_appliance(appliance.clone());
        (appliance, ctx)
    }

    #[test]
    fn only_the_overridden_protocol_drifts() {
        let (_, ctx) = setup();
        let result = ProxyControl.check_compliance(&ctx, &spec());
        assert_eq!(result.status, ComplianceStatus::NonCompliant);
        let current = result.current.unwrap();
        let drifted = current.as_array().unwrap();
        assert_eq!(drifted.len(), 1);
        assert_eq!(drifted[0]["protocol"], json!("https"));
        assert_eq!(drifted[0]["server"], json!(""));
        assert!(result.desired.unwrap()[0].get("password").is_none());
    }

    #[test]
    fn remediation_sets_https_and_passes_password() {
        let (appliance, ctx) = setup();
        let result = ProxyControl.remediate(&ctx, &spec());
        assert_eq!(result.status, RemediateStatus::Success);

        let https = appliance.snapshot().proxies[&ProxyProtocol::Https].clone();
        assert!(https.enabled);
        assert_eq!(https.server, "proxy.corp");
        assert_eq!(https.username.as_deref(), Some("svc"));

        let again = ProxyControl.check_compliance(&ctx, &spec());
        assert_eq!(again.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn one_rejected_protocol_is_partial() {
        let (appliance, ctx) = setup();
        appliance
            .state
            .lock()
            .unwrap()
            .proxies
            .insert(ProxyProtocol::Ftp, ProxySettings {
                server: "old.corp".into(),
                port: 21,
                enabled: true,
                ..ProxySettings::default()
            });
        appliance.fail_on("set_proxy:https");

        let result = ProxyControl.remediate(&ctx, &spec());
        assert_eq!(result.status, RemediateStatus::Partial);
        assert_eq!(result.errors, vec!["https: set_proxy:https unavailable".to_string()]);
        assert_eq!(result.old.unwrap()[0]["protocol"], json!("ftp"));
        assert!(!appliance.snapshot().proxies.contains_key(&ProxyProtocol::Ftp));
    }

    #[test]
    fn read_failure_names_the_protocol() {
        let (appliance, ctx) = setup();
        appliance.fail_on("proxy");
        let result = ProxyControl.check_compliance(&ctx, &spec());
        assert_eq!(result.status, ComplianceStatus::Failed);
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors[0].starts_with("http: "));
    }

    #[test]
    fn plain_mapping_applies_to_all_protocols() {
        let (_, ctx) = setup();
        let result = ProxyControl.check_compliance(&ctx, &json!({ "enabled": false, "server": "" }));
        assert_eq!(result.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn wrong_type_is_invalid() {
        let (_, ctx) = setup();
        let result = ProxyControl.check_compliance(&ctx, &json!({ "port": "3128" }));
        assert_eq!(result.status, ComplianceStatus::Failed);
        assert!(result.errors[0].contains("port must be an integer"));
    }
}
