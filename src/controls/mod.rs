//! Per-setting controllers and the registry that maps document entries to
//! them.

pub mod vcenter;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::comparator::is_compliant;
use crate::domain::controller::ControlRegistry;
use crate::domain::error::ControlError;

/// Every controller this binary ships with.
pub fn registry() -> ControlRegistry {
    let mut registry = ControlRegistry::new();
    registry.register(Box::new(vcenter::ntp::NtpControl));
    registry.register(Box::new(vcenter::dns::DnsControl));
    registry.register(Box::new(vcenter::syslog::SyslogControl));
    registry.register(Box::new(vcenter::ssh::SshControl));
    registry.register(Box::new(vcenter::proxy::ProxyControl));
    registry.register(Box::new(vcenter::login_banner::LoginBannerControl));
    registry.register(Box::new(vcenter::tls_certificate::TlsCertificateControl));
    registry.register(Box::new(vcenter::dvpg_security_policy::DvpgSecurityPolicyControl));
    registry.register(Box::new(vcenter::dvs_mtu::DvsMtuControl));
    registry
}

pub(crate) fn to_value<T: Serialize>(value: &T) -> Result<Value, ControlError> {
    serde_json::to_value(value).map_err(|e| ControlError::RetrievalFailed(e.to_string()))
}

pub(crate) fn parse_desired<T: DeserializeOwned>(desired: &Value) -> Result<T, ControlError> {
    serde_json::from_value(desired.clone()).map_err(|e| ControlError::invalid(e.to_string()))
}

/// Turn comparator output into the `compare` return shape.
pub(crate) fn into_drift((current, desired): (Value, Value)) -> Option<(Value, Value)> {
    if is_compliant(&current) {
        None
    } else {
        Some((current, desired))
    }
}

/// View a list of current-state records as maps.
pub(crate) fn records(current: &Value) -> Result<Vec<Map<String, Value>>, ControlError> {
    let items = current
        .as_array()
        .ok_or_else(|| ControlError::RetrievalFailed("expected a list of records".to_string()))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .cloned()
                .ok_or_else(|| ControlError::RetrievalFailed("expected a record".to_string()))
        })
        .collect()
}
