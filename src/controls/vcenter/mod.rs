pub mod dns;
pub mod dvpg_security_policy;
pub mod dvs_mtu;
pub mod login_banner;
pub mod ntp;
pub mod proxy;
pub mod ssh;
pub mod syslog;
pub mod tls_certificate;

/// Document section for vCenter settings.
pub const VCENTER: &str = "vcenter";
