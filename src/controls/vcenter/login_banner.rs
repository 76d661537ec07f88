use std::path::Path;

use serde_json::{json, Value};

use super::VCENTER;
use crate::controls::into_drift;
use crate::domain::comparator::get_non_compliant_configs;
use crate::domain::controller::Controller;
use crate::domain::error::ControlError;
use crate::domain::types::SetOutcome;
use crate::vendor::ControlContext;

const ISSUE_FILE: &str = "/etc/issue";

pub struct LoginBannerControl;

/// Expand `\n`, `\t` and `\\` as written in YAML plain scalars.
fn expand_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

impl Controller for LoginBannerControl {
    fn name(&self) -> &'static str {
        "login_banner"
    }

    fn product(&self) -> &'static str {
        VCENTER
    }

    fn description(&self) -> &'static str {
        "Pre-login banner in /etc/issue"
    }

    fn prepare_desired(&self, desired: &Value) -> Result<Value, ControlError> {
        let banner = desired
            .as_str()
            .ok_or_else(|| ControlError::invalid("login banner must be a string"))?;
        Ok(json!({ "banner": expand_escapes(banner).trim_end() }))
    }

    fn fetch(&self, ctx: &ControlContext) -> Result<Value, ControlError> {
        let content = ctx.shell()?.run("cat", &[ISSUE_FILE])?;
        Ok(json!({ "banner": content.trim_end() }))
    }

    fn compare(&self, current: &Value, desired: &Value) -> Result<Option<(Value, Value)>, ControlError> {
        Ok(into_drift(get_non_compliant_configs(current, desired, &["banner"])))
    }

    fn apply(&self, ctx: &ControlContext, desired: &Value) -> Result<SetOutcome, ControlError> {
        let banner = desired
            .get("banner")
            .and_then(Value::as_str)
            .ok_or_else(|| ControlError::invalid("login banner must be a string"))?;
        ctx.shell()?
            .write_file(Path::new(ISSUE_FILE), &format!("{banner}\n"))?;
        Ok(SetOutcome::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::*;
    use crate::vendor::testing::FakeShell;
    use std::sync::Arc;

    #[test]
    fn escapes_are_expanded() {
        assert_eq!(expand_escapes(r"Line one\nLine two\tend"), "Line one\nLine two\tend");
        assert_eq!(expand_escapes(r"C:\\path"), r"C:\path");
        assert_eq!(expand_escapes(r"odd \q"), r"odd \q");
    }

    #[test]
    fn trailing_newline_is_not_drift() {
        let shell = Arc::new(FakeShell::with_file(ISSUE_FILE, "Authorized use only\nAll activity is logged\n"));
        let ctx = ControlContext::default().with_shell(shell);
        let result = LoginBannerControl.check_compliance(&ctx, &json!(r"Authorized use only\nAll activity is logged"));
        assert_eq!(result.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn writes_banner_file() {
        let shell = Arc::new(FakeShell::with_file(ISSUE_FILE, "VMware vCenter Server\n"));
        let ctx = ControlContext::default().with_shell(shell.clone());

        let result = LoginBannerControl.remediate(&ctx, &json!(r"Authorized use only\nAll activity is logged"));
        assert_eq!(result.status, RemediateStatus::Success);
        assert_eq!(result.old, Some(json!({ "banner": "VMware vCenter Server" })));
        assert_eq!(
            shell.file(ISSUE_FILE).as_deref(),
            Some("Authorized use only\nAll activity is logged\n")
        );
    }

    #[test]
    fn missing_file_fails_the_check() {
        let ctx = ControlContext::default().with_shell(Arc::new(FakeShell::default()));
        let result = LoginBannerControl.check_compliance(&ctx, &json!("hi"));
        assert_eq!(result.status, ComplianceStatus::Failed);
        assert!(result.errors[0].contains("cat /etc/issue"));
    }

    #[test]
    fn non_string_banner_is_invalid() {
        let ctx = ControlContext::default().with_shell(Arc::new(FakeShell::default()));
        let result = LoginBannerControl.check_compliance(&ctx, &json!({ "text": "hi" }));
        assert_eq!(result.status, ComplianceStatus::Failed);
    }
}
