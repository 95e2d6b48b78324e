//! Operation planner: turns a target list into execution tasks.
//!
//! The planner resolves every argument vector up front, including the legacy
//! timestamp form, but leaves the decision to use the fallback to the batch
//! executor since that depends on the first attempt's result.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::domain::operation::{CertificateRef, Operation};
use crate::domain::types::{PfxPassword, TargetPath, TimestampUrl};
use crate::infra::error::{SignError, SignResult};

/// One unit of work: a target plus fully resolved signtool argument vectors.
///
/// Immutable once planned and consumed exactly once by the executor.
#[derive(Debug, Clone)]
pub struct ExecutionTask {
    /// Submission order within the batch.
    pub index: usize,
    pub target: TargetPath,
    pub operation: Operation,
    /// PFX path whose password must be resolved before invocation.
    pub credential_for: Option<PathBuf>,
    base_args: Vec<OsString>,
    primary_tail: Vec<OsString>,
    fallback_tail: Option<Vec<OsString>>,
}

impl ExecutionTask {
    /// Argument vector for the first attempt.
    ///
    /// The password, when present and non-empty, is spliced in as a `/p`
    /// pair at invocation time so it never sits inside the stored plan.
    #[must_use]
    pub fn primary_args(&self, password: Option<&PfxPassword>) -> Vec<OsString> {
        self.compose(&self.primary_tail, password)
    }

    /// Argument vector for the legacy-timestamp fallback attempt, if this
    /// task has one.
    #[must_use]
    pub fn fallback_args(&self, password: Option<&PfxPassword>) -> Option<Vec<OsString>> {
        self.fallback_tail
            .as_ref()
            .map(|tail| self.compose(tail, password))
    }

    #[must_use]
    pub fn has_fallback(&self) -> bool {
        self.fallback_tail.is_some()
    }

    fn compose(&self, tail: &[OsString], password: Option<&PfxPassword>) -> Vec<OsString> {
        let mut args = self.base_args.clone();
        if let Some(pwd) = password {
            if !pwd.is_empty() {
                args.push(OsString::from("/p"));
                args.push(OsString::from(pwd.as_str()));
            }
        }
        args.extend(tail.iter().cloned());
        args
    }
}

/// Build the ordered task list for one batch run.
///
/// An empty target list yields an empty plan. Operations that need a
/// credential fail fast with `ConfigurationError` when no certificate is
/// configured, before anything is dispatched.
pub fn plan(
    targets: &[TargetPath],
    operation: Operation,
    cert_ref: Option<&CertificateRef>,
    ts_servers: &[TimestampUrl],
) -> SignResult<Vec<ExecutionTask>> {
    if operation.needs_certificate() && cert_ref.is_none() {
        return Err(SignError::ConfigurationError(format!(
            "Operation '{}' requires a certificate but none is configured",
            operation.as_str()
        )));
    }
    if operation.uses_timestamp_server() && ts_servers.is_empty() {
        return Err(SignError::ConfigurationError(format!(
            "Operation '{}' requires at least one timestamp server",
            operation.as_str()
        )));
    }

    // First server is the primary; the next one (when configured) backs the
    // legacy retry so a dead primary is not asked twice.
    let primary_url = ts_servers.first();
    let fallback_url = ts_servers.get(1).or(primary_url);

    let pfx_path = cert_ref.map(|c| c.pfx_path().clone());

    let tasks = targets
        .iter()
        .enumerate()
        .map(|(index, target)| {
            let target_arg = OsString::from(target.as_path());
            let (base_args, primary_tail, fallback_tail, credential_for) = match operation {
                Operation::Verify => (
                    vec!["verify".into(), "/pa".into(), "/v".into()],
                    vec![target_arg],
                    None,
                    None,
                ),
                Operation::SignOnly => (
                    sign_base(pfx_path.as_ref().unwrap()),
                    vec![target_arg],
                    None,
                    pfx_path.clone(),
                ),
                Operation::SignAndTimestamp => (
                    sign_base(pfx_path.as_ref().unwrap()),
                    rfc3161_tail(primary_url.unwrap(), &target_arg),
                    Some(legacy_tail(fallback_url.unwrap(), &target_arg)),
                    pfx_path.clone(),
                ),
                Operation::TimestampOnly => (
                    vec!["timestamp".into()],
                    rfc3161_tail(primary_url.unwrap(), &target_arg),
                    Some(legacy_tail(fallback_url.unwrap(), &target_arg)),
                    None,
                ),
            };
            ExecutionTask {
                index,
                target: target.clone(),
                operation,
                credential_for,
                base_args,
                primary_tail,
                fallback_tail,
            }
        })
        .collect();

    Ok(tasks)
}

fn sign_base(pfx: &PathBuf) -> Vec<OsString> {
    vec![
        "sign".into(),
        "/f".into(),
        pfx.clone().into_os_string(),
        "/fd".into(),
        "sha256".into(),
        "/v".into(),
    ]
}

/// RFC 3161 request: `/tr <url> /td sha256 <file>`.
fn rfc3161_tail(url: &TimestampUrl, target: &OsString) -> Vec<OsString> {
    vec![
        "/tr".into(),
        url.as_str().into(),
        "/td".into(),
        "sha256".into(),
        target.clone(),
    ]
}

/// Legacy request: `/t <url> <file>`.
fn legacy_tail(url: &TimestampUrl, target: &OsString) -> Vec<OsString> {
    vec!["/t".into(), url.as_str().into(), target.clone()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> Vec<TargetPath> {
        names.iter().map(|n| TargetPath::new(*n).unwrap()).collect()
    }

    fn servers(urls: &[&str]) -> Vec<TimestampUrl> {
        urls.iter().map(|u| TimestampUrl::new(*u).unwrap()).collect()
    }

    #[test]
    fn test_empty_target_list_yields_empty_plan() {
        let plan = plan(&[], Operation::Verify, None, &[]).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_sign_without_certificate_fails_fast() {
        let result = plan(&targets(&["a.exe"]), Operation::SignOnly, None, &[]);
        match result {
            Err(SignError::ConfigurationError(msg)) => assert!(msg.contains("certificate")),
            other => panic!("Expected ConfigurationError, got {other:?}"),
        }
    }

    #[test]
    fn test_timestamp_without_servers_fails_fast() {
        let result = plan(&targets(&["a.exe"]), Operation::TimestampOnly, None, &[]);
        assert!(matches!(result, Err(SignError::ConfigurationError(_))));
    }

    #[test]
    fn test_verify_arguments() {
        let plan = plan(&targets(&["my app.exe"]), Operation::Verify, None, &[]).unwrap();
        assert_eq!(plan.len(), 1);
        let args = plan[0].primary_args(None);
        assert_eq!(args[0], "verify");
        assert_eq!(args[1], "/pa");
        assert_eq!(args[2], "/v");
        assert_eq!(args[3], "my app.exe");
        assert!(!plan[0].has_fallback());
        assert!(plan[0].credential_for.is_none());
    }

    #[test]
    fn test_sign_and_timestamp_has_rfc3161_primary_and_legacy_fallback() {
        let cert = CertificateRef::ExistingPfx("/keys/dev.pfx".into());
        let srv = servers(&["http://ts.one.example", "http://ts.two.example"]);
        let plan = plan(
            &targets(&["app.exe"]),
            Operation::SignAndTimestamp,
            Some(&cert),
            &srv,
        )
        .unwrap();

        let task = &plan[0];
        assert_eq!(task.credential_for.as_deref(), Some(std::path::Path::new("/keys/dev.pfx")));

        let pwd = PfxPassword::new("s3cret");
        let primary = task.primary_args(Some(&pwd));
        let rendered: Vec<String> = primary
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "sign", "/f", "/keys/dev.pfx", "/fd", "sha256", "/v", "/p", "s3cret", "/tr",
                "http://ts.one.example", "/td", "sha256", "app.exe"
            ]
        );

        let fallback = task.fallback_args(Some(&pwd)).unwrap();
        let rendered: Vec<String> = fallback
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "sign", "/f", "/keys/dev.pfx", "/fd", "sha256", "/v", "/p", "s3cret", "/t",
                "http://ts.two.example", "app.exe"
            ]
        );
    }

    #[test]
    fn test_single_server_backs_its_own_fallback() {
        let srv = servers(&["http://ts.one.example"]);
        let plan = plan(&targets(&["app.exe"]), Operation::TimestampOnly, None, &srv).unwrap();
        let fallback = plan[0].fallback_args(None).unwrap();
        let rendered: Vec<String> = fallback
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            rendered,
            vec!["timestamp", "/t", "http://ts.one.example", "app.exe"]
        );
    }

    #[test]
    fn test_empty_password_is_omitted() {
        let cert = CertificateRef::ExistingPfx("/keys/dev.pfx".into());
        let plan = plan(&targets(&["app.exe"]), Operation::SignOnly, Some(&cert), &[]).unwrap();
        let pwd = PfxPassword::new("");
        let args = plan[0].primary_args(Some(&pwd));
        assert!(!args.iter().any(|a| a == "/p"));
    }

    #[test]
    fn test_submission_indices_are_ordered() {
        let plan = plan(
            &targets(&["a.exe", "b.dll", "c.msi"]),
            Operation::Verify,
            None,
            &[],
        )
        .unwrap();
        let indices: Vec<usize> = plan.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
