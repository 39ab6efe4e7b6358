use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::AwsError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One AWS API call returning the decoded JSON response.
#[async_trait]
pub trait AwsCall: Send + Sync + 'static {
    async fn call(
        &self,
        service: &'static str,
        operation: &'static str,
        args: &[String],
    ) -> Result<Value, AwsError>;
}

/// Runs calls through the `aws` executable.
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: String,
    region: Option<String>,
    profile: Option<String>,
    timeout: Duration,
}

impl AwsCli {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            program: "aws".to_string(),
            region: Some(region.into()),
            profile: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use another executable (e.g. a wrapper script or `awslocal`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn argv(&self, service: &str, operation: &str, args: &[String]) -> Vec<String> {
        let mut argv = Vec::with_capacity(args.len() + 8);
        argv.push(service.to_string());
        argv.push(operation.to_string());
        argv.extend(args.iter().cloned());
        if let Some(region) = &self.region {
            argv.extend(["--region".to_string(), region.clone()]);
        }
        if let Some(profile) = &self.profile {
            argv.extend(["--profile".to_string(), profile.clone()]);
        }
        argv.extend(["--output".to_string(), "json".to_string()]);
        argv
    }
}

#[async_trait]
impl AwsCall for AwsCli {
    async fn call(
        &self,
        service: &'static str,
        operation: &'static str,
        args: &[String],
    ) -> Result<Value, AwsError> {
        let argv = self.argv(service, operation, args);
        trace!(program = %self.program, ?argv, "spawn");

        let mut cmd = Command::new(&self.program);
        cmd.args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| AwsError::TimedOut {
                service,
                operation,
                timeout: self.timeout,
            })?
            .map_err(|e| AwsError::Spawn(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(service, operation, code = ?output.status.code(), %stderr, "aws call failed");
            return Err(AwsError::Failed {
                service,
                operation,
                code: output.status.code(),
                stderr,
            });
        }

        decode_output(service, operation, &output.stdout)
    }
}

/// Empty output (e.g. from `update-service --query`) decodes to `null`.
pub(crate) fn decode_output(
    service: &'static str,
    operation: &'static str,
    stdout: &[u8],
) -> Result<Value, AwsError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(stdout).map_err(|e| AwsError::decode(service, operation, e.to_string()))
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::{
        collections::VecDeque,
        sync::{Mutex, PoisonError},
    };

    use super::*;

    /// Replays canned responses in order and records each call.
    #[derive(Default)]
    pub struct ScriptedCli {
        responses: Mutex<VecDeque<Result<Value, AwsError>>>,
        calls: Mutex<Vec<(String, String, Vec<String>)>>,
    }

    impl ScriptedCli {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, value: Value) -> Self {
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(Ok(value));
            self
        }

        pub fn fail(self, err: AwsError) -> Self {
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(Err(err));
            self
        }

        pub fn calls(&self) -> Vec<(String, String, Vec<String>)> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl AwsCall for ScriptedCli {
        async fn call(
            &self,
            service: &'static str,
            operation: &'static str,
            args: &[String],
        ) -> Result<Value, AwsError> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((service.to_string(), operation.to_string(), args.to_vec()));
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| Err(AwsError::decode(service, operation, "no scripted response")))
        }
    }
}
