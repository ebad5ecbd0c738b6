//! Cluster collaborator
//!
//! The diagnostics engine never talks to the API server itself. Everything
//! goes through [`KubeClient`], which the binary backs with `kubectl` and
//! tests back with canned JSON.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SreError};

/// Minimal capability the engine needs from the cluster
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Run a command and return its raw stdout
    async fn run(&self, args: &[&str]) -> Result<String>;

    /// Run a command scoped to `namespace`
    async fn run_with_namespace(&self, namespace: &str, args: &[&str]) -> Result<String> {
        let mut scoped: Vec<&str> = args.to_vec();
        scoped.extend(["-n", namespace]);
        self.run(&scoped).await
    }

    /// Run a command whose output is JSON
    async fn run_json(&self, args: &[&str]) -> Result<Vec<u8>>;
}

/// [`KubeClient`] backed by the `kubectl` binary
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: String,
    context: Option<String>,
    timeout: Duration,
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new("kubectl", None, Duration::from_secs(30))
    }
}

impl KubectlClient {
    pub fn new(binary: impl Into<String>, context: Option<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            context,
            timeout,
        }
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    async fn exec(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.binary);
        if let Some(ctx) = &self.context {
            cmd.arg("--context").arg(ctx);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("exec: {} {}", self.binary, args.join(" "));

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| SreError::Timeout(format!("{} {}", self.binary, args.join(" "))))?
            .map_err(|e| SreError::command(args, format!("failed to spawn {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if let Some(err) = not_found_error(&stderr) {
                return Err(err);
            }
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(SreError::command(args, message));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl KubeClient for KubectlClient {
    async fn run(&self, args: &[&str]) -> Result<String> {
        let stdout = self.exec(args).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    async fn run_json(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut full: Vec<&str> = args.to_vec();
        if !has_output_flag(args) {
            full.extend(["-o", "json"]);
        }
        self.exec(&full).await
    }
}

fn has_output_flag(args: &[&str]) -> bool {
    args.iter()
        .any(|a| *a == "-o" || *a == "--output" || a.starts_with("-o=") || a.starts_with("--output="))
}

/// Map kubectl's `Error from server (NotFound): pods "x" not found`
fn not_found_error(stderr: &str) -> Option<SreError> {
    if !stderr.contains("(NotFound)") {
        return None;
    }
    let rest = stderr.split("(NotFound):").nth(1)?.trim();
    let mut parts = rest.splitn(2, ' ');
    let kind = parts.next()?.to_string();
    let name = parts
        .next()
        .and_then(|s| s.split('"').nth(1))
        .unwrap_or_default()
        .to_string();
    Some(SreError::NotFound { kind, name })
}

/// Check `context` exists in the local kubeconfig, or resolve the current one
pub fn resolve_context(context: Option<&str>) -> Result<String> {
    let kubeconfig = kube::config::Kubeconfig::read()
        .map_err(|e| SreError::Config(format!("Failed to read kubeconfig: {e}")))?;

    match context {
        Some(name) => {
            if kubeconfig.contexts.iter().any(|c| c.name == name) {
                Ok(name.to_string())
            } else {
                Err(SreError::ContextNotFound(name.to_string()))
            }
        }
        None => kubeconfig.current_context.ok_or(SreError::NoContext),
    }
}

/// Get all available contexts from kubeconfig
pub fn list_contexts() -> Result<Vec<ContextInfo>> {
    let kubeconfig = kube::config::Kubeconfig::read()
        .map_err(|e| SreError::Config(format!("Failed to read kubeconfig: {e}")))?;

    let current = kubeconfig.current_context.as_deref();

    let contexts = kubeconfig
        .contexts
        .iter()
        .map(|ctx| ContextInfo {
            name: ctx.name.clone(),
            cluster: ctx.context.as_ref().map(|c| c.cluster.clone()),
            namespace: ctx.context.as_ref().and_then(|c| c.namespace.clone()),
            is_current: current == Some(ctx.name.as_str()),
        })
        .collect();

    Ok(contexts)
}

/// Context information
#[derive(Debug, Clone)]
pub struct ContextInfo {
    pub name: String,
    pub cluster: Option<String>,
    pub namespace: Option<String>,
    pub is_current: bool,
}
