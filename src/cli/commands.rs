//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::OutputFormat;
use crate::sre::provider::ProviderChoice;
use crate::sre::types::Severity;

#[derive(Parser)]
#[command(
    name = "kubesre",
    version,
    about = "Kubernetes cluster diagnostics, health scoring and remediation planning",
    long_about = None,
)]
pub struct Cli {
    /// Kubernetes context to use
    #[arg(long, global = true, env = "KUBESRE_CONTEXT")]
    pub context: Option<String>,

    /// Namespace to use
    #[arg(short = 'n', long, global = true, env = "KUBESRE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Output format (defaults to the config file's `default_output`)
    #[arg(short = 'o', long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provider overlay: auto, aks, gke or none
    #[arg(long, global = true)]
    pub provider: Option<ProviderChoice>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Diagnose the cluster, a namespace or a single resource
    #[command(alias = "diag")]
    Diagnose(DiagnoseArgs),

    /// Show the cluster health score
    Health,

    /// Diagnose a target and print a remediation plan
    Plan(PlanArgs),

    /// Serve the diagnostics JSON API
    Serve(ServeArgs),

    /// List kubeconfig contexts
    #[command(alias = "ctx")]
    Contexts,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// The whole cluster
    Cluster,

    /// One namespace (defaults to --namespace, then "default")
    #[command(alias = "ns")]
    Namespace { name: Option<String> },

    /// One pod
    #[command(alias = "po")]
    Pod { name: String },

    /// One deployment
    #[command(alias = "deploy")]
    Deployment { name: String },

    /// One node
    #[command(alias = "no")]
    Node { name: String },

    /// Any other kind, diagnosed from `kubectl describe`
    Resource { kind: String, name: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SeverityFilter {
    Critical,
    Warning,
    Info,
}

impl From<SeverityFilter> for Severity {
    fn from(filter: SeverityFilter) -> Self {
        match filter {
            SeverityFilter::Critical => Severity::Critical,
            SeverityFilter::Warning => Severity::Warning,
            SeverityFilter::Info => Severity::Info,
        }
    }
}

#[derive(Args)]
pub struct DiagnoseArgs {
    #[command(subcommand)]
    pub target: Target,

    /// Only show issues at least this severe
    #[arg(short = 's', long, global = true, value_enum)]
    pub severity: Option<SeverityFilter>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(subcommand)]
    pub target: Target,

    /// Plan only for issues at least this severe
    #[arg(short = 's', long, global = true, value_enum)]
    pub severity: Option<SeverityFilter>,

    /// Execute the plan's automated pod-restart steps
    #[arg(long, global = true)]
    pub restart_pods: bool,

    /// Skip confirmation for --restart-pods
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short = 'p', long, default_value = "9090")]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub address: String,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
