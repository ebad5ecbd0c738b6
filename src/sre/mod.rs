//! Cluster health diagnostics and remediation planning
//!
//! Raw resource JSON flows through [`status`] extraction and the
//! [`detector`] rule tables into a [`types::DiagnosticReport`]; the
//! [`health`] scorer and the [`remediation`] planner consume the results.

pub mod detector;
pub mod diagnostics;
pub mod events;
pub mod health;
pub mod provider;
pub mod remediation;
pub mod report;
pub mod status;
pub mod types;

pub use diagnostics::{DiagnosticsManager, DiagnosticsOptions};
pub use health::{ClusterHealthSummary, HealthManager, ScoringWeights};
pub use provider::{CloudProvider, ProviderChoice};
pub use remediation::{PlanContext, RemediationPlanner, RemediationRegistry, SrePlan};
pub use types::{DiagnosticReport, Issue, IssueCategory, Severity};
