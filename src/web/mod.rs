//! HTTP API for kubesre
//!
//! Read-only JSON endpoints over the diagnostics engine:
//! - `/api/health` cluster health summary
//! - `/api/diagnose` diagnostic report for a scope
//! - `/api/plan` remediation plan for a scope

pub mod handlers;
pub mod server;

pub use server::{router, start_server};
