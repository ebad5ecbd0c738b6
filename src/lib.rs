//! kubesre - Kubernetes cluster diagnostics, health scoring and remediation planning

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod sre;
pub mod web;
