//! Context listing command

use crate::client::{list_contexts, ContextInfo};
use crate::config::OutputFormat;
use crate::error::Result;
use owo_colors::{OwoColorize, Stream::Stdout};

/// List kubeconfig contexts, marking the current one
pub fn handle_contexts(output: OutputFormat) -> Result<()> {
    let contexts = list_contexts()?;
    print_contexts(&contexts, output)
}

fn context_json(contexts: &[ContextInfo]) -> Vec<serde_json::Value> {
    contexts
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.name,
                "cluster": c.cluster,
                "namespace": c.namespace,
                "current": c.is_current
            })
        })
        .collect()
}

fn print_contexts(contexts: &[ContextInfo], output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Table | OutputFormat::Markdown => {
            println!(
                "{:2} {:30} {:30} {:20}",
                "",
                "NAME".if_supports_color(Stdout, |t| t.bold()),
                "CLUSTER".if_supports_color(Stdout, |t| t.bold()),
                "NAMESPACE".if_supports_color(Stdout, |t| t.bold())
            );

            for ctx in contexts {
                let cluster = ctx.cluster.as_deref().unwrap_or("");
                let namespace = ctx.namespace.as_deref().unwrap_or("");

                if ctx.is_current {
                    println!(
                        "{:2} {:30} {:30} {:20}",
                        "*".if_supports_color(Stdout, |t| t.green()),
                        ctx.name.if_supports_color(Stdout, |t| t.green()),
                        cluster.if_supports_color(Stdout, |t| t.green()),
                        namespace.if_supports_color(Stdout, |t| t.green())
                    );
                } else {
                    println!("{:2} {:30} {:30} {:20}", "", ctx.name, cluster, namespace);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&context_json(contexts))?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&context_json(contexts))?);
        }
    }

    Ok(())
}
