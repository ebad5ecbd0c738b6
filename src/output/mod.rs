//! Output formatting for kubesre

use owo_colors::{OwoColorize, Stream::Stdout, Style};
use serde::Serialize;

use crate::sre::health::HealthStatus;
use crate::sre::remediation::Risk;
use crate::sre::types::Severity;

/// Format raw headers and rows as a table
pub fn format_table_raw(headers: &[&str], rows: &[Vec<String>]) -> String {
    // Calculate column widths
    let num_cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < num_cols {
                widths[i] = widths[i].max(strip_ansi_codes(cell).chars().count());
            }
        }
    }

    let mut output = String::new();

    let mut header_line = String::new();
    for (i, header) in headers.iter().enumerate() {
        let padding = widths[i].saturating_sub(header.len());
        header_line.push_str(header);
        header_line.push_str(&" ".repeat(padding + 2));
    }
    let header = header_line.trim_end();
    output.push_str(&header.if_supports_color(Stdout, |t| t.bold()).to_string());
    output.push('\n');

    for row in rows {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i < num_cols {
                let stripped_len = strip_ansi_codes(cell).chars().count();
                let padding = widths[i].saturating_sub(stripped_len);
                line.push_str(cell);
                line.push_str(&" ".repeat(padding + 2));
            }
        }
        output.push_str(line.trim_end());
        output.push('\n');
    }

    output.trim_end().to_string()
}

/// Strip ANSI escape codes for length calculation
pub fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::new();
    let mut in_escape = false;

    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape {
            if c == 'm' {
                in_escape = false;
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Shorten to `max` characters, marking the cut with "..."
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Paint `label` unless stdout is not a color terminal or `--no-color` was given
fn paint(label: String, style: Style) -> String {
    label.if_supports_color(Stdout, |t| t.style(style)).to_string()
}

pub fn colorize_severity(severity: Severity) -> String {
    let style = match severity {
        Severity::Critical => Style::new().red().bold(),
        Severity::Warning => Style::new().yellow(),
        Severity::Info => Style::new().blue(),
    };
    paint(severity.to_string(), style)
}

pub fn colorize_health(status: HealthStatus) -> String {
    let style = match status {
        HealthStatus::Healthy => Style::new().green(),
        HealthStatus::Degraded => Style::new().yellow(),
        HealthStatus::Critical => Style::new().red().bold(),
    };
    paint(status.to_string(), style)
}

pub fn colorize_risk(risk: Risk) -> String {
    let style = match risk {
        Risk::Low => Style::new().green(),
        Risk::Medium => Style::new().yellow(),
        Risk::High => Style::new().red(),
    };
    paint(risk.to_string(), style)
}

/// Format a value as JSON
pub fn format_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

/// Format a value as YAML
pub fn format_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(value)
}
