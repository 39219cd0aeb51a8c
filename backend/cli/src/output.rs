//! Terminal output: plain tables and status notes.

use parley_core::AgentDescriptor;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false)
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("\x1b[31m{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// Left-aligned columns, two spaces apart, dashed rule under the header.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        format!("  {}\n", padded.join("  ").trim_end())
    };

    let mut out = line(headers.to_vec());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line(rule.iter().map(String::as_str).collect()));
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out
}

pub fn peer_table(peers: &[AgentDescriptor]) -> String {
    let rows: Vec<Vec<String>> = peers
        .iter()
        .map(|p| {
            vec![
                p.name().to_string(),
                p.url().to_string(),
                p.version().to_string(),
                if p.capabilities().streaming { "yes" } else { "no" }.to_string(),
                p.description().to_string(),
            ]
        })
        .collect();
    render_table(&["NAME", "URL", "VERSION", "STREAMING", "DESCRIPTION"], &rows)
}
