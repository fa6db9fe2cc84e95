use chrono::Utc;
use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{Identification, IdentificationResult};

const HEADERS: [&str; 9] = [
    "File", "Card", "Set", "Rarity", "Border", "Type", "Mana", "P/T", "Artist",
];

/// Widest a failure note may get before it is cut with an ellipsis.
const MAX_NOTE_WIDTH: usize = 60;

/// Collapse whitespace runs (newlines included) and cap the display width.
fn fit_cell(text: &str, max_width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if UnicodeWidthStr::width(flat.as_str()) <= max_width {
        return flat;
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in flat.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > max_width.saturating_sub(1) {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct BatchSummary {
    pub(crate) total: usize,
    pub(crate) identified: usize,
    pub(crate) failed: usize,
}

pub(crate) fn summarize(results: &[IdentificationResult]) -> BatchSummary {
    let identified = results.iter().filter(|r| r.outcome.card().is_some()).count();
    BatchSummary {
        total: results.len(),
        identified,
        failed: results.len() - identified,
    }
}

pub(crate) fn summary_line(summary: &BatchSummary) -> String {
    format!(
        "Identified {} of {} image(s); {} not identified.",
        summary.identified, summary.total, summary.failed
    )
}

fn row_cells(result: &IdentificationResult) -> Vec<String> {
    match &result.outcome {
        Identification::Identified { card } => vec![
            result.file_name.clone(),
            card.card_name.clone(),
            card.set_code.clone(),
            card.rarity.to_string(),
            card.border_color.to_string(),
            card.type_line.clone(),
            card.mana_cost.clone().unwrap_or_else(|| "-".to_string()),
            card.power_toughness.clone().unwrap_or_else(|| "-".to_string()),
            card.artist.clone(),
        ],
        Identification::NotIdentified { reason } => {
            let note = fit_cell(&format!("not identified ({reason})"), MAX_NOTE_WIDTH);
            let mut cells = vec![result.file_name.clone(), note];
            cells.resize(HEADERS.len(), "-".to_string());
            cells
        }
    }
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(UnicodeWidthStr::width(cell));
    format!("{cell}{}", " ".repeat(fill))
}

fn border(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

fn table_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.iter().zip(widths) {
        line.push(' ');
        line.push_str(&pad(cell, *width));
        line.push_str(" |");
    }
    line
}

/// Render the results as a bordered table sized by terminal display width.
pub(crate) fn render_table(results: &[IdentificationResult]) -> String {
    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = results.iter().map(row_cells).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| UnicodeWidthStr::width(h.as_str())).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    let rule = border(&widths);
    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(rule.clone());
    out.push(table_row(&header, &widths));
    out.push(rule.clone());
    for row in &rows {
        out.push(table_row(row, &widths));
    }
    out.push(rule);
    out.join("\n")
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonReport<'a> {
    pub(crate) generated_at: String,
    pub(crate) source: String,
    #[serde(flatten)]
    pub(crate) summary: BatchSummary,
    pub(crate) results: &'a [IdentificationResult],
}

pub(crate) fn json_report<'a>(source: &str, results: &'a [IdentificationResult]) -> JsonReport<'a> {
    JsonReport {
        generated_at: Utc::now().to_rfc3339(),
        source: source.to_string(),
        summary: summarize(results),
        results,
    }
}
