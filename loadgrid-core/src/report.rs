//! Text and JSON output of a rendered matrix
//!
//! Global invariants enforced:
//! - Row order is the view's order; nothing is re-sorted here
//! - Identical views yield byte-for-byte identical output

use crate::color::ColorRamp;
use crate::view::MatrixView;

const TEAM_WIDTH: usize = 12;
const NAME_WIDTH: usize = 14;
const FIRSTNAME_WIDTH: usize = 12;
const SUBJECT_WIDTH: usize = 16;
const TYPE_WIDTH: usize = 10;
const COMMENT_WIDTH: usize = 16;
const MONTH_WIDTH: usize = 7;

/// Width of the descriptive columns, separators included
const LABEL_WIDTH: usize =
    TEAM_WIDTH + NAME_WIDTH + FIRSTNAME_WIDTH + SUBJECT_WIDTH + TYPE_WIDTH + COMMENT_WIDTH + 5;

/// Render the matrix as a fixed-width table
///
/// Loads are printed as numbers; when a ramp is given its breakpoints are
/// listed as a legend below the totals.
pub fn render_text(view: &MatrixView, ramp: Option<&ColorRamp>) -> String {
    let mut output = String::new();

    // Header
    output.push_str(&format!(
        "{} {} {} {} {} {}",
        truncate_or_pad("TEAM", TEAM_WIDTH),
        truncate_or_pad("NAME", NAME_WIDTH),
        truncate_or_pad("FIRSTNAME", FIRSTNAME_WIDTH),
        truncate_or_pad("SUBJECT", SUBJECT_WIDTH),
        truncate_or_pad("TYPE", TYPE_WIDTH),
        truncate_or_pad("COMMENT", COMMENT_WIDTH),
    ));
    for month in &view.months {
        output.push_str(&format!(" {:>width$}", month.to_display_string(), width = MONTH_WIDTH));
    }
    output.push('\n');

    // Rows
    for row in &view.rows {
        output.push_str(&format!(
            "{} {} {} {} {} {}",
            truncate_or_pad(&row.team, TEAM_WIDTH),
            truncate_or_pad(&row.name, NAME_WIDTH),
            truncate_or_pad(&row.firstname, FIRSTNAME_WIDTH),
            truncate_or_pad(&row.subject, SUBJECT_WIDTH),
            truncate_or_pad(&row.subject_type, TYPE_WIDTH),
            truncate_or_pad(&row.comment, COMMENT_WIDTH),
        ));
        push_loads(&mut output, view.months.iter().map(|m| row.load(*m)));
    }

    // Totals
    output.push('\n');
    for (person, sums) in &view.totals.per_person {
        output.push_str(&truncate_or_pad(&format!("Total for {}", person), LABEL_WIDTH));
        push_loads(&mut output, sums.iter().copied());
    }
    output.push_str(&truncate_or_pad("Total", LABEL_WIDTH));
    push_loads(&mut output, view.totals.overall.iter().copied());

    if let Some(ramp) = ramp {
        let legend = ramp
            .breakpoints()
            .iter()
            .map(|bp| format!("{}={}", bp.load, bp.color))
            .collect::<Vec<_>>()
            .join("  ");
        output.push_str(&format!("\nLegend: {}", legend));
        if let Some(cap) = ramp.saturation_cap() {
            output.push_str(&format!("  (saturates at {})", cap));
        }
        output.push('\n');
    }

    output
}

fn push_loads(output: &mut String, loads: impl Iterator<Item = i64>) {
    for load in loads {
        output.push_str(&format!(" {:>width$}", load, width = MONTH_WIDTH));
    }
    output.push('\n');
}

/// Render the matrix as JSON output
pub fn render_json(view: &MatrixView) -> String {
    serde_json::to_string_pretty(view).unwrap_or_else(|_| "{}".to_string())
}

/// Truncate or pad string to fixed width, counting characters
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}
