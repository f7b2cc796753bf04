//! HTML matrix generation
//!
//! Generates a self-contained HTML page with embedded CSS. Every load and
//! total cell is colored from the ramp, with black or white text chosen for
//! contrast.

use crate::color::{CellStyle, ColorRamp, Rgb};
use crate::error::Result;
use crate::view::{MatrixView, SortDirection};

/// Render a matrix view as an HTML page
pub fn render_html_matrix(view: &MatrixView, ramp: &ColorRamp) -> Result<String> {
    let title = match (view.months.first(), view.months.last()) {
        (Some(first), Some(last)) => format!("{} to {}", first, last),
        _ => "empty range".to_string(),
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Loadgrid - {title}</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        <h1>Workload matrix</h1>
        <p class="subtitle">{title}, {rows} lines</p>
        <table class="matrix">
            {head}
            <tbody>
{body}
            </tbody>
            <tfoot>
{totals}
            </tfoot>
        </table>
        {legend}
    </div>
</body>
</html>"#,
        title = html_escape(&title),
        css = inline_css(),
        rows = view.rows.len(),
        head = render_head(view),
        body = render_rows(view, ramp)?,
        totals = render_totals(view, ramp)?,
        legend = render_legend(ramp),
    ))
}

fn render_head(view: &MatrixView) -> String {
    let arrow = match view.sort.direction {
        SortDirection::Ascending => "&#9650;",
        SortDirection::Descending => "&#9660;",
    };
    let columns = [
        ("team", "Team"),
        ("name", "Name"),
        ("firstname", "Firstname"),
        ("subject", "Subject"),
        ("type", "Type"),
    ];

    let mut cells: String = columns
        .iter()
        .map(|(key, label)| {
            if *key == view.sort.key.as_str() {
                format!(r#"<th class="sorted">{} {}</th>"#, label, arrow)
            } else {
                format!("<th>{}</th>", label)
            }
        })
        .collect();
    cells.push_str("<th>Comment</th>");
    for month in &view.months {
        cells.push_str(&format!(r#"<th class="month">{}</th>"#, month));
    }
    format!("<thead><tr>{}</tr></thead>", cells)
}

fn render_rows(view: &MatrixView, ramp: &ColorRamp) -> Result<String> {
    let mut out = String::new();
    for row in &view.rows {
        let swatch = row
            .color_hex
            .as_deref()
            .and_then(|hex| Rgb::from_hex(hex).ok())
            .map(|color| format!(r#"<span class="swatch" style="background:{}"></span>"#, color))
            .unwrap_or_default();

        out.push_str(&format!(
            "                <tr><td>{}</td><td>{}</td><td>{}</td><td>{}{}</td><td>{}</td><td class=\"comment\">{}</td>",
            html_escape(&row.team),
            html_escape(&row.name),
            html_escape(&row.firstname),
            swatch,
            html_escape(&row.subject),
            html_escape(&row.subject_type),
            html_escape(&row.comment),
        ));
        for month in &view.months {
            out.push_str(&load_cell(row.load(*month), ramp)?);
        }
        out.push_str("</tr>\n");
    }
    Ok(out)
}

fn render_totals(view: &MatrixView, ramp: &ColorRamp) -> Result<String> {
    let mut out = String::new();
    for (person, sums) in &view.totals.per_person {
        out.push_str(&format!(
            "                <tr class=\"person-total\"><th colspan=\"6\">Total for {}</th>",
            html_escape(person)
        ));
        for load in sums {
            out.push_str(&load_cell(*load, ramp)?);
        }
        out.push_str("</tr>\n");
    }
    out.push_str("                <tr class=\"overall-total\"><th colspan=\"6\">Total</th>");
    for load in &view.totals.overall {
        out.push_str(&load_cell(*load, ramp)?);
    }
    out.push_str("</tr>\n");
    Ok(out)
}

fn load_cell(load: i64, ramp: &ColorRamp) -> Result<String> {
    let CellStyle {
        background,
        foreground,
    } = ramp.cell_style(load)?;
    Ok(format!(
        r#"<td class="load" style="background:{};color:{}">{}</td>"#,
        background,
        foreground.as_str(),
        load
    ))
}

fn render_legend(ramp: &ColorRamp) -> String {
    let items: String = ramp
        .breakpoints()
        .iter()
        .map(|bp| {
            format!(
                r#"<span class="legend-item"><span class="swatch" style="background:{}"></span>{}</span>"#,
                bp.color, bp.load
            )
        })
        .collect();
    let cap = ramp
        .saturation_cap()
        .map(|cap| format!(r#"<span class="legend-cap">saturates at {}</span>"#, cap))
        .unwrap_or_default();
    format!(r#"<div class="legend">{}{}</div>"#, items, cap)
}

fn inline_css() -> &'static str {
    r#"
* { box-sizing: border-box; }
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; color: #1f2933; background: #f5f7fa; }
.container { padding: 24px; }
h1 { font-size: 20px; margin: 0 0 4px 0; }
.subtitle { color: #616e7c; margin: 0 0 16px 0; font-size: 13px; }
table.matrix { border-collapse: collapse; background: #fff; font-size: 12px; }
.matrix th, .matrix td { border: 1px solid #d9e2ec; padding: 4px 6px; white-space: nowrap; }
.matrix thead th { background: #243b53; color: #fff; position: sticky; top: 0; }
.matrix th.sorted { background: #334e68; }
.matrix th.month { text-align: center; }
.matrix td.load { text-align: right; min-width: 48px; }
.matrix td.comment { color: #616e7c; font-style: italic; }
.person-total th { text-align: right; background: #f0f4f8; }
.overall-total th, .overall-total td { font-weight: 700; background: #d9e2ec; }
.swatch { display: inline-block; width: 10px; height: 10px; margin-right: 4px; border: 1px solid #9aa5b1; vertical-align: middle; }
.legend { margin-top: 12px; font-size: 12px; }
.legend-item { margin-right: 12px; }
.legend-cap { color: #616e7c; }
"#
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
