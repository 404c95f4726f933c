use crate::core::rates::RateSeries;
use crate::core::stats::Statistics;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Value,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Value => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right-aligned rate cell.
pub fn rate_cell(value: f64) -> Cell {
    Cell::new(format!("{value:.4}")).set_alignment(CellAlignment::Right)
}

/// Right-aligned cell showing the value at full precision.
pub fn exact_cell(value: f64) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

/// Renders every record of a series.
pub fn series_table(series: &RateSeries) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Currency"),
        header_cell("Effective date"),
        header_cell("Mid"),
    ]);
    for point in &series.points {
        table.add_row(vec![
            Cell::new(&point.currency),
            Cell::new(point.effective_date.format("%Y-%m-%d")),
            rate_cell(point.mid),
        ]);
    }
    table
}

pub fn statistics_table(stats: &Statistics) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![header_cell("Statistic"), header_cell("Value")]);
    for (label, value) in [
        ("Average", stats.average),
        ("Median", stats.median),
        ("Minimum", stats.minimum),
        ("Maximum", stats.maximum),
    ] {
        table.add_row(vec![Cell::new(label), exact_cell(value)]);
    }
    table
}

/// Wraps `text` between two dashed rules.
pub fn framed(text: &str) -> String {
    let rule = "-".repeat(20);
    format!("{rule}\n{text}\n{rule}\n")
}

/// Creates a spinner for work of unknown length.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
