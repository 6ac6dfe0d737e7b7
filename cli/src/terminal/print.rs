use colored::*;
use lpardiff_core::diff::{ComparisonResult, DiffRow};
use unicode_width::UnicodeWidthStr;

const ATTRIBUTE_HEADER: &str = "Attribute";

/// Heading printed above each comparison pair.
pub fn pair_header(left_name: &str, right_name: &str) {
    let heading = format!("⟦ {left_name} vs {right_name} ⟧");
    println!("\n{}", heading.bold().bright_green());
}

/// Renders one comparison as a three-column table: attribute name plus
/// one value column per LPAR. Matched rows are green, mismatched red.
pub fn comparison_table(left_name: &str, right_name: &str, result: &ComparisonResult) {
    if result.rows.is_empty() {
        println!("{}", "No differences found".dimmed());
        return;
    }

    let labels: Vec<String> = result.rows.iter().map(field_label).collect();

    let mut widths = [
        UnicodeWidthStr::width(ATTRIBUTE_HEADER),
        UnicodeWidthStr::width(left_name),
        UnicodeWidthStr::width(right_name),
    ];
    for (row, label) in result.rows.iter().zip(&labels) {
        widths[0] = widths[0].max(UnicodeWidthStr::width(label.as_str()));
        widths[1] = widths[1].max(UnicodeWidthStr::width(row.left.as_str()));
        widths[2] = widths[2].max(UnicodeWidthStr::width(row.right.as_str()));
    }

    separator(&widths);
    println!(
        "│ {} │ {} │ {} │",
        pad(ATTRIBUTE_HEADER, widths[0]).bold().blue(),
        pad(left_name, widths[1]).bold().blue(),
        pad(right_name, widths[2]).bold().blue(),
    );
    separator(&widths);

    let mut current_group = None;
    for (row, label) in result.rows.iter().zip(&labels) {
        if current_group != Some(row.group) {
            current_group = Some(row.group);
            println!(
                "│ {} │ {} │ {} │",
                pad(row.group.label(), widths[0]).bold().bright_black(),
                pad("", widths[1]).normal(),
                pad("", widths[2]).normal(),
            );
        }
        let paint: fn(String) -> ColoredString = if row.matched {
            |s| s.green()
        } else {
            |s| s.red()
        };
        println!(
            "│ {} │ {} │ {} │",
            pad(label, widths[0]).normal(),
            paint(pad(&row.left, widths[1])),
            paint(pad(&row.right, widths[2])),
        );
    }
    separator(&widths);
}

/// Red one-liner for a failed lookup.
pub fn failure(message: &str) {
    eprintln!("{}", message.red());
}

fn separator(widths: &[usize; 3]) {
    let line: String = widths
        .iter()
        .map(|width| "─".repeat(width + 2))
        .collect::<Vec<_>>()
        .join("┼");
    println!("{}", format!("├{line}┤").bright_black());
}

/// Adapter rows prefix the field with the adapter index, so two adapters
/// carrying the same field stay tell-apart-able in a long table.
fn field_label(row: &DiffRow) -> String {
    match row.index {
        Some(index) => format!("[{index}] {}", row.field),
        None => row.field.to_string(),
    }
}

/// Pads to the display width, not the byte or char count.
fn pad(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{text}{}", " ".repeat(padding))
}
