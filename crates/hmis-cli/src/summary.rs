use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::types::MergeSummary;

pub fn print_summary(summary: &MergeSummary) {
    if let Some(path) = &summary.output {
        println!("Output: {}", path.display());
    }
    println!("{}", summary_table(summary));
    if summary.excluded_enrollments > 0 {
        println!(
            "Excluded {} enrollment(s) of placeholder-only clients",
            summary.excluded_enrollments
        );
    }
}

pub fn summary_table(summary: &MergeSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Rows read"),
        header_cell("Rows kept"),
        header_cell("Duplicates"),
        header_cell("Warnings"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for row in &summary.tables {
        table.add_row(vec![
            Cell::new(&row.table)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(row.rows_read),
            Cell::new(row.rows_kept),
            count_cell(row.duplicates_dropped, Color::Yellow),
            count_cell(row.warnings, Color::Yellow),
        ]);
    }
    table.add_row(vec![
        Cell::new("MERGED")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(summary.rows).add_attribute(Attribute::Bold),
        Cell::new(format!("{} cols", summary.columns)).fg(Color::DarkGrey),
        count_cell(summary.total_warnings(), Color::Yellow).add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
