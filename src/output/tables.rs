use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color as TableColor, ContentArrangement, Table};

use crate::jenkins::Status;

use super::format::format_millis;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(TableColor::AnsiValue(202))
        .set_alignment(CellAlignment::Center)
}

pub fn status_cell(status: Status) -> Cell {
    let cell = Cell::new(status.as_str());
    match status {
        Status::Success => cell.fg(TableColor::Green),
        Status::Failed | Status::Aborted => cell.fg(TableColor::Red),
        Status::InProgress => cell.fg(TableColor::Yellow),
        Status::NotExecuted | Status::Unknown => cell.fg(TableColor::DarkGrey),
    }
}

pub fn duration_cell(millis: u64) -> Cell {
    Cell::new(format_millis(millis)).set_alignment(CellAlignment::Right)
}
