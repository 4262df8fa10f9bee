mod format;
mod progress;
mod render;
mod styling;
mod tables;

pub use format::{format_millis, format_millis_f64};
pub use progress::Spinner;
pub use render::{Render, Terminal};
pub use styling::{bold, bright_green, bright_red, cyan, dim, info, result_badge, rule};
pub use tables::{create_table, duration_cell, header_cell, status_cell};

#[cfg(test)]
pub(crate) use render::Capture;
