use console::{style, StyledObject};

/// Styling helpers for terminal output
pub fn info(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).color256(202).bold()
}

pub fn bright_green(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn bright_yellow(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bold(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bold()
}

/// Badge for a build result or stage status.
///
/// Builds report `FAILURE` where stages report `FAILED`; both render as failures.
pub fn result_badge(result: &str) -> StyledObject<String> {
    let badge = style(result.to_string()).bold();
    match result {
        "SUCCESS" => badge.white().on_green(),
        "FAILURE" | "FAILED" | "ABORTED" => badge.white().on_red(),
        "IN_PROGRESS" | "BUILDING" | "UNSTABLE" => badge.black().on_yellow(),
        _ => badge.color256(202),
    }
}

/// A horizontal rule as wide as the log headers.
pub fn rule() -> StyledObject<String> {
    dim("─".repeat(80))
}
