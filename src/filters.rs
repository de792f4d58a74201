// filters.rs
// Custom askama filters.

use std::fmt::Display;

/// Amount with two decimals: `1234.5` -> `1234.50`.
pub fn money<T: Display>(value: T, _: &dyn askama::Values) -> askama::Result<String> {
    Ok(format!("{value:.2}"))
}

/// `-` in place of blank text.
pub fn or_dash<T: Display>(value: T, _: &dyn askama::Values) -> askama::Result<String> {
    let text = value.to_string();
    Ok(if text.trim().is_empty() { "-".to_string() } else { text })
}
