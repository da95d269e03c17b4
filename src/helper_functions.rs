//! Common utility functions used by the interactive driver
//!
//! Terminal dividers and release version comparison.

use chrono::NaiveDate;
use console::{style, Color, Term};

/// Common utility functions used throughout the application
pub struct Utils;

impl Utils {
    fn terminal_width() -> usize {
        let (_, cols) = Term::stdout().size();
        usize::from(cols).max(20)
    }

    /// Print a full-width divider line
    pub fn print_divider(color: Color) {
        let line = "-".repeat(Self::terminal_width());
        println!("\n{}", style(line).fg(color).bright());
    }

    /// Print a full-width divider with `text` centred in it
    pub fn print_divider_with_text(text: &str, divider_color: Color, text_color: Color) {
        println!("\n{}", Self::divider_with_text(text, Self::terminal_width(), divider_color, text_color));
    }

    fn divider_with_text(text: &str, width: usize, divider_color: Color, text_color: Color) -> String {
        let dashes = width.saturating_sub(text.chars().count() + 2);
        let left = dashes / 2;
        let right = dashes - left;
        format!(
            "{} {} {}",
            style("-".repeat(left)).fg(divider_color).bright(),
            style(text).fg(text_color).bright(),
            style("-".repeat(right)).fg(divider_color).bright()
        )
    }

    /// Parse a `YYYY.MM.DD` release version
    pub fn parse_dot_date(version: &str) -> Option<NaiveDate> {
        let mut parts = version.trim().split('.');
        let year = parts.next()?.parse().ok()?;
        let month = parts.next()?.parse().ok()?;
        let day = parts.next()?.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// Whether `latest` is a newer release than `installed`
    pub fn is_update_available(latest: &str, installed: &str) -> bool {
        match (Self::parse_dot_date(latest), Self::parse_dot_date(installed)) {
            (Some(latest), Some(installed)) => latest > installed,
            _ => false,
        }
    }
}
