//! Text formatting for product and history views.

use chrono::{DateTime, Utc};
use crossterm::style::{Color, Stylize};
use rust_decimal::Decimal;

use stockbook_inventory::StockLevel;

pub const NAME_WIDTH: usize = 25;
pub const DESCRIPTION_WIDTH: usize = 30;

/// Cut `text` to `max` characters, appending `...` when something was cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

/// Placeholder for empty optional text.
pub fn or_dash(text: &str) -> &str {
    if text.trim().is_empty() { "—" } else { text }
}

pub fn variation(delta: i64) -> String {
    if delta > 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

pub fn variation_color(delta: i64) -> Color {
    match delta {
        d if d > 0 => Color::Green,
        d if d < 0 => Color::Red,
        _ => Color::Yellow,
    }
}

pub fn stock_color(level: StockLevel) -> Color {
    match level {
        StockLevel::OutOfStock => Color::Red,
        StockLevel::Low => Color::Yellow,
        StockLevel::InStock => Color::Green,
    }
}

pub fn price(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

pub fn timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

#[derive(Debug, Clone)]
pub struct Cell {
    text: String,
    color: Option<Color>,
}

impl Cell {
    pub fn colored(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
        }
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Self { text, color: None }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

/// Left-aligned text table; colour is applied after padding so widths hold.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.headers.len());
        self.rows.push(cells);
    }

    pub fn render(&self, styled: bool) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.text.chars().count());
            }
        }
        let last = widths.len().saturating_sub(1);

        let mut out = String::new();
        let header: Vec<String> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| pad(h, widths[i], i == last))
            .collect();
        let header = header.join("  ");
        if styled {
            out.push_str(&header.as_str().bold().to_string());
        } else {
            out.push_str(&header);
        }
        out.push('\n');

        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));

        for row in &self.rows {
            out.push('\n');
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let padded = pad(&cell.text, widths[i], i == last);
                    match cell.color {
                        Some(color) if styled => padded.with(color).to_string(),
                        _ => padded,
                    }
                })
                .collect();
            out.push_str(&cells.join("  "));
        }
        out
    }
}

fn pad(text: &str, width: usize, last: bool) -> String {
    if last {
        text.to_string()
    } else {
        let fill = width.saturating_sub(text.chars().count());
        format!("{text}{}", " ".repeat(fill))
    }
}
