use chrono::{DateTime, Local};
use std::time::Duration;

const BYTES_PER_GB: f64 = (1u64 << 30) as f64;

pub fn byte_to_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

pub fn format_gb(bytes: u64) -> String {
    format!("{:.2} GB", byte_to_gb(bytes))
}

pub fn format_gb_with_percent(bytes: u64, percent: f64) -> String {
    format!("{:.2} GB ({:.2}%)", byte_to_gb(bytes), percent)
}

/// Days never wrap; hours, minutes and seconds wrap at their unit size.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{days}d {hours:02}h {minutes:02}m {seconds:02}s")
}

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
