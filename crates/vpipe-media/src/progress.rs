//! Heuristic progress estimation from pipeline output.
//!
//! Recognizes two case-insensitive markers:
//! - `Progress: <n>%` reports `n` directly
//! - `Task <a>/<b>` reports `floor(100 * a / b)`
//!
//! Anything else, including malformed numbers, yields no estimate.

use std::sync::LazyLock;

use regex::Regex;

static PERCENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Progress:\s*(\d+)%").expect("valid progress regex"));

static TASK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Task\s+(\d+)\s*/\s*(\d+)").expect("valid task regex"));

/// Estimate progress (0-100) from one output line.
pub fn estimate_progress(line: &str) -> Option<u8> {
    if let Some(caps) = PERCENT_PATTERN.captures(line) {
        let percent: u64 = caps[1].parse().ok()?;
        return Some(percent.min(100) as u8);
    }

    if let Some(caps) = TASK_PATTERN.captures(line) {
        let current: u64 = caps[1].parse().ok()?;
        let total: u64 = caps[2].parse().ok()?;
        if total == 0 {
            return None;
        }
        let percent = current.checked_mul(100)? / total;
        return Some(percent.min(100) as u8);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_marker() {
        assert_eq!(estimate_progress("Progress: 42%"), Some(42));
        assert_eq!(estimate_progress("[stage] progress:7% done"), Some(7));
        assert_eq!(estimate_progress("PROGRESS:   100%"), Some(100));
    }

    #[test]
    fn test_task_marker() {
        assert_eq!(estimate_progress("Task 3/10"), Some(30));
        assert_eq!(estimate_progress("task 2 / 3 upscaling"), Some(66));
        assert_eq!(estimate_progress("Task 10/10"), Some(100));
    }

    #[test]
    fn test_zero_total_is_no_update() {
        assert_eq!(estimate_progress("Task 1/0"), None);
    }

    #[test]
    fn test_unrelated_lines() {
        assert_eq!(estimate_progress("Loading model weights"), None);
        assert_eq!(estimate_progress("Progress: unknown"), None);
        assert_eq!(estimate_progress("Tasks queued: 4"), None);
        assert_eq!(estimate_progress(""), None);
    }

    #[test]
    fn test_out_of_range_values_are_capped() {
        assert_eq!(estimate_progress("Progress: 250%"), Some(100));
        assert_eq!(estimate_progress("Task 12/10"), Some(100));
        assert_eq!(
            estimate_progress("Progress: 99999999999999999999999%"),
            None
        );
    }

    #[test]
    fn test_percent_marker_wins_over_task() {
        assert_eq!(estimate_progress("Task 1/4 Progress: 80%"), Some(80));
    }
}
