//! Terminal formatting for queue state and progress.

use podfetch_core::download::{DownloadSummary, ProgressStatus, ProgressUpdate};

const BAR_WIDTH: usize = 20;

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Truncate a string to a maximum length with ellipsis.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Text bar for a fraction in `[0, 1]`.
pub fn progress_bar(fraction: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// One line describing a progress update.
pub fn format_progress(update: &ProgressUpdate) -> String {
    let label = match update.status {
        ProgressStatus::Queued => "queued",
        ProgressStatus::Downloading => "downloading",
        ProgressStatus::Paused => "paused",
        ProgressStatus::Completed => "completed",
        ProgressStatus::Failed => "failed",
        ProgressStatus::Cancelled => "cancelled",
    };
    let mut line = format!(
        "{:<12} {} {:>3.0}% {label}",
        truncate_string(&update.episode_id, 12),
        progress_bar(update.fraction_completed),
        update.fraction_completed * 100.0,
    );
    if let Some(message) = &update.message {
        line.push_str(" (");
        line.push_str(message);
        line.push(')');
    }
    line
}

/// Print the queue as a table.
pub fn print_queue(items: &[DownloadSummary]) {
    if items.is_empty() {
        println!("Queue is empty.");
        return;
    }

    println!(
        "{:<4} {:<12} {:<8} {:<12} {:>6} {:<7} Error",
        "Pos", "Episode", "Priority", "State", "Done", "Retries"
    );
    print_separator(70);
    for item in items {
        println!(
            "{:<4} {:<12} {:<8} {:<12} {:>5.0}% {:<7} {}",
            item.position,
            truncate_string(&item.episode_id, 12),
            format!("{:?}", item.priority),
            item.state.as_str(),
            item.progress * 100.0,
            item.retry_count,
            item.error.as_deref().unwrap_or("--"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("a-very-long-episode-id", 10), "a-very-...");
    }

    #[test]
    fn test_progress_bar_bounds() {
        assert_eq!(progress_bar(0.0), format!("[{}]", ".".repeat(BAR_WIDTH)));
        assert_eq!(progress_bar(1.0), format!("[{}]", "#".repeat(BAR_WIDTH)));
        assert_eq!(progress_bar(2.0), progress_bar(1.0));
    }

    #[test]
    fn test_format_progress_includes_failure_message() {
        let update = ProgressUpdate::new("demo-1", 0.5, ProgressStatus::Failed)
            .with_message("Transfer failed: reset");
        let line = format_progress(&update);
        assert!(line.starts_with("demo-1"));
        assert!(line.contains(" 50% failed"));
        assert!(line.ends_with("(Transfer failed: reset)"));
    }
}
