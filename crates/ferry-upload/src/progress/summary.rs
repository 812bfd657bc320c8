//! Summary lines and per-item status texts.

use ferry_core::{ProgressTexts, QueueStats};

use super::rate::{eta_seconds, format_eta};

/// Status text for an item that has not been claimed yet.
pub const NOT_YET_UPLOADED: &str = "not yet uploaded";
/// Status text shown while the last chunk is in flight.
pub const FINALIZING: &str = "finalizing ...";
/// Status text for a fully transferred item.
pub const UPLOADED: &str = "uploaded!";
/// Status text for an item moved back from the failed set.
pub const WILL_RETRY: &str = "will retry this upload";

/// Appends "s" to `word` unless `n` is exactly 1.
pub fn pl<N>(word: &str, n: N) -> String
where
    N: TryInto<u64>,
{
    if n.try_into().is_ok_and(|n| n == 1) {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Per-item progress line for `transferred` of `size` bytes.
#[allow(clippy::cast_precision_loss)]
pub fn item_progress_text(transferred: u64, size: u64) -> String {
    if transferred >= size {
        UPLOADED.to_string()
    } else {
        let percent = 100.0 * transferred as f64 / size as f64;
        format!("{percent:.2}% uploaded")
    }
}

/// Megabytes with two decimals, nudged so a non-empty queue never shows 0.00.
#[allow(clippy::cast_precision_loss)]
pub fn megabytes_left(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0 / 1024.0 + 0.01)
}

/// Build both summary lines from one stats snapshot.
pub fn progress_texts(stats: &QueueStats, noun: &str) -> ProgressTexts {
    ProgressTexts {
        pending: pending_text(stats, noun),
        completed: completed_text(stats, noun),
    }
}

/// "3 items left (1.25 MB).  About 2 minutes remaining at 80 kb/s"
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn pending_text(stats: &QueueStats, noun: &str) -> String {
    let left = stats.items_left;
    if left == 0 {
        return "Nothing to upload.".to_string();
    }

    let mut text = format!(
        "{left} {} left ({} MB).  ",
        pl(noun, left),
        megabytes_left(stats.bytes_remaining)
    );

    if !stats.enabled {
        text.push_str("  Uploading is currently disabled.");
    } else if let Some(secs) = eta_seconds(stats.bytes_remaining, stats.rate_bps) {
        let kbps = (8.0 * stats.rate_bps / 1000.0) as u64;
        text.push_str(&format_eta(secs));
        text.push_str(&format!(" remaining at {kbps} kb/s"));
    }

    text
}

/// "2 items have been uploaded.  1 item failed to upload."
pub fn completed_text(stats: &QueueStats, noun: &str) -> String {
    let mut text = match stats.items_completed_total {
        0 => "Nothing uploaded yet.".to_string(),
        1 => format!("1 {noun} has been uploaded."),
        n => format!("{n} {noun}s have been uploaded."),
    };

    if stats.failed > 0 {
        text.push_str(&format!(
            "  {} {} failed to upload.",
            stats.failed,
            pl(noun, stats.failed)
        ));
    }

    text
}
