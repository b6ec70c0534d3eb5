use chrono::NaiveDateTime;
use std::time::Instant;
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

/// Format a large integer with thousands separators.
pub fn fmt_number(n: i64) -> String {
    let digits = n.abs().to_string().into_bytes();
    let mut groups: Vec<String> = digits
        .rchunks(3)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    groups.reverse();
    let joined = groups.join(",");
    if n < 0 {
        format!("-{joined}")
    } else {
        joined
    }
}

/// Render an optional capture timestamp, with a dash for "never".
pub fn fmt_opt_stamp(stamp: Option<NaiveDateTime>) -> String {
    stamp
        .map(|s| s.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "—".into())
}
