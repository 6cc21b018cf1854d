use std::time::{Duration, Instant};

/// How often a running harvest reports.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// `1h2m3s` style rendering, rounded to the second.
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs() + u64::from(d.subsec_millis() >= 500);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}

/// Percent done and time remaining after `i` of `total` items in `elapsed`.
pub fn progress_eta(elapsed: Duration, i: usize, total: usize) -> String {
    if i == 0 || total == 0 {
        return format!("{:.2}% ETA unknown", 0.0);
    }
    let percent = i as f64 / total as f64 * 100.0;
    let per_item = elapsed.as_secs_f64() / i as f64;
    let remaining = Duration::from_secs_f64((per_item * total as f64 - elapsed.as_secs_f64()).max(0.0));
    format!("{percent:.2}% ETA {}", format_elapsed(remaining))
}

/// Rate-limited progress reporting for a long run.
#[derive(Debug)]
pub struct Progress {
    name: String,
    total: usize,
    started: Instant,
    last_report: Option<Instant>,
}

impl Progress {
    pub fn new(name: &str, total: usize) -> Self {
        Self {
            name: name.to_string(),
            total,
            started: Instant::now(),
            last_report: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// `<name> last id <id> (<i>/<total>) <elapsed>: <pct>% ETA <eta>`
    pub fn line(&self, i: usize, last_id: &str, elapsed: Duration) -> String {
        format!(
            "{} last id {} ({}/{}) {}: {}",
            self.name,
            last_id,
            i,
            self.total,
            format_elapsed(elapsed),
            progress_eta(elapsed, i, self.total)
        )
    }

    /// The progress line when a report is due: the first call, then at most
    /// once per [`REPORT_INTERVAL`].
    pub fn tick(&mut self, i: usize, last_id: &str) -> Option<String> {
        let now = Instant::now();
        let due = self
            .last_report
            .is_none_or(|t| now.duration_since(t) >= REPORT_INTERVAL);
        if !due {
            return None;
        }
        self.last_report = Some(now);
        Some(self.line(i, last_id, now.duration_since(self.started)))
    }
}
