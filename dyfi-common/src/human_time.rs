//! Human-readable elapsed time formatting
//!
//! Used for phase timings in run logs and reports.

use std::time::Duration;

/// Format selection thresholds (seconds)
const SHORT_FORMAT_MAX: f64 = 100.0; // < 100s → X.XXs
const MEDIUM_FORMAT_MAX: f64 = 6000.0; // < 100m → M:SS.Xs
                                       // >= 100m → H:MM:SS

/// Format an elapsed duration.
///
/// - Short format (`X.XXs`): under 100 seconds
/// - Medium format (`M:SS.Xs`): 100 seconds to 100 minutes
/// - Long format (`H:MM:SS`): 100 minutes and above
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dyfi_common::human_time::format_elapsed;
///
/// assert_eq!(format_elapsed(Duration::from_millis(1_250)), "1.25s");
/// assert_eq!(format_elapsed(Duration::from_secs(330)), "5:30.0s");
/// assert_eq!(format_elapsed(Duration::from_secs(7_261)), "2:01:01");
/// ```
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();

    if seconds < SHORT_FORMAT_MAX {
        format!("{:.2}s", seconds)
    } else if seconds < MEDIUM_FORMAT_MAX {
        let whole = elapsed.as_secs();
        let minutes = whole / 60;
        let secs = seconds - (minutes * 60) as f64;
        format!("{}:{:04.1}s", minutes, secs)
    } else {
        let whole = elapsed.as_secs();
        let hours = whole / 3600;
        let mins = (whole % 3600) / 60;
        let secs = whole % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}
