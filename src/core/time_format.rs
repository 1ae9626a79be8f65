//! Hour formatting helpers.
//!
//! Hours are fractional values where the integer part is the hour of day and
//! the fraction is a share of sixty minutes (9.5 is 9:30am).

/// Formats a fractional hour as a 12-hour clock label.
///
/// `0` renders as `12am`, `12` as `12pm`, `13` as `1pm`; non-zero minutes use
/// `H:MMam`/`H:MMpm`. The end-of-day value `24` renders as `12am`.
#[must_use]
pub fn format_hour(hour: f64) -> String {
    // Cast safety: hours are validated to [0, 24] before they reach here.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (h, m) = {
        let whole = hour.trunc();
        (whole as u32, ((hour - whole) * 60.0) as u32)
    };

    let h = h % 24;
    let period = if h >= 12 { "pm" } else { "am" };
    let display_hour = match h {
        0 => 12,
        1..=12 => h,
        _ => h - 12,
    };

    if m == 0 {
        format!("{display_hour}{period}")
    } else {
        format!("{display_hour}:{m:02}{period}")
    }
}

/// Formats a start/end pair as `"9am - 11:30am"`.
#[must_use]
pub fn time_range_display(start_hour: f64, end_hour: f64) -> String {
    format!("{} - {}", format_hour(start_hour), format_hour(end_hour))
}

/// Formats an hour total: whole numbers drop the fraction (`"2h"`), others keep it (`"1.5h"`).
#[must_use]
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{hours:.0}h")
    } else {
        format!("{hours}h")
    }
}

/// Builds `(label, value)` options for an hour picker between `start_hour` and
/// `end_hour` inclusive, optionally with half-hour steps between whole hours.
#[must_use]
pub fn hour_options(start_hour: u32, end_hour: u32, include_half: bool) -> Vec<(String, f64)> {
    let mut options = Vec::new();
    for h in start_hour..=end_hour {
        let value = f64::from(h);
        options.push((format_hour(value), value));
        if include_half && h < end_hour {
            options.push((format_hour(value + 0.5), value + 0.5));
        }
    }
    options
}
