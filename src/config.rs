/// Engine-level constants
pub const APP_NAME: &str = "CareBridge";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound on the backward day-by-day streak scan.
pub const STREAK_SCAN_CAP_DAYS: u32 = 365;

/// Appointment reminders fire this many minutes before the appointment.
pub const APPOINTMENT_REMINDER_LEAD_MINUTES: i64 = 60;

/// Sliding window for the sensitive-operation rate limiter.
pub const RATE_LIMIT_WINDOW_SECONDS: i64 = 3600;

/// Attempts allowed per (actor, operation) inside one window.
pub const RATE_LIMIT_MAX_ATTEMPTS: u32 = 10;

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn default_filter_names_crate() {
        assert!(default_log_filter().contains("carebridge"));
    }
}
