//! Dose scheduling: turns a medication's frequency into the next due
//! timestamp. Pure, deterministic in `from`, no storage involved.

use chrono::{Duration, Months, NaiveDateTime};

use crate::models::Frequency;

/// Next due timestamp after `from` for the given frequency. As-needed
/// medications carry no automatic schedule, so None.
///
/// Monthly adds one calendar month, preserving the day-of-month and
/// clamping in shorter months (Jan 31 -> Feb 28/29).
pub fn next_dose(frequency: Frequency, from: NaiveDateTime) -> Option<NaiveDateTime> {
    match frequency {
        Frequency::OnceDaily => Some(from + Duration::days(1)),
        Frequency::TwiceDaily => Some(from + Duration::hours(12)),
        Frequency::ThriceDaily => Some(from + Duration::hours(8)),
        Frequency::FourTimesDaily => Some(from + Duration::hours(6)),
        Frequency::Weekly => Some(from + Duration::days(7)),
        Frequency::Monthly => from.checked_add_months(Months::new(1)),
        Frequency::AsNeeded => None,
    }
}

/// How many doses a day of full adherence requires. Weekly, monthly and
/// as-needed medications impose no per-day requirement, so they neither
/// sustain nor break a daily streak.
pub fn doses_per_day(frequency: Frequency) -> u32 {
    match frequency {
        Frequency::OnceDaily => 1,
        Frequency::TwiceDaily => 2,
        Frequency::ThriceDaily => 3,
        Frequency::FourTimesDaily => 4,
        Frequency::Weekly | Frequency::Monthly | Frequency::AsNeeded => 0,
    }
}
