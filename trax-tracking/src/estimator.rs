use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use trax_core::models::TrackingEvent;
use trax_core::status::{CanonicalStatus, ExternalStatus};

/// Tunables for the delivery estimate.
#[derive(Debug, Clone)]
pub struct EstimatorOptions {
    /// Business days to project when only non-terminal carriers have scanned.
    pub lead_days: u32,
    /// Local hour of day treated as the end of the delivery window.
    pub cutoff_hour: u32,
    /// Non-delivery dates beyond weekends. Empty unless configured.
    pub holidays: BTreeSet<NaiveDate>,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            lead_days: 3,
            cutoff_hour: 20,
            holidays: BTreeSet::new(),
        }
    }
}

/// Estimate the delivery date for a non-empty timeline.
///
/// `now` is injected so the estimate is a pure function of its inputs.
/// Returns None only when the timeline is empty or the timezone arithmetic
/// cannot produce a valid local instant.
pub fn estimate(
    timeline: &[TrackingEvent],
    tz: Tz,
    opts: &EstimatorOptions,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let last = timeline.last()?;
    let today = now.with_timezone(&tz).date_naive();

    let edd = match last.external_status {
        // Already on the truck (or back at the shipper): the estimate is the
        // current day's cutoff instant, not a start-of-day projection.
        ExternalStatus::Delivered
        | ExternalStatus::OutForDelivery
        | ExternalStatus::ReturnToSender => local_instant(tz, today, opts.cutoff_hour)?,
        _ => {
            let terminal_progress = timeline
                .iter()
                .any(|e| e.terminal && e.canonical_status != CanonicalStatus::LabelCreated);
            let days = if terminal_progress { 1 } else { opts.lead_days };
            local_instant(tz, add_business_days(today, days, &opts.holidays), 0)?
        }
    };

    // Producers can assert stale dates; clamp anything before today's
    // calendar day. Compared as dates, never as formatted strings.
    if edd.with_timezone(&tz).date_naive() < today {
        local_instant(tz, add_business_days(today, 1, &opts.holidays), 0)
    } else {
        Some(edd)
    }
}

/// Advance `days` business days, skipping weekends and configured holidays.
pub fn add_business_days(from: NaiveDate, days: u32, holidays: &BTreeSet<NaiveDate>) -> NaiveDate {
    let mut date = from;
    for _ in 0..days {
        loop {
            date = date.succ_opt().unwrap_or(date);
            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            if !weekend && !holidays.contains(&date) {
                break;
            }
        }
    }
    date
}

/// A local wall-clock instant in `tz`, converted to UTC. Ambiguous local
/// times (DST fall-back) take the earlier offset; nonexistent ones
/// (spring-forward gap) slide one hour later.
fn local_instant(tz: Tz, date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    let resolved = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earlier, _) => Some(earlier),
        LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
    };
    resolved.map(|dt| dt.with_timezone(&Utc))
}
