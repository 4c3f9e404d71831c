use trax_core::models::TrackingEvent;
use trax_core::status::CanonicalStatus;

/// Reduce a raw event set to the ordered presentation timeline.
///
/// Pure: output depends only on the input set, never its order, and running
/// the builder twice on the same input yields the same timeline.
///
/// The anchor is the first non-hidden label-created event; without one the
/// whole history is suppressed. Once any terminal-leg carrier has scanned
/// (the cutoff), later non-terminal scans are stale linehaul noise and are
/// dropped, while terminal-leg events are always kept as ground truth.
pub fn build(events: &[TrackingEvent]) -> Vec<TrackingEvent> {
    let mut sorted: Vec<TrackingEvent> = events.to_vec();
    sorted.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.canonical_status.rank().cmp(&b.canonical_status.rank()))
    });

    let anchor_ts = match sorted
        .iter()
        .find(|e| !e.hidden && e.is_label_created())
        .map(|e| e.timestamp)
    {
        Some(ts) => ts,
        None => return Vec::new(),
    };

    // Hidden terminal scans still establish the cutoff; hiding suppresses an
    // event from consumers, not the fact that the terminal carrier is live.
    let cutoff = sorted
        .iter()
        .find(|e| {
            e.terminal
                && e.timestamp >= anchor_ts
                && e.canonical_status != CanonicalStatus::LabelCreated
        })
        .map(|e| e.timestamp);

    sorted
        .into_iter()
        .filter(|e| {
            !e.hidden
                && e.timestamp >= anchor_ts
                && (e.terminal || cutoff.map_or(true, |c| e.timestamp < c))
        })
        .collect()
}
