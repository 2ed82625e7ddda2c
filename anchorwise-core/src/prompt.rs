//! Plain-text renderings meant to be pasted into an LLM prompt.

use chrono_tz::Tz;

use crate::availability::AvailabilityMap;
use crate::sources::CalendarEvent;

/// One bullet per day: `- **Tuesday Feb 10:** Morning Coffee, After Lunch`.
pub fn format_availability_for_prompt(availability: &AvailabilityMap) -> String {
    let mut lines = vec!["## Available Time Slots (anchors with NO calendar conflicts)".to_string()];
    for (day, anchors) in availability.iter() {
        let label = day.format("%A %b %d");
        if anchors.is_empty() {
            lines.push(format!("- **{label}:** NO available slots"));
        } else {
            lines.push(format!("- **{label}:** {}", anchors.join(", ")));
        }
    }
    lines.join("\n")
}

/// Upcoming calendar events, start times shown in `tz`.
pub fn format_calendar_context(events: &[CalendarEvent], days_ahead: u32, tz: Tz) -> String {
    if events.is_empty() {
        return format!("## Calendar\nNo upcoming events in the next {days_ahead} days.");
    }

    let mut lines = vec![format!("## Calendar (next {days_ahead} days)")];
    for event in events {
        let start = event.start.in_zone(tz);
        lines.push(format!("- {}: {}", start.format("%a %b %d, %I:%M %p"), event.summary));
    }
    lines.join("\n")
}
