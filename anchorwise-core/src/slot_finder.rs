//! Adaptive slot finder: next free anchor honoring a time-of-day preference.
//!
//! Conflicts here use a symmetric proximity buffer, not the half-open overlap
//! of the availability calculator: a candidate conflicts with an existing
//! task when `|existing - candidate| < existing_minutes + estimated_minutes`.

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::anchors::resolve_anchor_on;
use crate::scheduler::AnchorScheduler;
use crate::task::{TaskQuery, TaskRecord};

/// Days searched, starting tomorrow.
pub const SEARCH_HORIZON_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Unclassified,
}

impl DayPart {
    /// Keyword classification; morning wins over afternoon wins over evening.
    pub fn classify(preference: &str) -> Self {
        let p = preference.to_lowercase();
        let has_any = |words: &[&str]| words.iter().any(|w| p.contains(w));

        if has_any(&["morning", "breakfast", "coffee"]) {
            DayPart::Morning
        } else if has_any(&["lunch", "afternoon"]) {
            DayPart::Afternoon
        } else if has_any(&["evening", "dinner", "night", "bed"]) {
            DayPart::Evening
        } else {
            DayPart::Unclassified
        }
    }

    /// Candidate anchors, tried in order within each day.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            DayPart::Morning => &["Morning Coffee", "Mid-Morning"],
            DayPart::Afternoon => &["After Lunch", "Mid-Afternoon"],
            DayPart::Evening => &["End of Day", "Evening", "After Dinner"],
            DayPart::Unclassified => &["After Lunch", "Mid-Afternoon", "End of Day"],
        }
    }
}

/// A concrete `(timestamp, anchor label)` choice for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub scheduled_at: DateTime<Tz>,
    pub scheduled_text: String,
}

/// An existing commitment the finder must keep clear of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    pub at: DateTime<Utc>,
    pub minutes: i64,
}

impl Commitment {
    /// Commitments for every task with a parseable `scheduled_at`.
    pub fn from_tasks(tasks: &[TaskRecord], tz: Tz) -> Vec<Self> {
        tasks
            .iter()
            .filter_map(|t| {
                let at = t.scheduled_utc(tz);
                if at.is_none() && t.scheduled_at.is_some() {
                    tracing::warn!(task_id = %t.id, "ignoring unparseable scheduled_at during slot search");
                }
                at.map(|at| Commitment {
                    at,
                    minutes: t.duration_minutes(),
                })
            })
            .collect()
    }

    pub fn conflicts_with(&self, candidate: DateTime<Utc>, estimated_minutes: i64) -> bool {
        let gap = (self.at - candidate).num_seconds().abs();
        gap < self.minutes.saturating_add(estimated_minutes).saturating_mul(60)
    }
}

/// Search `SEARCH_HORIZON_DAYS` days from `search_start`, trying the
/// preference's candidate anchors in order each day.
///
/// Falls back to the preference text itself resolved on `search_start`, with
/// no conflict check, when every candidate is taken.
pub fn search_slot(
    commitments: &[Commitment],
    anchor_preference: &str,
    estimated_minutes: i64,
    tz: Tz,
    search_start: NaiveDate,
) -> Slot {
    let candidates = DayPart::classify(anchor_preference).candidates();

    for offset in 0..SEARCH_HORIZON_DAYS {
        let Some(day) = search_start.checked_add_days(Days::new(u64::from(offset))) else {
            break;
        };
        for &anchor in candidates {
            let at = resolve_anchor_on(anchor, tz, day);
            let at_utc = at.with_timezone(&Utc);
            if !commitments.iter().any(|c| c.conflicts_with(at_utc, estimated_minutes)) {
                return Slot {
                    scheduled_at: at,
                    scheduled_text: anchor.to_string(),
                };
            }
        }
    }

    tracing::warn!(
        anchor_preference,
        "no free slot in {SEARCH_HORIZON_DAYS}-day horizon; falling back to preference without conflict check"
    );
    Slot {
        scheduled_at: resolve_anchor_on(anchor_preference, tz, search_start),
        scheduled_text: anchor_preference.to_string(),
    }
}

impl AnchorScheduler {
    /// Next slot for a task preferring `anchor_preference`'s part of the day.
    ///
    /// Without a reachable task store this returns "now + 1 day" labelled with
    /// the preference as given.
    pub async fn find_next_available_slot(
        &self,
        user_id: &str,
        anchor_preference: &str,
        estimated_minutes: i64,
        tz: Tz,
    ) -> Slot {
        let now = self.now().with_timezone(&tz);
        let unreachable_fallback = || Slot {
            scheduled_at: now + Duration::days(1),
            scheduled_text: anchor_preference.to_string(),
        };

        let Some(store) = &self.tasks else {
            return unreachable_fallback();
        };

        let existing = match store.query_tasks(user_id, &TaskQuery::all()).await {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "task store failed during slot search");
                return unreachable_fallback();
            }
        };

        let tomorrow = now.date_naive() + Days::new(1);
        search_slot(
            &Commitment::from_tasks(&existing, tz),
            anchor_preference,
            estimated_minutes,
            tz,
            tomorrow,
        )
    }
}
