//! Execution metrics over a user's tasks.

use serde::{Deserialize, Serialize};

use crate::task::TaskRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionMetrics {
    /// Percent of all tasks completed.
    pub completion_rate: f64,
    /// Percent of completed tasks finished on their scheduled date.
    pub on_time_rate: f64,
    /// Percent of rescheduled tasks that were eventually completed.
    pub reschedule_success_rate: f64,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub rescheduled_tasks: usize,
}

pub fn completion_metrics(tasks: &[TaskRecord]) -> CompletionMetrics {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.is_completed()).count();
    let on_time = tasks
        .iter()
        .filter(|t| t.is_completed() && t.completed_on_time)
        .count();
    let rescheduled = tasks.iter().filter(|t| t.was_rescheduled).count();
    let rescheduled_completed = tasks
        .iter()
        .filter(|t| t.was_rescheduled && t.is_completed())
        .count();

    CompletionMetrics {
        completion_rate: percent(completed, total),
        on_time_rate: percent(on_time, completed),
        reschedule_success_rate: percent(rescheduled_completed, rescheduled),
        total_tasks: total,
        completed_tasks: completed,
        rescheduled_tasks: rescheduled,
    }
}

/// Percentage rounded to one decimal; 0 for an empty denominator.
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    #[test]
    fn empty_is_all_zero() {
        assert_eq!(completion_metrics(&[]), CompletionMetrics::default());
    }

    #[test]
    fn rates_round_to_one_decimal() {
        let mut done_on_time = TaskRecord::new("a", "u").with_status(TaskStatus::Completed);
        done_on_time.completed_on_time = true;
        let mut moved_done = TaskRecord::new("b", "u").with_status(TaskStatus::Completed);
        moved_done.was_rescheduled = true;
        let mut moved_open = TaskRecord::new("c", "u");
        moved_open.was_rescheduled = true;

        let m = completion_metrics(&[done_on_time, moved_done, moved_open]);
        assert_eq!(m.total_tasks, 3);
        assert_eq!(m.completed_tasks, 2);
        assert_eq!(m.rescheduled_tasks, 2);
        assert_eq!(m.completion_rate, 66.7);
        assert_eq!(m.on_time_rate, 50.0);
        assert_eq!(m.reschedule_success_rate, 50.0);
    }
}
