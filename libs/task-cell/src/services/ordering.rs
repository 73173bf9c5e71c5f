// Pure rules behind the task board: manual ordering, notification window
// and collaborator eligibility.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use employee_cell::{Employee, Role};

use crate::models::{Task, TaskError, TaskStatus};

/// Computes the new `sort_order` of every task in `owned`.
///
/// Submitted ids get 1..=N in the given order. Omitted tasks follow at N+1,
/// N+2, ... keeping their current (sort_order, due_date) order.
pub fn reorder_plan(owned: &[Task], order: &[Uuid]) -> Result<Vec<(Uuid, u32)>, TaskError> {
    let owned_ids: HashSet<Uuid> = owned.iter().map(|t| t.id).collect();

    let mut seen = HashSet::new();
    for id in order {
        if !owned_ids.contains(id) {
            return Err(TaskError::InvalidOrder(format!("task {} is not yours", id)));
        }
        if !seen.insert(*id) {
            return Err(TaskError::InvalidOrder(format!("task {} is listed twice", id)));
        }
    }

    let mut plan: Vec<(Uuid, u32)> = order
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index as u32 + 1))
        .collect();

    let mut remaining: Vec<&Task> = owned.iter().filter(|t| !seen.contains(&t.id)).collect();
    remaining.sort_by_key(|t| (t.sort_order, t.due_date));

    let last = order.len() as u32;
    plan.extend(
        remaining
            .iter()
            .enumerate()
            .map(|(offset, task)| (task.id, last + offset as u32 + 1)),
    );

    Ok(plan)
}

/// Pending tasks due within their own notification interval, rounded up to whole days.
pub fn notification_window(tasks: &[Task], today: NaiveDate, enabled: bool) -> Vec<Task> {
    if !enabled {
        return Vec::new();
    }

    tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .filter(|t| {
            let days = t.notify_interval_hours.div_ceil(24) as i64;
            t.due_date <= today + Duration::days(days)
        })
        .cloned()
        .collect()
}

/// Keeps the doctors and nurses among `candidates`, never the owner.
pub fn retain_collaborators(candidates: &[Employee], owner_id: Uuid) -> Vec<Uuid> {
    candidates
        .iter()
        .filter(|e| e.id != owner_id)
        .filter(|e| matches!(e.role, Role::Doctor | Role::Nurse))
        .map(|e| e.id)
        .collect()
}
