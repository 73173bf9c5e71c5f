use chrono::{Datelike, NaiveDate};

use crate::models::{Employee, EmployeeState, EmployeeStats, MonthlyHires, Role, RoleCount};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}

/// The twelve (year, month) pairs ending with the month of `today`, oldest first.
fn last_twelve_months(today: NaiveDate) -> Vec<(i32, u32)> {
    let mut year = today.year();
    let mut month = today.month();
    let mut months = Vec::with_capacity(12);

    for _ in 0..12 {
        months.push((year, month));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }

    months.reverse();
    months
}

pub fn compute_stats(employees: &[Employee], today: NaiveDate) -> EmployeeStats {
    let total = employees.len();
    let count_state = |state: EmployeeState| employees.iter().filter(|e| e.state == state).count();

    let active = count_state(EmployeeState::Active);

    let roles = Role::all()
        .into_iter()
        .map(|role| {
            let count = employees.iter().filter(|e| e.role == role).count();
            RoleCount {
                role,
                label: role.label().to_string(),
                count,
                percent: percent(count, total),
            }
        })
        .collect();

    let hires_by_month = last_twelve_months(today)
        .into_iter()
        .map(|(year, month)| MonthlyHires {
            month: format!("{:04}-{:02}", year, month),
            label: format!("{} {}", MONTH_LABELS[(month - 1) as usize], year),
            count: employees
                .iter()
                .filter(|e| e.hire_date.year() == year && e.hire_date.month() == month)
                .count(),
        })
        .collect();

    EmployeeStats {
        total,
        active,
        inactive: count_state(EmployeeState::Inactive),
        on_leave: count_state(EmployeeState::OnLeave),
        suspended: count_state(EmployeeState::Suspended),
        active_percent: percent(active, total),
        roles,
        hires_by_month,
    }
}
