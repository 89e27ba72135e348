use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use crate::models::{Recurrence, RecurrenceUnit, Task};

/// Computes the due date of the next occurrence of a recurring task.
///
/// | recurrence | step |
/// |---|---|
/// | daily | 1 day |
/// | weekly | 7 days |
/// | monthly | 1 calendar month |
/// | yearly | 12 calendar months |
/// | custom | `recurrence_interval` days, weeks (×7 days) or months |
///
/// Month steps keep the day-of-month and roll any overflow into the following
/// month, so January 31st plus one month lands on March 3rd (March 2nd in leap years).
///
/// # Returns
/// - `None` if the task has no due date, does not recur, or the result is out of range.
///   Huge custom intervals land here instead of overflowing.
pub fn next_due_date(task: &Task) -> Option<NaiveDateTime> {
    let due = task.due_date?;
    match task.recurrence {
        Recurrence::None => None,
        Recurrence::Daily => add_days(due, 1),
        Recurrence::Weekly => add_days(due, 7),
        Recurrence::Monthly => add_months(due, 1),
        Recurrence::Yearly => add_months(due, 12),
        Recurrence::Custom => {
            let n = task.recurrence_interval.max(1);
            match task.recurrence_unit {
                RecurrenceUnit::Days => add_days(due, i64::from(n)),
                RecurrenceUnit::Weeks => add_days(due, i64::from(n).checked_mul(7)?),
                RecurrenceUnit::Months => add_months(due, n),
            }
        }
    }
}

fn add_days(at: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    at.checked_add_signed(Duration::try_days(days)?)
}

fn add_months(at: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    let total = at
        .year()
        .checked_mul(12)?
        .checked_add(at.month0() as i32)?
        .checked_add(i32::try_from(months).ok()?)?;
    let first = NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)?;
    let day = first.checked_add_signed(Duration::try_days(i64::from(at.day()) - 1)?)?;
    Some(day.and_time(at.time()))
}
