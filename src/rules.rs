use crate::task::{Rotation, Task};
use chrono::{Datelike, NaiveDate, Weekday};

/// Lowercase English name used to match against `Task::weekdays`.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "sunday",
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
    }
}

fn is_even_day(date: NaiveDate) -> bool {
    date.day() % 2 == 0
}

/// Decides whether `task` appears for `person` on `today`. Pure: the answer
/// only depends on the calendar date, so it is stable for a whole day.
///
/// Rules, first match wins:
/// 1. a weekday restriction that excludes today hides the task outright;
/// 2. an exclusive task is visible to its owner alone;
/// 3. an alternating task follows the rotation pair, even days for one role
///    and odd days for the other, and is hidden from everyone else (also
///    when no rotation is configured);
/// 4. everything else is visible to everyone.
pub fn should_show(
    task: &Task,
    person: &str,
    today: NaiveDate,
    rotation: Option<&Rotation>,
) -> bool {
    if !task.weekdays.is_empty() {
        // Unknown day names simply never equal today's name, so a list of
        // typos keeps the task hidden instead of erroring.
        let today_name = weekday_name(today.weekday());
        if !task.weekdays.iter().any(|d| d == today_name) {
            return false;
        }
    }

    if let Some(owner) = &task.exclusive {
        return owner == person;
    }

    if task.alternate {
        let Some(rotation) = rotation else {
            return false;
        };
        let even = is_even_day(today);
        return if person == rotation.even {
            even
        } else if person == rotation.odd {
            !even
        } else {
            false
        };
    }

    true
}
