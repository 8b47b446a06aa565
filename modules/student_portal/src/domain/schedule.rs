//! Day views projected out of a stored week schedule.

use chrono::{Datelike, Days, NaiveDate};
use serde_json::Value;

use crate::contract::model::{ClassEntry, DaySchedule, ScheduleSource};
use crate::domain::record::{FieldValue, UserRecord};

/// Short weekday names, Monday first.
pub const DAY_NAMES: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];

fn text(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Flatten one stored class into the fixed nine-field shape.
pub fn normalize_class(raw: &Value) -> ClassEntry {
    let get = |k: &str| text(raw.get(k));
    ClassEntry {
        kind: get("type"),
        group: get("group"),
        subject: get("subject"),
        teacher: get("teacher"),
        building: get("building"),
        location: get("location"),
        time_range: get("timeRange"),
        pair_number: get("pairNumber"),
        teacher_info: get("teacherInfo"),
    }
}

fn normalize_classes(raw: Option<&Value>) -> Vec<ClassEntry> {
    FieldValue::from_raw(raw)
        .items()
        .iter()
        .map(normalize_class)
        .collect()
}

fn shift(today: NaiveDate, offset: i64) -> NaiveDate {
    let days = Days::new(offset.unsigned_abs());
    let shifted = if offset >= 0 {
        today.checked_add_days(days)
    } else {
        today.checked_sub_days(days)
    };
    shifted.unwrap_or(today)
}

/// Date fields for `today + offset` with no classes.
pub fn base_day(today: NaiveDate, offset: i64) -> DaySchedule {
    let target = shift(today, offset);
    let idx = target.weekday().num_days_from_monday() as usize;
    DaySchedule {
        date: target.format("%Y-%m-%d").to_string(),
        date_dd_mm: target.format("%d.%m").to_string(),
        day_name: DAY_NAMES[idx].to_string(),
        day_of_week: idx as u8,
        schedule: Vec::new(),
        has_schedule: false,
        order: None,
        full_date: None,
        source: ScheduleSource::None,
    }
}

/// `days` of a week schedule, in either the flat or the wrapped
/// `{schedule: {days}}` layout.
pub fn week_days(week_schedule: Option<&Value>) -> Option<&Vec<Value>> {
    let ws = week_schedule?.as_object()?;
    ws.get("days").and_then(Value::as_array).or_else(|| {
        ws.get("schedule")
            .and_then(|s| s.get("days"))
            .and_then(Value::as_array)
    })
}

fn present(v: Option<&Value>) -> Option<Value> {
    v.filter(|v| !v.is_null()).cloned()
}

/// Project the day `today + offset` out of a week schedule.
///
/// The first `days` entry whose `date` equals the target `dd.mm` supplies the
/// classes. Missing or malformed input yields the bare date fields.
pub fn project_day(week_schedule: Option<&Value>, offset: i64, today: NaiveDate) -> DaySchedule {
    let mut day = base_day(today, offset);
    let Some(days) = week_days(week_schedule) else {
        return day;
    };
    let Some(entry) = days
        .iter()
        .find(|d| d.get("date").and_then(Value::as_str) == Some(day.date_dd_mm.as_str()))
    else {
        return day;
    };

    day.schedule = normalize_classes(entry.get("classes"));
    day.has_schedule = !day.schedule.is_empty();
    day.order = present(entry.get("order"));
    day.full_date = present(entry.get("fullDate"));
    day.source = ScheduleSource::WeekSchedule;
    day
}

/// Day view for one stored row.
///
/// For the current day a `today_schedule` list on the row is authoritative,
/// even when empty; every other case projects from `week_schedule`.
pub fn project_for_record(record: &UserRecord, offset: i64, today: NaiveDate) -> DaySchedule {
    if offset == 0 {
        if let Some(classes) = record.get("today_schedule").filter(|v| v.is_array()) {
            let mut day = base_day(today, 0);
            day.schedule = normalize_classes(Some(classes));
            day.has_schedule = !day.schedule.is_empty();
            day.source = ScheduleSource::TodaySchedule;
            return day;
        }
    }
    project_day(record.get("week_schedule"), offset, today)
}
