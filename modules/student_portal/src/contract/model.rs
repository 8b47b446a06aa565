use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Free-form JSON object as stored upstream.
pub type JsonObject = Map<String, Value>;

/// How a caller identifies a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    /// Every row whose profile carries this address.
    Email(String),
    /// The single row stored under this `user_id`.
    Uid(String),
}

/// Sequence-valued row fields that are merged across rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Tasks,
    Marks,
    Reports,
    Materials,
    ExtraClasses,
}

impl Collection {
    pub const fn field(self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Marks => "marks",
            Collection::Reports => "reports",
            Collection::Materials => "materials",
            Collection::ExtraClasses => "extra_classes",
        }
    }
}

/// One class in a day, flattened to string fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClassEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub group: String,
    pub subject: String,
    pub teacher: String,
    pub building: String,
    pub location: String,
    #[serde(rename = "timeRange")]
    pub time_range: String,
    #[serde(rename = "pairNumber")]
    pub pair_number: String,
    #[serde(rename = "teacherInfo")]
    pub teacher_info: String,
}

/// Where a day's classes were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleSource {
    WeekSchedule,
    TodaySchedule,
    None,
}

/// Classes for a single calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DaySchedule {
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    /// `dd.mm`, the key used by stored week schedules.
    pub date_dd_mm: String,
    pub day_name: String,
    /// 0 = Monday.
    pub day_of_week: u8,
    pub schedule: Vec<ClassEntry>,
    pub has_schedule: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub order: Option<Value>,
    #[serde(
        rename = "fullDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<Object>)]
    pub full_date: Option<Value>,
    pub source: ScheduleSource,
}

/// Everything known about one email, merged across all matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmailAggregate {
    pub email: String,
    pub total_records: usize,
    #[schema(value_type = Object)]
    pub profile: JsonObject,
    #[schema(value_type = Vec<Object>)]
    pub tasks: Vec<Value>,
    #[schema(value_type = Object)]
    pub schedule: JsonObject,
    #[schema(value_type = Vec<Object>)]
    pub marks: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub reports: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub materials: Vec<Value>,
    /// `user_id` of each matching row, in row order.
    #[schema(value_type = Vec<Object>)]
    pub user_ids: Vec<Value>,
    /// Greatest `updated_at` among matching rows; `None` when no row has one.
    pub last_updated: Option<String>,
}

impl EmailAggregate {
    pub fn empty(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            total_records: 0,
            profile: JsonObject::new(),
            tasks: Vec::new(),
            schedule: JsonObject::new(),
            marks: Vec::new(),
            reports: Vec::new(),
            materials: Vec::new(),
            user_ids: Vec::new(),
            last_updated: None,
        }
    }
}

/// All data stored under one `user_id`, plus derived day views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserData {
    pub user_id: String,
    #[schema(value_type = Object)]
    pub profile: JsonObject,
    #[schema(value_type = Vec<Object>)]
    pub tasks: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub marks: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub reports: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub materials: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub extra_classes: Vec<Value>,
    /// The stored week schedule, `{}` when missing.
    #[schema(value_type = Object)]
    pub schedule: Value,
    pub today_schedule: DaySchedule,
    pub tomorrow_schedule: DaySchedule,
    pub yesterday_schedule: DaySchedule,
    #[schema(value_type = Option<Object>)]
    pub updated_at: Value,
}
