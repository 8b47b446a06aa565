//! OpenAPI document for the portal endpoints.
//!
//! Component schemas come from `utoipa` derives; the operations are listed
//! in [`OPERATIONS`] and rendered into `paths` by hand.

use serde_json::{json, Map, Value};
use utoipa::OpenApi;

use crate::api::rest::dto::{
    BannerResponse, ComprehensiveResponse, DayScheduleResponse, ProfileResponse, ScheduleParams,
    ScheduleResponse, UserDataResponse, WeekScheduleResponse,
};
use crate::contract::model::{ClassEntry, DaySchedule, EmailAggregate, ScheduleSource, UserData};
use modkit::api::problem::{Problem, APPLICATION_PROBLEM_JSON};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Student Portal API",
        description = "Read-only access to student portal data keyed by email or user id"
    ),
    components(schemas(
        ClassEntry,
        DaySchedule,
        ScheduleSource,
        EmailAggregate,
        UserData,
        ProfileResponse,
        ScheduleParams,
        ScheduleResponse,
        DayScheduleResponse,
        WeekScheduleResponse,
        ComprehensiveResponse,
        UserDataResponse,
        BannerResponse,
        Problem
    ))
)]
pub struct ApiDoc;

/// A documented query parameter: name, required, description.
pub type ParamDoc = (&'static str, bool, &'static str);

pub struct OperationDoc {
    pub path: &'static str,
    pub operation_id: &'static str,
    pub summary: &'static str,
    pub tag: &'static str,
    pub params: &'static [ParamDoc],
    /// Component name of the 200 body; `None` for free-form objects.
    pub schema: Option<&'static str>,
    pub bad_request: bool,
    pub not_found: bool,
}

const KEY: &[ParamDoc] = &[
    ("email", false, "Student email; every matching row is merged"),
    ("uid", false, "Stored user_id; used when email is absent"),
];
const UID: &[ParamDoc] = &[("uid", true, "Stored user_id")];
const EMAIL: &[ParamDoc] = &[("email", true, "Student email")];
const SCHEDULE: &[ParamDoc] = &[
    ("email", true, "Student email"),
    ("week", false, "Week number matched against schedule_year entries"),
    ("group", false, "Echoed back in params"),
];

macro_rules! collection_op {
    ($path:literal, $id:literal, $summary:literal) => {
        OperationDoc {
            path: $path,
            operation_id: $id,
            summary: $summary,
            tag: "collections",
            params: KEY,
            schema: None,
            bad_request: true,
            not_found: true,
        }
    };
}

macro_rules! day_op {
    ($path:literal, $id:literal, $summary:literal) => {
        OperationDoc {
            path: $path,
            operation_id: $id,
            summary: $summary,
            tag: "schedule",
            params: UID,
            schema: Some("DayScheduleResponse"),
            bad_request: true,
            not_found: true,
        }
    };
}

pub const OPERATIONS: &[OperationDoc] = &[
    OperationDoc {
        path: "/",
        operation_id: "student_portal.banner",
        summary: "Service banner and endpoint list",
        tag: "meta",
        params: &[],
        schema: Some("BannerResponse"),
        bad_request: false,
        not_found: false,
    },
    collection_op!("/tasks", "student_portal.tasks", "Tasks for a student"),
    collection_op!("/marks", "student_portal.marks", "Marks for a student"),
    collection_op!("/reports", "student_portal.reports", "Reports for a student"),
    collection_op!("/materials", "student_portal.materials", "Materials for a student"),
    OperationDoc {
        path: "/profile",
        operation_id: "student_portal.profile",
        summary: "Most complete profile for a student",
        tag: "profile",
        params: KEY,
        schema: Some("ProfileResponse"),
        bad_request: true,
        not_found: true,
    },
    OperationDoc {
        path: "/schedule",
        operation_id: "student_portal.schedule",
        summary: "Most complete schedule across a student's rows",
        tag: "schedule",
        params: SCHEDULE,
        schema: Some("ScheduleResponse"),
        bad_request: true,
        not_found: false,
    },
    day_op!("/schedule/today", "student_portal.schedule_today", "Today's classes"),
    day_op!("/schedule/tomorrow", "student_portal.schedule_tomorrow", "Tomorrow's classes"),
    day_op!("/schedule/yesterday", "student_portal.schedule_yesterday", "Yesterday's classes"),
    OperationDoc {
        path: "/schedule/week",
        operation_id: "student_portal.schedule_week",
        summary: "Stored week schedule",
        tag: "schedule",
        params: UID,
        schema: Some("WeekScheduleResponse"),
        bad_request: true,
        not_found: true,
    },
    OperationDoc {
        path: "/users/comprehensive",
        operation_id: "student_portal.comprehensive",
        summary: "Everything known about an email",
        tag: "users",
        params: EMAIL,
        schema: Some("ComprehensiveResponse"),
        bad_request: true,
        not_found: false,
    },
    OperationDoc {
        path: "/users/data",
        operation_id: "student_portal.user_data",
        summary: "Everything stored under a user id, or {}",
        tag: "users",
        params: UID,
        schema: Some("UserDataResponse"),
        bad_request: true,
        not_found: false,
    },
];

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn operation(op: &OperationDoc) -> Value {
    let ok_schema = op
        .schema
        .map(schema_ref)
        .unwrap_or_else(|| json!({ "type": "object" }));

    let mut responses = Map::new();
    responses.insert(
        "200".into(),
        json!({
            "description": "OK",
            "content": { "application/json": { "schema": ok_schema } }
        }),
    );
    let problem = |desc: &str| {
        json!({
            "description": desc,
            "content": { (APPLICATION_PROBLEM_JSON): { "schema": schema_ref("Problem") } }
        })
    };
    if op.bad_request {
        responses.insert("400".into(), problem("Missing or invalid query parameter"));
    }
    if op.not_found {
        responses.insert("404".into(), problem("Unknown user id"));
    }

    let parameters: Vec<Value> = op
        .params
        .iter()
        .map(|(name, required, description)| {
            let ty = if *name == "week" { "integer" } else { "string" };
            json!({
                "name": name,
                "in": "query",
                "required": required,
                "description": description,
                "schema": { "type": ty }
            })
        })
        .collect();

    json!({
        "operationId": op.operation_id,
        "summary": op.summary,
        "tags": [op.tag],
        "parameters": parameters,
        "responses": responses,
    })
}

/// The full document, ready to serve as `/openapi.json`.
pub fn document() -> Value {
    let mut doc = serde_json::to_value(ApiDoc::openapi()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to render OpenAPI components");
        json!({ "openapi": "3.1.0", "info": { "title": "Student Portal API", "version": "0.1.0" } })
    });

    let mut paths = Map::new();
    for op in OPERATIONS {
        paths.insert(op.path.to_string(), json!({ "get": operation(op) }));
    }
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("paths".to_string(), Value::Object(paths));
    }
    doc
}
