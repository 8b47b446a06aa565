use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::contract::model::{
    Collection, DaySchedule, EmailAggregate, JsonObject, UserData, UserKey,
};

/// `?email=` or `?uid=`; email wins when both are given.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct KeyQuery {
    /// Student email, matched against every stored profile
    pub email: Option<String>,
    /// Stored `user_id`
    pub uid: Option<String>,
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref().filter(|s| !s.is_empty()).map(str::to_owned)
}

impl KeyQuery {
    pub fn key(&self) -> Option<UserKey> {
        non_empty(&self.email)
            .map(UserKey::Email)
            .or_else(|| non_empty(&self.uid).map(UserKey::Uid))
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UidQuery {
    /// Stored `user_id`
    pub uid: Option<String>,
}

impl UidQuery {
    pub fn uid(&self) -> Option<String> {
        non_empty(&self.uid)
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailQuery {
    /// Student email
    pub email: Option<String>,
}

impl EmailQuery {
    pub fn email(&self) -> Option<String> {
        non_empty(&self.email)
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleQuery {
    /// Student email
    pub email: Option<String>,
    /// Week number; matching `schedule_year` entries compete with `schedule`
    pub week: Option<i64>,
    /// Echoed back, not used for selection
    pub group: Option<String>,
}

/// `{success, <field>, <field>_count, user_email | user_id}`
#[derive(Debug, Clone)]
pub struct CollectionResponse {
    pub kind: Collection,
    pub items: Vec<Value>,
    pub key: UserKey,
}

impl Serialize for CollectionResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let field = self.kind.field();
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("success", &true)?;
        map.serialize_entry(field, &self.items)?;
        map.serialize_entry(&format!("{field}_count"), &self.items.len())?;
        match &self.key {
            UserKey::Email(email) => map.serialize_entry("user_email", email)?,
            UserKey::Uid(uid) => map.serialize_entry("user_id", uid)?,
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub profile: JsonObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ProfileResponse {
    pub fn new(profile: JsonObject, key: UserKey) -> Self {
        let (user_email, user_id) = match key {
            UserKey::Email(e) => (Some(e), None),
            UserKey::Uid(u) => (None, Some(u)),
        };
        Self {
            success: true,
            profile,
            user_email,
            user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleParams {
    pub week: Option<i64>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub schedule: JsonObject,
    pub user_email: String,
    pub params: ScheduleParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DayScheduleResponse {
    pub success: bool,
    pub schedule: DaySchedule,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeekScheduleResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub schedule: Value,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComprehensiveResponse {
    pub success: bool,
    #[serde(flatten)]
    pub data: EmailAggregate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDataResponse {
    pub success: bool,
    #[serde(flatten)]
    pub data: UserData,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BannerResponse {
    pub message: String,
    pub database: String,
    pub endpoints: Vec<String>,
}
