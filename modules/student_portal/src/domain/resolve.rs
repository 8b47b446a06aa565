//! Email resolution over scanned rows.

use serde_json::Value;

use crate::domain::record::UserRecord;

/// Which profile field matched the requested email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    ProfileEmail,
    ContactsEmail,
    AccountEmail,
}

impl MatchReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchReason::ProfileEmail => "profile.email",
            MatchReason::ContactsEmail => "profile.contacts.email",
            MatchReason::AccountEmail => "profile.accountEmail",
        }
    }
}

/// Test one row. Checks run in a fixed order and the first hit wins.
pub fn match_email(record: &UserRecord, email: &str) -> Option<MatchReason> {
    let profile = record.profile()?;
    let is = |v: Option<&Value>| v.and_then(Value::as_str) == Some(email);

    if is(profile.get("email")) {
        return Some(MatchReason::ProfileEmail);
    }
    let contacts = profile.get("contacts").and_then(Value::as_object);
    if is(contacts.and_then(|c| c.get("email"))) {
        return Some(MatchReason::ContactsEmail);
    }
    if is(profile.get("accountEmail")) {
        return Some(MatchReason::AccountEmail);
    }
    None
}

/// Keep every row whose profile matches `email`, preserving scan order.
pub fn filter_by_email(records: Vec<UserRecord>, email: &str) -> Vec<UserRecord> {
    records
        .into_iter()
        .filter(|r| match match_email(r, email) {
            Some(reason) => {
                tracing::debug!(reason = reason.as_str(), user_id = %r.user_id(), "row matched email");
                true
            }
            None => false,
        })
        .collect()
}
