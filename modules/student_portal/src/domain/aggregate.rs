//! Merging collections across rows and picking the most complete
//! profile or schedule.

use std::collections::HashSet;
use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;

use crate::contract::model::JsonObject;
use crate::domain::record::UserRecord;

/// Content identity of an item.
///
/// A bare string is keyed by its raw text, any other value by its JSON text.
/// `serde_json::Map` is ordered by key here (no `preserve_order`), so object
/// key order never matters.
pub fn content_key(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Drop exact-content repeats, keeping the first occurrence.
pub fn dedup<I>(items: I) -> Vec<Value>
where
    I: IntoIterator<Item = Value>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(content_key(item)))
        .collect()
}

/// Concatenate `field` across rows (row order, then item order) and dedup.
pub fn collect(records: &[UserRecord], field: &str) -> Vec<Value> {
    dedup(
        records
            .iter()
            .flat_map(|r| r.field(field).items().iter().cloned()),
    )
}

/// JSON with `", "` between items and `": "` after keys.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Length in characters of the spaced rendering (`{"a": 1, "b": [1, 2]}`).
pub fn completeness(obj: &JsonObject) -> usize {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, SpacedFormatter);
    if obj.serialize(&mut ser).is_err() {
        return 0;
    }
    String::from_utf8_lossy(&buf).chars().count()
}

/// Tracks the longest candidate seen so far; ties keep the earlier one.
#[derive(Default)]
struct Longest<'a> {
    best: Option<(&'a JsonObject, usize)>,
}

impl<'a> Longest<'a> {
    fn offer(&mut self, candidate: &'a JsonObject) -> bool {
        if candidate.is_empty() {
            return false;
        }
        let score = completeness(candidate);
        match self.best {
            Some((_, best)) if score <= best => false,
            _ => {
                self.best = Some((candidate, score));
                true
            }
        }
    }

    fn into_object(self) -> JsonObject {
        self.best.map(|(obj, _)| obj.clone()).unwrap_or_default()
    }
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        _ => false,
    }
}

/// Most complete non-empty profile across rows, `{}` when none.
///
/// When rows exist and the winner has no usable `user_id`, the first row's
/// `user_id` is filled in.
pub fn select_best_profile(records: &[UserRecord]) -> JsonObject {
    let mut longest = Longest::default();
    for r in records {
        if let Some(p) = r.profile() {
            longest.offer(p);
        }
    }
    let mut profile = longest.into_object();

    if let Some(first) = records.first() {
        if is_blank(profile.get("user_id")) {
            profile.insert("user_id".to_string(), first.user_id());
        }
    }
    profile
}

/// Most complete schedule across rows.
///
/// With a non-zero `week`, entries of each row's `schedule_year` whose own
/// `week` equals it compete as well, right after that row's `schedule`.
/// A stored `week` of `44.0` matches `44`.
pub fn select_best_schedule(records: &[UserRecord], week: Option<i64>) -> JsonObject {
    let week = week.filter(|w| *w != 0);
    let mut longest = Longest::default();

    for r in records {
        if let Some(s) = r.get("schedule").and_then(Value::as_object) {
            longest.offer(s);
        }

        let Some(week) = week else { continue };
        let Some(year) = r.get("schedule_year").and_then(Value::as_object) else {
            continue;
        };
        for (key, entry) in year {
            let Some(ws) = entry.as_object() else { continue };
            let matches = ws.get("week").and_then(Value::as_f64) == Some(week as f64);
            if matches && longest.offer(ws) {
                tracing::debug!(week, week_key = %key, "schedule_year entry selected");
            }
        }
    }
    longest.into_object()
}

/// Greatest non-empty `updated_at`, compared as strings.
pub fn last_updated(records: &[UserRecord]) -> Option<String> {
    records
        .iter()
        .filter_map(UserRecord::updated_at)
        .max()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(vs: Vec<Value>) -> Vec<UserRecord> {
        vs.into_iter()
            .map(|v| UserRecord::from_value(v).unwrap())
            .collect()
    }

    #[test]
    fn key_ignores_object_key_order_at_any_depth() {
        let a = json!({"id": 1, "meta": {"x": 1, "y": [{"b": 2, "a": 1}]}});
        let b = json!({"meta": {"y": [{"a": 1, "b": 2}], "x": 1}, "id": 1});
        assert_eq!(content_key(&a), content_key(&b));
    }

    #[test]
    fn key_uses_direct_string_form_for_scalars() {
        assert_eq!(content_key(&json!("Math")), "Math");
        assert_eq!(content_key(&json!(5)), "5");
        assert_eq!(content_key(&json!(null)), "null");
        assert_ne!(content_key(&json!({"a": "1"})), content_key(&json!({"a": 1})));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let a = json!({"id": 1, "title": "Lab"});
        let b = json!({"id": 2});
        let a2 = json!({"title": "Lab", "id": 1});
        let out = dedup(vec![a.clone(), b.clone(), a2]);
        assert_eq!(out, vec![a, b]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let items = vec![
            json!({"id": 1}),
            json!("x"),
            json!({"id": 1}),
            json!([1, 2]),
            json!("x"),
            json!({"id": 2}),
        ];
        let once = dedup(items);
        let twice = dedup(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 4);
    }

    #[test]
    fn dedup_is_exact_content_only() {
        let out = dedup(vec![
            json!({"id": 1, "status": "open"}),
            json!({"id": 1, "status": "done"}),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn collect_merges_rows_in_order() {
        let records = rows(vec![
            json!({"tasks": [{"id": 1}]}),
            json!({"tasks": null}),
            json!({"tasks": {"id": 3}}),
            json!({"tasks": [{"id": 1}, {"id": 2}]}),
        ]);
        assert_eq!(
            collect(&records, "tasks"),
            vec![json!({"id": 1}), json!({"id": 3}), json!({"id": 2})]
        );
        assert!(collect(&records, "marks").is_empty());
        assert!(collect(&[], "tasks").is_empty());
    }

    #[test]
    fn longest_profile_wins() {
        let records = rows(vec![
            json!({"user_id": "u1", "profile": {"a": 1}}),
            json!({"user_id": "u2", "profile": {"a": 1, "b": 2}}),
        ]);
        let p = select_best_profile(&records);
        assert_eq!(p.get("a"), Some(&json!(1)));
        assert_eq!(p.get("b"), Some(&json!(2)));
        // injected from the first row, not the winning one
        assert_eq!(p.get("user_id"), Some(&json!("u1")));
    }

    #[test]
    fn completeness_counts_separators() {
        let obj = |v: Value| v.as_object().cloned().unwrap();
        assert_eq!(completeness(&obj(json!({"a": "xxxxxx"}))), 15);
        assert_eq!(completeness(&obj(json!({"a": 1, "b": 22}))), 17);
        assert_eq!(completeness(&obj(json!({"d": [1, 2], "e": {}}))), 22);
        assert_eq!(completeness(&JsonObject::new()), 2);
    }

    #[test]
    fn wider_profile_beats_equal_compact_length() {
        // both are 14 characters in compact JSON
        let records = rows(vec![
            json!({"user_id": "u1", "profile": {"a": "xxxxxx"}}),
            json!({"user_id": "u2", "profile": {"a": 1, "b": 22}}),
        ]);
        let p = select_best_profile(&records);
        assert_eq!(p.get("b"), Some(&json!(22)));
        assert_eq!(p.get("user_id"), Some(&json!("u1")));
    }

    #[test]
    fn profile_tie_keeps_first_seen() {
        let records = rows(vec![
            json!({"profile": {"a": 1, "user_id": "x"}}),
            json!({"profile": {"b": 2, "user_id": "y"}}),
        ]);
        assert_eq!(select_best_profile(&records).get("a"), Some(&json!(1)));
    }

    #[test]
    fn existing_user_id_is_kept() {
        let records = rows(vec![
            json!({"user_id": "row", "profile": {"user_id": "own"}}),
        ]);
        assert_eq!(select_best_profile(&records).get("user_id"), Some(&json!("own")));

        for empty in [json!(""), json!([]), json!({}), json!(0), json!(false)] {
            let blank = rows(vec![json!({"user_id": "row", "profile": {"user_id": empty}})]);
            assert_eq!(select_best_profile(&blank).get("user_id"), Some(&json!("row")));
        }
    }

    #[test]
    fn profile_without_candidates() {
        assert!(select_best_profile(&[]).is_empty());

        let records = rows(vec![json!({"user_id": "u1", "profile": "broken"})]);
        let p = select_best_profile(&records);
        assert_eq!(p.len(), 1);
        assert_eq!(p.get("user_id"), Some(&json!("u1")));
    }

    #[test]
    fn schedule_prefers_longest_and_week_entries_compete() {
        let records = rows(vec![
            json!({"schedule": {"days": []}}),
            json!({
                "schedule": {"days": [1]},
                "schedule_year": {
                    "w44": {"week": 44, "days": [{"date": "27.10", "classes": []}]},
                    "w45": {"week": 45, "days": [{"date": "03.11", "classes": [{"subject": "Math"}]}]}
                }
            }),
        ]);

        assert_eq!(select_best_schedule(&records, None), json!({"days": [1]}).as_object().cloned().unwrap());

        let w44 = select_best_schedule(&records, Some(44));
        assert_eq!(w44.get("week"), Some(&json!(44)));

        let w0 = select_best_schedule(&records, Some(0));
        assert_eq!(w0.get("week"), None);

        let unknown = select_best_schedule(&records, Some(99));
        assert_eq!(unknown.get("days"), Some(&json!([1])));
    }

    #[test]
    fn fractional_week_number_matches() {
        let records = rows(vec![json!({
            "schedule": {},
            "schedule_year": {"w44": {"week": 44.0, "days": []}}
        })]);
        assert_eq!(
            select_best_schedule(&records, Some(44)).get("week"),
            Some(&json!(44.0))
        );
        assert!(select_best_schedule(&records, Some(45)).is_empty());
    }

    #[test]
    fn schedule_ignores_non_objects() {
        let records = rows(vec![json!({"schedule": [1, 2, 3]}), json!({"schedule": {}})]);
        assert!(select_best_schedule(&records, None).is_empty());
    }

    #[test]
    fn last_updated_is_max_or_none() {
        let records = rows(vec![
            json!({"updated_at": "2025-10-01T10:00:00"}),
            json!({}),
            json!({"updated_at": "2025-11-02T08:00:00"}),
        ]);
        assert_eq!(last_updated(&records).as_deref(), Some("2025-11-02T08:00:00"));
        assert_eq!(last_updated(&rows(vec![json!({}), json!({"updated_at": ""})])), None);
    }
}
