use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::domain::{Actor, Application, AuditAction, AuditEntry, RequestContext};

/// Append one immutable entry to the application's audit trail.
///
/// The trail is strictly append-only: no update or delete surface exists,
/// and callers must run every permission and legality check before invoking
/// this so a rejected action never reaches the trail. Appending also stamps
/// `updated_at`, which every durable mutation routes through.
pub fn record(
    application: &mut Application,
    action: AuditAction,
    actor: &Actor,
    details: BTreeMap<String, String>,
    request: Option<RequestContext>,
    now: DateTime<Utc>,
) {
    application.audit_trail.push(AuditEntry {
        action,
        performed_by: actor.id.clone(),
        timestamp: now,
        details,
        request,
    });
    application.updated_at = now;
}

/// Convenience for the common single-pair details map.
pub fn detail(key: &str, value: impl Into<String>) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    details.insert(key.to_owned(), value.into());
    details
}

/// Details map for a status change.
pub fn status_change(from: &str, to: &str) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    details.insert("from".to_owned(), from.to_owned());
    details.insert("to".to_owned(), to.to_owned());
    details
}
