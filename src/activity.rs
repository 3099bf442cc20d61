//! Renders activity-log records into display fragments.
//!
//! Activity records are a tagged union: `kind` selects the shape of the
//! `metadata` JSON payload. Each known kind maps to a sequence of fragments
//! mixing plain text with clickable references (user, task, company,
//! report). Unknown kinds, and known kinds with missing metadata, fall back
//! to the record's raw description string.

use serde_json::Value;

use crate::backend::types::ActivityRecord;

/// One piece of a rendered activity description.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
  /// Plain text
  Text(String),
  /// Clickable reference to a user profile
  User { id: String, name: String },
  /// Clickable reference to a task
  Task { id: String, title: String },
  /// Clickable reference to a company
  Company { id: String, name: String },
  /// Clickable reference to an incident report
  Report { id: String, title: String },
}

impl Fragment {
  fn text(s: impl Into<String>) -> Self {
    Fragment::Text(s.into())
  }

  /// Deep link this fragment navigates to, if it is a reference.
  pub fn deep_link(&self) -> Option<String> {
    let (kind, id) = match self {
      Fragment::Text(_) => return None,
      Fragment::User { id, .. } => ("employee", id),
      Fragment::Task { id, .. } => ("task", id),
      Fragment::Company { id, .. } => ("company", id),
      Fragment::Report { id, .. } => ("report", id),
    };
    Some(format!("hrdesk://{}/{}", kind, id))
  }
}

/// Render a record into display fragments.
pub fn describe(record: &ActivityRecord) -> Vec<Fragment> {
  match fragments_for(record) {
    Some(fragments) => fragments,
    None => fallback(record),
  }
}

/// Flatten fragments into plain text (for logs and the CLI).
pub fn to_plain_text(fragments: &[Fragment]) -> String {
  fragments
    .iter()
    .map(|f| match f {
      Fragment::Text(s) => s.as_str(),
      Fragment::User { name, .. } => name.as_str(),
      Fragment::Task { title, .. } => title.as_str(),
      Fragment::Company { name, .. } => name.as_str(),
      Fragment::Report { title, .. } => title.as_str(),
    })
    .collect::<Vec<_>>()
    .join("")
}

/// Kind-specific rendering. Returns None when the kind is unknown or its
/// metadata is missing required fields, which triggers the fallback.
fn fragments_for(record: &ActivityRecord) -> Option<Vec<Fragment>> {
  let meta = &record.metadata;
  let actor = actor_fragment(record);

  let fragments = match record.kind.as_str() {
    "company_created" => vec![
      actor,
      Fragment::text(" created company "),
      company_ref(meta)?,
    ],
    "company_updated" => vec![
      actor,
      Fragment::text(" updated company "),
      company_ref(meta)?,
    ],
    "employee_added" => vec![actor, Fragment::text(" added "), user_ref(meta)?],
    "employee_updated" => {
      vec![actor, Fragment::text(" updated the profile of "), user_ref(meta)?]
    }
    "employee_archived" => vec![actor, Fragment::text(" archived "), user_ref(meta)?],
    "employee_invited" => vec![actor, Fragment::text(" invited "), user_ref(meta)?],
    "employee_role_changed" => vec![
      actor,
      Fragment::text(" changed the role of "),
      user_ref(meta)?,
      Fragment::text(format!(
        " from {} to {}",
        meta_str(meta, "old_role")?,
        meta_str(meta, "new_role")?
      )),
    ],
    "task_created" => vec![actor, Fragment::text(" created task "), task_ref(meta)?],
    "task_assigned" => vec![
      actor,
      Fragment::text(" assigned "),
      task_ref(meta)?,
      Fragment::text(" to "),
      user_ref(meta)?,
    ],
    "task_status_changed" => vec![
      actor,
      Fragment::text(" moved "),
      task_ref(meta)?,
      Fragment::text(format!(
        " from {} to {}",
        meta_str(meta, "old_status")?,
        meta_str(meta, "new_status")?
      )),
    ],
    "task_completed" => vec![actor, Fragment::text(" completed "), task_ref(meta)?],
    "task_deleted" => vec![
      actor,
      Fragment::text(format!(" deleted task {}", meta_str(meta, "task_title")?)),
    ],
    "task_comment_added" => vec![actor, Fragment::text(" commented on "), task_ref(meta)?],
    "report_filed" => vec![actor, Fragment::text(" filed report "), report_ref(meta)?],
    "report_status_changed" => vec![
      actor,
      Fragment::text(" moved report "),
      report_ref(meta)?,
      Fragment::text(format!(
        " from {} to {}",
        meta_str(meta, "old_status")?,
        meta_str(meta, "new_status")?
      )),
    ],
    "report_resolved" => vec![actor, Fragment::text(" resolved report "), report_ref(meta)?],
    "receipt_uploaded" => vec![
      actor,
      Fragment::text(format!(
        " uploaded a receipt ({})",
        meta_str(meta, "receipt_label")?
      )),
    ],
    "receipt_approved" => vec![
      actor,
      Fragment::text(" approved a receipt from "),
      user_ref(meta)?,
    ],
    "receipt_rejected" => vec![
      actor,
      Fragment::text(" rejected a receipt from "),
      user_ref(meta)?,
    ],
    "password_reset_requested" => {
      vec![actor, Fragment::text(" requested a password reset")]
    }
    _ => return None,
  };

  Some(fragments)
}

fn fallback(record: &ActivityRecord) -> Vec<Fragment> {
  let text = record
    .description
    .clone()
    .unwrap_or_else(|| record.kind.replace('_', " "));
  vec![Fragment::Text(text)]
}

fn actor_fragment(record: &ActivityRecord) -> Fragment {
  match (&record.actor_id, &record.actor_name) {
    (Some(id), Some(name)) => Fragment::User {
      id: id.clone(),
      name: name.clone(),
    },
    _ => Fragment::text("Someone"),
  }
}

fn user_ref(meta: &Value) -> Option<Fragment> {
  Some(Fragment::User {
    id: meta_str(meta, "user_id")?.to_string(),
    name: meta_str(meta, "user_name")?.to_string(),
  })
}

fn task_ref(meta: &Value) -> Option<Fragment> {
  Some(Fragment::Task {
    id: meta_str(meta, "task_id")?.to_string(),
    title: meta_str(meta, "task_title")?.to_string(),
  })
}

fn company_ref(meta: &Value) -> Option<Fragment> {
  Some(Fragment::Company {
    id: meta_str(meta, "company_id")?.to_string(),
    name: meta_str(meta, "company_name")?.to_string(),
  })
}

fn report_ref(meta: &Value) -> Option<Fragment> {
  Some(Fragment::Report {
    id: meta_str(meta, "report_id")?.to_string(),
    title: meta_str(meta, "report_title")?.to_string(),
  })
}

fn meta_str<'a>(meta: &'a Value, field: &str) -> Option<&'a str> {
  meta.get(field)?.as_str()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn record(kind: &str, metadata: Value) -> ActivityRecord {
    ActivityRecord {
      id: "a1".to_string(),
      company_id: "c1".to_string(),
      actor_id: Some("u1".to_string()),
      actor_name: Some("Ann".to_string()),
      kind: kind.to_string(),
      description: Some("raw description".to_string()),
      metadata,
      created_at: "2026-02-03T10:00:00Z".to_string(),
    }
  }

  #[test]
  fn test_task_assigned_renders_clickable_refs() {
    let rec = record(
      "task_assigned",
      json!({
        "task_id": "t1", "task_title": "Order badges",
        "user_id": "u2", "user_name": "Bob"
      }),
    );

    let fragments = describe(&rec);
    assert_eq!(
      fragments,
      vec![
        Fragment::User {
          id: "u1".to_string(),
          name: "Ann".to_string()
        },
        Fragment::Text(" assigned ".to_string()),
        Fragment::Task {
          id: "t1".to_string(),
          title: "Order badges".to_string()
        },
        Fragment::Text(" to ".to_string()),
        Fragment::User {
          id: "u2".to_string(),
          name: "Bob".to_string()
        },
      ]
    );
    assert_eq!(to_plain_text(&fragments), "Ann assigned Order badges to Bob");
  }

  #[test]
  fn test_status_change_includes_transition() {
    let rec = record(
      "task_status_changed",
      json!({
        "task_id": "t1", "task_title": "Order badges",
        "old_status": "open", "new_status": "done"
      }),
    );

    let text = to_plain_text(&describe(&rec));
    assert_eq!(text, "Ann moved Order badges from open to done");
  }

  #[test]
  fn test_unknown_kind_falls_back_to_description() {
    let rec = record("totally_new_kind", json!({}));
    assert_eq!(
      describe(&rec),
      vec![Fragment::Text("raw description".to_string())]
    );
  }

  #[test]
  fn test_missing_metadata_falls_back() {
    // Known kind, but the metadata payload lacks the task fields
    let rec = record("task_assigned", json!({ "user_id": "u2" }));
    assert_eq!(
      describe(&rec),
      vec![Fragment::Text("raw description".to_string())]
    );
  }

  #[test]
  fn test_fallback_without_description_uses_kind() {
    let mut rec = record("some_future_kind", json!({}));
    rec.description = None;
    assert_eq!(
      describe(&rec),
      vec![Fragment::Text("some future kind".to_string())]
    );
  }

  #[test]
  fn test_deep_links_only_for_references() {
    let rec = record(
      "task_completed",
      json!({ "task_id": "t1", "task_title": "Order badges" }),
    );
    let fragments = describe(&rec);
    let links: Vec<String> = fragments.iter().filter_map(Fragment::deep_link).collect();
    assert_eq!(links, vec!["hrdesk://employee/u1", "hrdesk://task/t1"]);
  }

  #[test]
  fn test_missing_actor_renders_someone() {
    let mut rec = record("password_reset_requested", json!({}));
    rec.actor_id = None;
    rec.actor_name = None;
    assert_eq!(
      to_plain_text(&describe(&rec)),
      "Someone requested a password reset"
    );
  }
}
