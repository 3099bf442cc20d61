//! Domain types for the HR backend.
//!
//! These derive Serialize/Deserialize because cached copies are stored as
//! JSON; the shapes here are what the rest of the application works with,
//! independent of the wire rows in `api_types`.

use serde::{Deserialize, Serialize};

/// A tenant company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
  pub id: String,
  pub name: String,
  pub plan: Option<String>,
  pub created_at: String,
}

/// An employee row, with the company name resolved via join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
  pub id: String,
  pub company_id: String,
  pub company_name: Option<String>,
  pub full_name: String,
  pub email: String,
  pub role: String,
  pub active: bool,
  pub created_at: String,
}

/// A work task, with the assignee name resolved via join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
  pub id: String,
  pub company_id: String,
  pub title: String,
  pub status: String,
  pub assignee_id: Option<String>,
  pub assignee_name: Option<String>,
  pub due_date: Option<String>,
  pub created_at: String,
}

/// An incident report filed by an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
  pub id: String,
  pub company_id: String,
  pub reporter_id: String,
  pub reporter_name: Option<String>,
  pub title: String,
  pub severity: String,
  pub status: String,
  pub created_at: String,
}

/// One entry in the activity log.
///
/// `kind` is an open string set; `metadata` carries a kind-specific JSON
/// payload. The renderer in `crate::activity` turns these into display
/// fragments and falls back to `description` for kinds it does not know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
  pub id: String,
  pub company_id: String,
  pub actor_id: Option<String>,
  pub actor_name: Option<String>,
  pub kind: String,
  pub description: Option<String>,
  #[serde(default)]
  pub metadata: serde_json::Value,
  pub created_at: String,
}
