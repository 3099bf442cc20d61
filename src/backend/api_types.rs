//! Serde-deserializable types matching backend REST rows.
//!
//! These types are separate from domain types to allow clean deserialization
//! of embedded join objects while keeping domain types flat.

use serde::Deserialize;

use super::types::{ActivityRecord, Company, Employee, IncidentReport, TaskItem};

// ============================================================================
// Common embedded join objects
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CompanyRef {
  pub id: String,
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeRef {
  pub id: String,
  pub full_name: String,
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CompanyRow {
  pub id: String,
  pub name: String,
  pub plan: Option<String>,
  #[serde(default)]
  pub created_at: String,
}

impl CompanyRow {
  pub fn into_domain(self) -> Company {
    Company {
      id: self.id,
      name: self.name,
      plan: self.plan,
      created_at: self.created_at,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct EmployeeRow {
  pub id: String,
  pub company_id: String,
  pub full_name: String,
  pub email: String,
  #[serde(default)]
  pub role: String,
  #[serde(default = "default_true")]
  pub active: bool,
  #[serde(default)]
  pub created_at: String,
  /// Embedded join: `company:companies(id,name)`
  pub company: Option<CompanyRef>,
}

impl EmployeeRow {
  pub fn into_domain(self) -> Employee {
    Employee {
      id: self.id,
      company_id: self.company_id,
      company_name: self.company.map(|c| c.name),
      full_name: self.full_name,
      email: self.email,
      role: self.role,
      active: self.active,
      created_at: self.created_at,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct TaskRow {
  pub id: String,
  pub company_id: String,
  pub title: String,
  #[serde(default)]
  pub status: String,
  pub assignee_id: Option<String>,
  pub due_date: Option<String>,
  #[serde(default)]
  pub created_at: String,
  /// Embedded join: `assignee:employees(id,full_name)`
  pub assignee: Option<EmployeeRef>,
}

impl TaskRow {
  pub fn into_domain(self) -> TaskItem {
    TaskItem {
      id: self.id,
      company_id: self.company_id,
      title: self.title,
      status: self.status,
      assignee_id: self.assignee_id,
      assignee_name: self.assignee.map(|e| e.full_name),
      due_date: self.due_date,
      created_at: self.created_at,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ReportRow {
  pub id: String,
  pub company_id: String,
  pub reporter_id: String,
  pub title: String,
  #[serde(default)]
  pub severity: String,
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub created_at: String,
  /// Embedded join: `reporter:employees(id,full_name)`
  pub reporter: Option<EmployeeRef>,
}

impl ReportRow {
  pub fn into_domain(self) -> IncidentReport {
    IncidentReport {
      id: self.id,
      company_id: self.company_id,
      reporter_id: self.reporter_id,
      reporter_name: self.reporter.map(|e| e.full_name),
      title: self.title,
      severity: self.severity,
      status: self.status,
      created_at: self.created_at,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ActivityRow {
  pub id: String,
  pub company_id: String,
  pub actor_id: Option<String>,
  pub kind: String,
  pub description: Option<String>,
  #[serde(default)]
  pub metadata: serde_json::Value,
  #[serde(default)]
  pub created_at: String,
  /// Embedded join: `actor:employees(id,full_name)`
  pub actor: Option<EmployeeRef>,
}

impl ActivityRow {
  pub fn into_domain(self) -> ActivityRecord {
    ActivityRecord {
      id: self.id,
      company_id: self.company_id,
      actor_id: self.actor_id,
      actor_name: self.actor.map(|e| e.full_name),
      kind: self.kind,
      description: self.description,
      metadata: self.metadata,
      created_at: self.created_at,
    }
  }
}

fn default_true() -> bool {
  true
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_employee_row_with_embedded_company() {
    let json = r#"{
      "id": "e1",
      "company_id": "c1",
      "full_name": "Ann Example",
      "email": "ann@example.com",
      "role": "manager",
      "active": true,
      "created_at": "2026-01-01T00:00:00Z",
      "company": {"id": "c1", "name": "Acme"}
    }"#;

    let row: EmployeeRow = serde_json::from_str(json).unwrap();
    let employee = row.into_domain();
    assert_eq!(employee.company_name.as_deref(), Some("Acme"));
    assert!(employee.active);
  }

  #[test]
  fn test_task_row_without_assignee() {
    let json = r#"{"id": "t1", "company_id": "c1", "title": "Order badges"}"#;
    let row: TaskRow = serde_json::from_str(json).unwrap();
    let task = row.into_domain();
    assert!(task.assignee_id.is_none());
    assert!(task.assignee_name.is_none());
    assert_eq!(task.status, "");
  }
}
