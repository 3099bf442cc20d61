//! REST client for the hosted HR backend.

use color_eyre::{eyre::eyre, Result};
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::config::Config;

use super::api_types::{ActivityRow, CompanyRow, EmployeeRow, ReportRow, TaskRow};
use super::query::{Page, TableQuery};
use super::types::{ActivityRecord, Company, Employee, IncidentReport, TaskItem};

/// Authentication failure (401/403). Kept as a distinct error type so
/// callers can downcast and redirect to login instead of showing a banner.
#[derive(Debug)]
pub struct AuthError {
  pub status: StatusCode,
}

impl std::fmt::Display for AuthError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Authentication failed ({})", self.status)
  }
}

impl std::error::Error for AuthError {}

/// Filters for employee list queries.
#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
  pub role: Option<String>,
  pub active: Option<bool>,
  /// Substring match on the full name
  pub search: Option<String>,
}

/// Filters for task list queries.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
  pub status: Option<String>,
  pub assignee_id: Option<String>,
  /// Restrict to statuses that still need attention
  pub open_only: bool,
}

/// Filters for incident report list queries.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
  pub status: Option<String>,
  pub severity: Option<String>,
}

/// Fields for creating a task.
#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
  pub company_id: String,
  pub title: String,
  pub status: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assignee_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date: Option<String>,
}

/// Fields for creating an employee.
#[derive(Debug, Clone, Serialize)]
pub struct NewEmployee {
  pub company_id: String,
  pub full_name: String,
  pub email: String,
  pub role: String,
}

/// Fields for filing an incident report.
#[derive(Debug, Clone, Serialize)]
pub struct NewReport {
  pub company_id: String,
  pub reporter_id: String,
  pub title: String,
  pub severity: String,
}

/// HR backend API client wrapper
#[derive(Clone)]
pub struct HrClient {
  http: reqwest::Client,
  base: Url,
}

impl HrClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::api_token()?;

    let base = Url::parse(&config.backend.url)
      .map_err(|e| eyre!("Invalid backend URL {}: {}", config.backend.url, e))?;

    let mut headers = header::HeaderMap::new();
    let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", token))
      .map_err(|e| eyre!("Invalid API token: {}", e))?;
    auth.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, auth);

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  fn rest_url(&self, table: &str) -> Result<Url> {
    self
      .base
      .join(&format!("rest/v1/{}", table))
      .map_err(|e| eyre!("Invalid table name {}: {}", table, e))
  }

  /// Fetch rows for a query.
  pub async fn select<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Vec<T>> {
    let url = self.rest_url(query.table())?;
    debug!(table = query.table(), "select");

    let response = self
      .http
      .get(url)
      .query(&query.to_query_pairs())
      .send()
      .await
      .map_err(|e| eyre!("Failed to query {}: {}", query.table(), e))?;
    let response = check_status(response, query.table())?;

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to decode {} rows: {}", query.table(), e))
  }

  /// Insert a row, returning the created representation.
  pub async fn insert<T: DeserializeOwned, B: Serialize>(&self, table: &str, row: &B) -> Result<T> {
    let url = self.rest_url(table)?;
    debug!(table, "insert");

    let response = self
      .http
      .post(url)
      .header("Prefer", "return=representation")
      .json(row)
      .send()
      .await
      .map_err(|e| eyre!("Failed to insert into {}: {}", table, e))?;
    let response = check_status(response, table)?;

    // The backend returns the created rows as an array
    let mut rows: Vec<T> = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to decode created {} row: {}", table, e))?;
    rows
      .pop()
      .ok_or_else(|| eyre!("Insert into {} returned no rows", table))
  }

  /// Patch a row by primary key.
  pub async fn update<B: Serialize>(&self, table: &str, id: &str, patch: &B) -> Result<()> {
    let url = self.rest_url(table)?;
    debug!(table, id, "update");

    let response = self
      .http
      .patch(url)
      .query(&[("id", format!("eq.{}", id))])
      .json(patch)
      .send()
      .await
      .map_err(|e| eyre!("Failed to update {} {}: {}", table, id, e))?;
    check_status(response, table)?;

    Ok(())
  }

  /// Delete a row by primary key.
  pub async fn delete(&self, table: &str, id: &str) -> Result<()> {
    let url = self.rest_url(table)?;
    debug!(table, id, "delete");

    let response = self
      .http
      .delete(url)
      .query(&[("id", format!("eq.{}", id))])
      .send()
      .await
      .map_err(|e| eyre!("Failed to delete {} {}: {}", table, id, e))?;
    check_status(response, table)?;

    Ok(())
  }

  // ==========================================================================
  // Typed domain operations
  // ==========================================================================

  /// List all companies visible to the token.
  pub async fn list_companies(&self) -> Result<Vec<Company>> {
    let query = companies_query();
    let rows: Vec<CompanyRow> = self.select(&query).await?;
    Ok(rows.into_iter().map(CompanyRow::into_domain).collect())
  }

  /// List employees for a company.
  pub async fn list_employees(
    &self,
    company_id: &str,
    filter: &EmployeeFilter,
    page: Page,
  ) -> Result<Vec<Employee>> {
    let query = employees_query(company_id, filter, page);
    let rows: Vec<EmployeeRow> = self.select(&query).await?;
    Ok(rows.into_iter().map(EmployeeRow::into_domain).collect())
  }

  /// Get a single employee by id.
  pub async fn get_employee(&self, id: &str) -> Result<Employee> {
    let query = TableQuery::new("employees")
      .select("*,company:companies(id,name)")
      .eq("id", id);
    let mut rows: Vec<EmployeeRow> = self.select(&query).await?;
    rows
      .pop()
      .map(EmployeeRow::into_domain)
      .ok_or_else(|| eyre!("Employee {} not found", id))
  }

  pub async fn create_employee(&self, employee: &NewEmployee) -> Result<Employee> {
    let row: EmployeeRow = self.insert("employees", employee).await?;
    Ok(row.into_domain())
  }

  /// Archive an employee (kept as a row, hidden from active lists).
  pub async fn archive_employee(&self, id: &str) -> Result<()> {
    self.update("employees", id, &json!({ "active": false })).await
  }

  /// List tasks for a company.
  pub async fn list_tasks(
    &self,
    company_id: &str,
    filter: &TaskFilter,
    page: Page,
  ) -> Result<Vec<TaskItem>> {
    let query = tasks_query(company_id, filter, page);
    let rows: Vec<TaskRow> = self.select(&query).await?;
    Ok(rows.into_iter().map(TaskRow::into_domain).collect())
  }

  pub async fn create_task(&self, task: &NewTask) -> Result<TaskItem> {
    let row: TaskRow = self.insert("tasks", task).await?;
    Ok(row.into_domain())
  }

  pub async fn update_task_status(&self, id: &str, status: &str) -> Result<()> {
    self.update("tasks", id, &json!({ "status": status })).await
  }

  pub async fn delete_task(&self, id: &str) -> Result<()> {
    self.delete("tasks", id).await
  }

  /// List incident reports for a company.
  pub async fn list_reports(
    &self,
    company_id: &str,
    filter: &ReportFilter,
    page: Page,
  ) -> Result<Vec<IncidentReport>> {
    let query = reports_query(company_id, filter, page);
    let rows: Vec<ReportRow> = self.select(&query).await?;
    Ok(rows.into_iter().map(ReportRow::into_domain).collect())
  }

  pub async fn create_report(&self, report: &NewReport) -> Result<IncidentReport> {
    let row: ReportRow = self.insert("incident_reports", report).await?;
    Ok(row.into_domain())
  }

  pub async fn update_report_status(&self, id: &str, status: &str) -> Result<()> {
    self
      .update("incident_reports", id, &json!({ "status": status }))
      .await
  }

  /// Recent activity log entries for a company, newest first.
  pub async fn activity_feed(&self, company_id: &str, limit: u32) -> Result<Vec<ActivityRecord>> {
    let query = activity_query(company_id, limit);
    let rows: Vec<ActivityRow> = self.select(&query).await?;
    Ok(rows.into_iter().map(ActivityRow::into_domain).collect())
  }
}

/// Surface non-2xx statuses, keeping auth failures distinguishable.
fn check_status(response: reqwest::Response, table: &str) -> Result<reqwest::Response> {
  let status = response.status();
  if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
    return Err(AuthError { status }.into());
  }
  if !status.is_success() {
    return Err(eyre!("Backend query on {} failed: {}", table, status));
  }
  Ok(response)
}

// ============================================================================
// Query construction - shared with cache fingerprinting
// ============================================================================

pub fn companies_query() -> TableQuery {
  TableQuery::new("companies").order_by("name", true)
}

pub fn employees_query(company_id: &str, filter: &EmployeeFilter, page: Page) -> TableQuery {
  let mut query = TableQuery::new("employees")
    .select("*,company:companies(id,name)")
    .eq("company_id", company_id)
    .order_by("full_name", true)
    .page(page);

  if let Some(role) = &filter.role {
    query = query.eq("role", role);
  }
  if let Some(active) = filter.active {
    query = query.eq("active", active.to_string());
  }
  if let Some(search) = &filter.search {
    query = query.ilike("full_name", format!("%{}%", search));
  }
  query
}

pub fn tasks_query(company_id: &str, filter: &TaskFilter, page: Page) -> TableQuery {
  let mut query = TableQuery::new("tasks")
    .select("*,assignee:employees(id,full_name)")
    .eq("company_id", company_id)
    .order_by("created_at", false)
    .page(page);

  if let Some(status) = &filter.status {
    query = query.eq("status", status);
  }
  if let Some(assignee) = &filter.assignee_id {
    query = query.eq("assignee_id", assignee);
  }
  if filter.open_only {
    query = query.is_in("status", &["open", "in_progress", "blocked"]);
  }
  query
}

pub fn reports_query(company_id: &str, filter: &ReportFilter, page: Page) -> TableQuery {
  let mut query = TableQuery::new("incident_reports")
    .select("*,reporter:employees(id,full_name)")
    .eq("company_id", company_id)
    .order_by("created_at", false)
    .page(page);

  if let Some(status) = &filter.status {
    query = query.eq("status", status);
  }
  if let Some(severity) = &filter.severity {
    query = query.eq("severity", severity);
  }
  query
}

pub fn activity_query(company_id: &str, limit: u32) -> TableQuery {
  TableQuery::new("activity_log")
    .select("*,actor:employees(id,full_name)")
    .eq("company_id", company_id)
    .order_by("created_at", false)
    .page(Page::new(limit, 0))
}
