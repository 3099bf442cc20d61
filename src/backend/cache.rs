//! Caching implementations for HR backend types.

use sha2::{Digest, Sha256};

use crate::cache::{Cacheable, QueryKey};

use super::types::{ActivityRecord, Company, Employee, IncidentReport, TaskItem};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Company {
  fn entity_type() -> &'static str {
    "company"
  }
}

impl Cacheable for Employee {
  fn entity_type() -> &'static str {
    "employee"
  }
}

impl Cacheable for TaskItem {
  fn entity_type() -> &'static str {
    "task"
  }
}

impl Cacheable for IncidentReport {
  fn entity_type() -> &'static str {
    "report"
  }
}

impl Cacheable for ActivityRecord {
  fn entity_type() -> &'static str {
    "activity"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// Query key types for HR backend reads.
///
/// List variants carry the canonical query string (table + filters + order +
/// pagination) so the fingerprint changes whenever the result set could.
#[derive(Clone, Debug)]
pub enum HrQueryKey {
  /// All companies visible to the token
  Companies,
  /// Employee list for a company
  Employees { company: String, canonical: String },
  /// A single employee by id
  EmployeeDetail { id: String },
  /// Task list for a company
  Tasks { company: String, canonical: String },
  /// Incident report list for a company
  Reports { company: String, canonical: String },
  /// Recent activity feed for a company
  Activity { company: String, canonical: String },
}

impl QueryKey for HrQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::Companies => "companies".to_string(),
      Self::Employees { canonical, .. } => format!("employees:{}", canonical),
      Self::EmployeeDetail { id } => format!("employee_detail:{}", id),
      Self::Tasks { canonical, .. } => format!("tasks:{}", canonical),
      Self::Reports { canonical, .. } => format!("reports:{}", canonical),
      Self::Activity { canonical, .. } => format!("activity:{}", canonical),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
  }

  fn description(&self) -> String {
    match self {
      Self::Companies => "all companies".to_string(),
      Self::Employees { company, .. } => format!("employees for company {}", company),
      Self::EmployeeDetail { id } => format!("employee {}", id),
      Self::Tasks { company, .. } => format!("tasks for company {}", company),
      Self::Reports { company, .. } => format!("reports for company {}", company),
      Self::Activity { company, .. } => format!("activity for company {}", company),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::client::{employees_query, EmployeeFilter};
  use crate::backend::query::Page;

  fn employees_key(filter: &EmployeeFilter, page: Page) -> HrQueryKey {
    HrQueryKey::Employees {
      company: "c1".to_string(),
      canonical: employees_query("c1", filter, page).canonical(),
    }
  }

  #[test]
  fn test_same_query_same_fingerprint() {
    let a = employees_key(&EmployeeFilter::default(), Page::default());
    let b = employees_key(&EmployeeFilter::default(), Page::default());
    assert_eq!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_pagination_changes_fingerprint() {
    let a = employees_key(&EmployeeFilter::default(), Page::new(50, 0));
    let b = employees_key(&EmployeeFilter::default(), Page::new(50, 50));
    assert_ne!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_filter_changes_fingerprint() {
    let filtered = EmployeeFilter {
      role: Some("manager".to_string()),
      ..EmployeeFilter::default()
    };
    let a = employees_key(&EmployeeFilter::default(), Page::default());
    let b = employees_key(&filtered, Page::default());
    assert_ne!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_hash_is_fixed_length_hex() {
    let key = HrQueryKey::Companies;
    let hash = key.cache_hash();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
  }
}
