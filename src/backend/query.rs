//! Row query builder for the PostgREST-style REST interface.
//!
//! A `TableQuery` carries everything that shapes a result set: the table,
//! the column selection (including foreign-key expansion), filters, ordering
//! and pagination. Its canonical string form is the input to the cache
//! fingerprint, so it must be stable: filters are sorted before rendering.

/// Pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub limit: u32,
  pub offset: u32,
}

impl Default for Page {
  fn default() -> Self {
    Self {
      limit: 50,
      offset: 0,
    }
  }
}

impl Page {
  pub fn new(limit: u32, offset: u32) -> Self {
    Self { limit, offset }
  }
}

/// A row-level query against one table.
#[derive(Debug, Clone)]
pub struct TableQuery {
  table: String,
  select: String,
  /// (column, operator expression) pairs, e.g. ("status", "eq.open")
  filters: Vec<(String, String)>,
  order: Option<String>,
  page: Option<Page>,
}

impl TableQuery {
  pub fn new(table: impl Into<String>) -> Self {
    Self {
      table: table.into(),
      select: "*".to_string(),
      filters: Vec::new(),
      order: None,
      page: None,
    }
  }

  /// Set the column selection. Foreign-key joins use the embedded-resource
  /// syntax, e.g. `*,company:companies(id,name)`.
  pub fn select(mut self, columns: impl Into<String>) -> Self {
    self.select = columns.into();
    self
  }

  /// Equality filter.
  pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
    self.filters.push((column.into(), format!("eq.{}", value.into())));
    self
  }

  /// Case-insensitive pattern filter. `%` wildcards are the caller's job.
  pub fn ilike(mut self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
    self
      .filters
      .push((column.into(), format!("ilike.{}", pattern.into())));
    self
  }

  /// Set-membership filter.
  pub fn is_in(mut self, column: impl Into<String>, values: &[&str]) -> Self {
    self
      .filters
      .push((column.into(), format!("in.({})", values.join(","))));
    self
  }

  /// Order by a column, ascending or descending.
  pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
    let dir = if ascending { "asc" } else { "desc" };
    self.order = Some(format!("{}.{}", column.into(), dir));
    self
  }

  /// Restrict to a pagination window.
  pub fn page(mut self, page: Page) -> Self {
    self.page = Some(page);
    self
  }

  pub fn table(&self) -> &str {
    &self.table
  }

  /// Query-string pairs in request order, ready for `reqwest`.
  pub fn to_query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), self.select.clone())];
    for (column, expr) in &self.filters {
      pairs.push((column.clone(), expr.clone()));
    }
    if let Some(order) = &self.order {
      pairs.push(("order".to_string(), order.clone()));
    }
    if let Some(page) = &self.page {
      pairs.push(("limit".to_string(), page.limit.to_string()));
      pairs.push(("offset".to_string(), page.offset.to_string()));
    }
    pairs
  }

  /// Canonical string form used for cache fingerprinting.
  ///
  /// Filters are sorted so that insertion order does not change the
  /// fingerprint; everything else is positional.
  pub fn canonical(&self) -> String {
    let mut filters: Vec<String> = self
      .filters
      .iter()
      .map(|(column, expr)| format!("{}={}", column, expr))
      .collect();
    filters.sort();

    let page = self
      .page
      .map(|p| format!("{}:{}", p.limit, p.offset))
      .unwrap_or_default();

    format!(
      "{}?select={}&{}&order={}&page={}",
      self.table,
      self.select,
      filters.join("&"),
      self.order.as_deref().unwrap_or(""),
      page
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_canonical_ignores_filter_order() {
    let a = TableQuery::new("tasks").eq("status", "open").eq("company_id", "c1");
    let b = TableQuery::new("tasks").eq("company_id", "c1").eq("status", "open");
    assert_eq!(a.canonical(), b.canonical());
  }

  #[test]
  fn test_canonical_differs_by_page() {
    let a = TableQuery::new("tasks").page(Page::new(50, 0));
    let b = TableQuery::new("tasks").page(Page::new(50, 50));
    assert_ne!(a.canonical(), b.canonical());
  }

  #[test]
  fn test_canonical_differs_by_table() {
    assert_ne!(
      TableQuery::new("tasks").canonical(),
      TableQuery::new("employees").canonical()
    );
  }

  #[test]
  fn test_query_pairs_keep_request_order() {
    let query = TableQuery::new("employees")
      .select("*,company:companies(id,name)")
      .eq("company_id", "c1")
      .ilike("full_name", "%ann%")
      .order_by("created_at", false)
      .page(Page::new(25, 50));

    let pairs = query.to_query_pairs();
    assert_eq!(
      pairs,
      vec![
        ("select".to_string(), "*,company:companies(id,name)".to_string()),
        ("company_id".to_string(), "eq.c1".to_string()),
        ("full_name".to_string(), "ilike.%ann%".to_string()),
        ("order".to_string(), "created_at.desc".to_string()),
        ("limit".to_string(), "25".to_string()),
        ("offset".to_string(), "50".to_string()),
      ]
    );
  }

  #[test]
  fn test_in_filter_rendering() {
    let query = TableQuery::new("tasks").is_in("status", &["open", "blocked"]);
    let pairs = query.to_query_pairs();
    assert!(pairs.contains(&("status".to_string(), "in.(open,blocked)".to_string())));
  }
}
