//! Cached HR client that wraps HrClient with transparent caching.

use color_eyre::Result;
use std::sync::Arc;

use crate::cache::{CacheLayer, CacheResult, CacheStorage, FetchOptions, QueryKey, SqliteStorage};
use crate::config::Config;
use crate::net::NetworkProbe;

use super::cache::HrQueryKey;
use super::client::{
  employees_query, reports_query, tasks_query, EmployeeFilter, HrClient, NewEmployee, NewReport,
  NewTask, ReportFilter, TaskFilter,
};
use super::query::Page;
use super::types::{ActivityRecord, Company, Employee, IncidentReport, TaskItem};

/// HR client with transparent caching support.
///
/// This wraps the underlying HrClient and provides the same API, but
/// automatically caches reads, consults the connectivity probe to serve
/// cached data immediately when offline, and invalidates the affected
/// query families after writes.
pub struct CachedHrClient<S: CacheStorage = SqliteStorage> {
  inner: HrClient,
  cache: CacheLayer<S>,
  probe: Arc<NetworkProbe>,
}

impl CachedHrClient<SqliteStorage> {
  /// Create a new cached HR client with the default SQLite storage.
  pub fn new(config: &Config) -> Result<Self> {
    let storage = SqliteStorage::open()?;
    Self::with_storage(config, storage)
  }
}

impl<S: CacheStorage> CachedHrClient<S> {
  /// Create a cached client over an explicit storage backend.
  pub fn with_storage(config: &Config, storage: S) -> Result<Self> {
    let inner = HrClient::new(config)?;
    let cache = CacheLayer::new(storage).with_default_ttl(config.cache.ttl());
    let probe = Arc::new(NetworkProbe::new(&config.backend.url)?);

    Ok(Self {
      inner,
      cache,
      probe,
    })
  }

  /// Fill in the offline hint from the connectivity probe.
  async fn read_options(&self, options: FetchOptions) -> FetchOptions {
    FetchOptions {
      offline: !self.probe.is_online().await,
      ..options
    }
  }

  /// List all companies with caching.
  pub async fn list_companies(&self, options: FetchOptions) -> Result<CacheResult<Vec<Company>>> {
    let key = HrQueryKey::Companies;
    let options = self.read_options(options).await;

    self
      .cache
      .fetch_list(&key.cache_hash(), &key.description(), options, || {
        let inner = self.inner.clone();
        async move { inner.list_companies().await }
      })
      .await
  }

  /// List employees for a company with caching.
  pub async fn list_employees(
    &self,
    company_id: &str,
    filter: &EmployeeFilter,
    page: Page,
    options: FetchOptions,
  ) -> Result<CacheResult<Vec<Employee>>> {
    let key = HrQueryKey::Employees {
      company: company_id.to_string(),
      canonical: employees_query(company_id, filter, page).canonical(),
    };
    let options = self.read_options(options).await;

    self
      .cache
      .fetch_list(&key.cache_hash(), &key.description(), options, || {
        let inner = self.inner.clone();
        let company_id = company_id.to_string();
        let filter = filter.clone();
        async move { inner.list_employees(&company_id, &filter, page).await }
      })
      .await
  }

  /// Get a single employee by id with caching.
  pub async fn get_employee(
    &self,
    id: &str,
    options: FetchOptions,
  ) -> Result<CacheResult<Employee>> {
    let key = HrQueryKey::EmployeeDetail { id: id.to_string() };
    let options = self.read_options(options).await;

    self
      .cache
      .fetch_one(&key.cache_hash(), &key.description(), options, || {
        let inner = self.inner.clone();
        let id = id.to_string();
        async move { inner.get_employee(&id).await }
      })
      .await
  }

  /// List tasks for a company with caching.
  pub async fn list_tasks(
    &self,
    company_id: &str,
    filter: &TaskFilter,
    page: Page,
    options: FetchOptions,
  ) -> Result<CacheResult<Vec<TaskItem>>> {
    let key = HrQueryKey::Tasks {
      company: company_id.to_string(),
      canonical: tasks_query(company_id, filter, page).canonical(),
    };
    let options = self.read_options(options).await;

    self
      .cache
      .fetch_list(&key.cache_hash(), &key.description(), options, || {
        let inner = self.inner.clone();
        let company_id = company_id.to_string();
        let filter = filter.clone();
        async move { inner.list_tasks(&company_id, &filter, page).await }
      })
      .await
  }

  /// List incident reports for a company with caching.
  pub async fn list_reports(
    &self,
    company_id: &str,
    filter: &ReportFilter,
    page: Page,
    options: FetchOptions,
  ) -> Result<CacheResult<Vec<IncidentReport>>> {
    let key = HrQueryKey::Reports {
      company: company_id.to_string(),
      canonical: reports_query(company_id, filter, page).canonical(),
    };
    let options = self.read_options(options).await;

    self
      .cache
      .fetch_list(&key.cache_hash(), &key.description(), options, || {
        let inner = self.inner.clone();
        let company_id = company_id.to_string();
        let filter = filter.clone();
        async move { inner.list_reports(&company_id, &filter, page).await }
      })
      .await
  }

  /// Recent activity feed for a company with caching.
  ///
  /// The feed churns faster than the entity lists, so it gets a shorter
  /// default TTL unless the caller picked one explicitly.
  pub async fn activity_feed(
    &self,
    company_id: &str,
    limit: u32,
    options: FetchOptions,
  ) -> Result<CacheResult<Vec<ActivityRecord>>> {
    let options = if options.ttl.is_none() {
      options.with_ttl(chrono::Duration::minutes(1))
    } else {
      options
    };
    let key = HrQueryKey::Activity {
      company: company_id.to_string(),
      canonical: super::client::activity_query(company_id, limit).canonical(),
    };
    let options = self.read_options(options).await;

    self
      .cache
      .fetch_list(&key.cache_hash(), &key.description(), options, || {
        let inner = self.inner.clone();
        let company_id = company_id.to_string();
        async move { inner.activity_feed(&company_id, limit).await }
      })
      .await
  }

  // ==========================================================================
  // Writes - pass through, then invalidate the affected query families
  // ==========================================================================

  pub async fn create_employee(&self, employee: &NewEmployee) -> Result<Employee> {
    let created = self.inner.create_employee(employee).await?;
    self.cache.invalidate_type("employee")?;
    Ok(created)
  }

  pub async fn archive_employee(&self, id: &str) -> Result<()> {
    self.inner.archive_employee(id).await?;
    self.cache.invalidate_type("employee")?;
    let key = HrQueryKey::EmployeeDetail { id: id.to_string() };
    self.cache.invalidate(&key.cache_hash())?;
    Ok(())
  }

  pub async fn create_task(&self, task: &NewTask) -> Result<TaskItem> {
    let created = self.inner.create_task(task).await?;
    self.cache.invalidate_type("task")?;
    Ok(created)
  }

  pub async fn update_task_status(&self, id: &str, status: &str) -> Result<()> {
    self.inner.update_task_status(id, status).await?;
    self.cache.invalidate_type("task")?;
    Ok(())
  }

  pub async fn delete_task(&self, id: &str) -> Result<()> {
    self.inner.delete_task(id).await?;
    self.cache.invalidate_type("task")?;
    Ok(())
  }

  pub async fn create_report(&self, report: &NewReport) -> Result<IncidentReport> {
    let created = self.inner.create_report(report).await?;
    self.cache.invalidate_type("report")?;
    Ok(created)
  }

  pub async fn update_report_status(&self, id: &str, status: &str) -> Result<()> {
    self.inner.update_report_status(id, status).await?;
    self.cache.invalidate_type("report")?;
    Ok(())
  }

  // ==========================================================================
  // Cache maintenance
  // ==========================================================================

  /// Delete cache entries older than the configured sweep age.
  pub fn sweep_cache(&self, max_age: chrono::Duration) -> Result<usize> {
    self.cache.sweep(max_age)
  }

  /// Delete all cache entries.
  pub fn clear_cache(&self) -> Result<usize> {
    self.cache.clear()
  }
}
