mod activity;
mod backend;
mod cache;
mod config;
mod net;
mod notify;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use backend::cached_client::CachedHrClient;
use backend::client::{AuthError, EmployeeFilter, ReportFilter, TaskFilter};
use backend::query::Page;
use cache::{CacheResult, CacheSource, CacheStorage, FetchOptions, NoopStorage};
use config::Config;

#[derive(Parser, Debug)]
#[command(name = "hrdesk")]
#[command(about = "A command-line client for HR administration over a hosted backend")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/hrdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Company id to operate on (overrides the configured default)
  #[arg(long)]
  company: Option<String>,

  /// Bypass the cache and fetch fresh data
  #[arg(long)]
  refresh: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List companies visible to the token
  Companies,
  /// List employees for the company
  Employees {
    /// Filter by role
    #[arg(long)]
    role: Option<String>,
    /// Only active (or only archived) employees
    #[arg(long)]
    active: Option<bool>,
    /// Substring match on the full name
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value_t = 50)]
    limit: u32,
    #[arg(long, default_value_t = 0)]
    offset: u32,
  },
  /// Show a single employee
  Employee {
    id: String,
  },
  /// Add an employee to the company
  AddEmployee {
    full_name: String,
    email: String,
    #[arg(long, default_value = "member")]
    role: String,
  },
  /// Archive an employee (kept, but hidden from active lists)
  ArchiveEmployee {
    id: String,
  },
  /// List tasks for the company
  Tasks {
    /// Filter by status
    #[arg(long)]
    status: Option<String>,
    /// Only tasks that still need attention
    #[arg(long)]
    open: bool,
    #[arg(long, default_value_t = 50)]
    limit: u32,
    #[arg(long, default_value_t = 0)]
    offset: u32,
  },
  /// Create a task
  AddTask {
    title: String,
    #[arg(long)]
    assignee: Option<String>,
    #[arg(long)]
    due: Option<String>,
  },
  /// Change a task's status
  TaskStatus {
    id: String,
    status: String,
  },
  /// Delete a task
  DeleteTask {
    id: String,
  },
  /// List incident reports for the company
  Reports {
    /// Filter by status
    #[arg(long)]
    status: Option<String>,
    /// Filter by severity
    #[arg(long)]
    severity: Option<String>,
    #[arg(long, default_value_t = 50)]
    limit: u32,
    #[arg(long, default_value_t = 0)]
    offset: u32,
  },
  /// File an incident report
  FileReport {
    title: String,
    /// Employee id of the reporter
    #[arg(long)]
    reporter: String,
    #[arg(long, default_value = "low")]
    severity: String,
  },
  /// Change an incident report's status
  ReportStatus {
    id: String,
    status: String,
  },
  /// Show the recent activity feed for the company
  Activity {
    #[arg(long, default_value_t = 20)]
    limit: u32,
    /// Also print the deep link behind each reference
    #[arg(long)]
    links: bool,
  },
  /// Email a password-reset deep link to an employee
  ResetPassword {
    /// Address to send the reset link to
    email: String,
  },
  /// Parse a deep link and show what the app would do with it
  OpenLink {
    /// A hrdesk:// deep link
    link: String,
  },
  /// Cache maintenance
  Cache {
    #[command(subcommand)]
    command: CacheCommand,
  },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
  /// Remove entries older than the configured sweep age
  Sweep,
  /// Remove all cached entries
  Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging();

  let config = Config::load(args.config.as_deref())?;

  let result = if config.cache.disabled {
    let client = CachedHrClient::with_storage(&config, NoopStorage)?;
    run(&client, &config, &args).await
  } else {
    let client = CachedHrClient::new(&config)?;
    run(&client, &config, &args).await
  };

  // Authentication failures get a dedicated message instead of a trace
  if let Err(err) = &result {
    if err.downcast_ref::<AuthError>().is_some() {
      eprintln!("Authentication failed. Check your API token and log in again.");
      std::process::exit(1);
    }
  }
  result
}

/// Set up file logging under the user data dir. Logging is best-effort;
/// a missing data dir just means no log file.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::data_dir()?.join("hrdesk").join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;

  let appender = tracing_appender::rolling::daily(log_dir, "hrdesk.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_env("HRDESK_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Some(guard)
}

async fn run<S: CacheStorage>(
  client: &CachedHrClient<S>,
  config: &Config,
  args: &Args,
) -> Result<()> {
  // List reads are critical: a stale list beats an error screen
  let options = if args.refresh {
    FetchOptions::refresh().critical()
  } else {
    FetchOptions::default().critical()
  };

  match &args.command {
    Command::Companies => {
      let result = client.list_companies(options).await?;
      print_banner(&result);
      for company in &result.data {
        println!("{:<38} {:<30} {}", company.id, company.name, company.plan.as_deref().unwrap_or("-"));
      }
    }
    Command::Employees {
      role,
      active,
      search,
      limit,
      offset,
    } => {
      let company = company_id(config, args)?;
      let filter = EmployeeFilter {
        role: role.clone(),
        active: *active,
        search: search.clone(),
      };
      let result = client
        .list_employees(&company, &filter, Page::new(*limit, *offset), options)
        .await?;
      print_banner(&result);
      for e in &result.data {
        let state = if e.active { "" } else { " (archived)" };
        println!("{:<38} {:<28} {:<24} {}{}", e.id, e.full_name, e.email, e.role, state);
      }
    }
    Command::Employee { id } => {
      let result = client.get_employee(id, options).await?;
      print_banner(&result);
      let e = &result.data;
      println!("{} <{}>", e.full_name, e.email);
      println!("  company: {}", e.company_name.as_deref().unwrap_or(&e.company_id));
      println!("  role:    {}", e.role);
      println!("  active:  {}", e.active);
      println!("  since:   {}", e.created_at);
    }
    Command::AddEmployee {
      full_name,
      email,
      role,
    } => {
      let company = company_id(config, args)?;
      let created = client
        .create_employee(&backend::client::NewEmployee {
          company_id: company,
          full_name: full_name.clone(),
          email: email.clone(),
          role: role.clone(),
        })
        .await?;
      println!("Added {} ({})", created.full_name, created.id);
    }
    Command::ArchiveEmployee { id } => {
      client.archive_employee(id).await?;
      println!("Archived {}", id);
    }
    Command::Tasks {
      status,
      open,
      limit,
      offset,
    } => {
      let company = company_id(config, args)?;
      let filter = TaskFilter {
        status: status.clone(),
        assignee_id: None,
        open_only: *open,
      };
      let result = client
        .list_tasks(&company, &filter, Page::new(*limit, *offset), options)
        .await?;
      print_banner(&result);
      for t in &result.data {
        println!(
          "{:<38} {:<40} {:<12} {}",
          t.id,
          t.title,
          t.status,
          t.assignee_name.as_deref().unwrap_or("unassigned")
        );
      }
    }
    Command::AddTask {
      title,
      assignee,
      due,
    } => {
      let company = company_id(config, args)?;
      let created = client
        .create_task(&backend::client::NewTask {
          company_id: company,
          title: title.clone(),
          status: "open".to_string(),
          assignee_id: assignee.clone(),
          due_date: due.clone(),
        })
        .await?;
      println!("Created task {} ({})", created.title, created.id);
    }
    Command::TaskStatus { id, status } => {
      client.update_task_status(id, status).await?;
      println!("Task {} is now {}", id, status);
    }
    Command::DeleteTask { id } => {
      client.delete_task(id).await?;
      println!("Deleted task {}", id);
    }
    Command::Reports {
      status,
      severity,
      limit,
      offset,
    } => {
      let company = company_id(config, args)?;
      let filter = ReportFilter {
        status: status.clone(),
        severity: severity.clone(),
      };
      let result = client
        .list_reports(&company, &filter, Page::new(*limit, *offset), options)
        .await?;
      print_banner(&result);
      for r in &result.data {
        println!(
          "{:<38} {:<40} {:<10} {:<10} {}",
          r.id,
          r.title,
          r.severity,
          r.status,
          r.reporter_name.as_deref().unwrap_or("-")
        );
      }
    }
    Command::FileReport {
      title,
      reporter,
      severity,
    } => {
      let company = company_id(config, args)?;
      let created = client
        .create_report(&backend::client::NewReport {
          company_id: company,
          reporter_id: reporter.clone(),
          title: title.clone(),
          severity: severity.clone(),
        })
        .await?;
      println!("Filed report {} ({})", created.title, created.id);
    }
    Command::ReportStatus { id, status } => {
      client.update_report_status(id, status).await?;
      println!("Report {} is now {}", id, status);
    }
    Command::Activity { limit, links } => {
      let company = company_id(config, args)?;
      let result = client.activity_feed(&company, *limit, options).await?;
      print_banner(&result);
      for record in &result.data {
        let fragments = activity::describe(record);
        println!("{}  {}", record.created_at, activity::to_plain_text(&fragments));
        if *links {
          for link in fragments.iter().filter_map(activity::Fragment::deep_link) {
            println!("{:24}-> {}", "", link);
          }
        }
      }
    }
    Command::ResetPassword { email } => {
      let mailer = notify::Mailer::new(config)?;
      let token = notify::new_reset_token(email);
      // Fire-and-forget elsewhere, but a CLI process has to outlive the send
      let _ = mailer.send_password_reset(email, &token).await;
      println!("Reset email queued for {}", email);
    }
    Command::OpenLink { link } => {
      let request = notify::parse_reset_link(link)?;
      println!("Password reset for {} (token {})", request.email, request.token);
    }
    Command::Cache { command } => match command {
      CacheCommand::Sweep => {
        let removed = client.sweep_cache(config.cache.sweep_age())?;
        println!("Removed {} entries older than {} days", removed, config.cache.sweep_age_days);
      }
      CacheCommand::Clear => {
        let removed = client.clear_cache()?;
        println!("Removed {} entries", removed);
      }
    },
  }

  Ok(())
}

fn company_id(config: &Config, args: &Args) -> Result<String> {
  args
    .company
    .clone()
    .or_else(|| config.default_company.clone())
    .ok_or_else(|| eyre!("No company specified. Pass --company or set default_company in the config."))
}

/// Tell the user when they are looking at cached rather than live data.
fn print_banner<T>(result: &CacheResult<T>) {
  let cached_at = result
    .cached_at
    .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
    .unwrap_or_default();

  match result.source {
    CacheSource::Network | CacheSource::CacheFresh => {}
    CacheSource::Offline => {
      eprintln!("Offline: showing cached data from {}", cached_at);
    }
    CacheSource::CacheStale => {
      eprintln!(
        "Network error ({}): showing cached data from {}",
        result.error.as_deref().unwrap_or("unknown"),
        cached_at
      );
    }
  }
}
