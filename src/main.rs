mod celebrate;
mod chart;
mod export;
mod lock;
mod milestone;
mod models;
mod settings;
mod store;
mod timers;
mod tracker;
mod tui;
mod view;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use lock::InstanceLock;
use settings::Settings;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use store::Store;
use tracker::Tracker;
use view::Filter;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications, HR follow-ups, and daily progress")]
struct Cli {
    /// Data directory (defaults to the per-user data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct FilterArgs {
    /// Only this job type
    #[arg(short = 't', long = "type")]
    job_type: Option<String>,

    /// Applied on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Applied on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,

    /// Case-insensitive company search
    #[arg(short, long)]
    search: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> Filter {
        Filter {
            job_type: self.job_type.filter(|t| t != "All"),
            date_from: self.from.unwrap_or_default(),
            date_to: self.to.unwrap_or_default(),
            search: self.search.unwrap_or_default(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive dashboard (default)
    Ui,

    /// Record a new application dated today
    Add {
        /// Company name
        company: String,

        /// Job type (defaults to the first configured type)
        #[arg(short = 't', long = "type")]
        job_type: Option<String>,

        /// HR phone number
        #[arg(short, long, default_value = "")]
        phone: String,
    },

    /// List active applications
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show one application
    Show {
        /// Application ID
        id: u64,
    },

    /// Edit company, type, or phone
    Edit {
        /// Application ID
        id: u64,

        #[arg(short, long)]
        company: Option<String>,

        #[arg(short = 't', long = "type")]
        job_type: Option<String>,

        #[arg(short, long)]
        phone: Option<String>,
    },

    /// Mark HR as called
    Called {
        /// Application ID
        id: u64,
    },

    /// Hide an application from all views (kept on disk)
    Inactive {
        /// Application ID
        id: u64,
    },

    /// Permanently delete an application
    Delete {
        /// Application ID
        id: u64,
    },

    /// Show application and call counts
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Bar chart of the last 7 days
    Graph {
        /// Only this job type
        #[arg(short = 't', long = "type")]
        job_type: Option<String>,
    },

    /// Write an HTML summary and open it in the browser
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Write the file without opening a browser
        #[arg(long)]
        no_open: bool,
    },

    /// Manage job types
    Types {
        #[command(subcommand)]
        command: TypeCommands,
    },

    /// List backup snapshots
    Backups,
}

#[derive(Subcommand)]
enum TypeCommands {
    /// List job types
    List,

    /// Add a job type
    Add {
        /// Job type name
        name: String,
    },

    /// Remove a job type (at least one must remain)
    Remove {
        /// Job type name
        name: String,
    },
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Ui
                | Commands::Add { .. }
                | Commands::Edit { .. }
                | Commands::Called { .. }
                | Commands::Inactive { .. }
                | Commands::Delete { .. }
                | Commands::Types {
                    command: TypeCommands::Add { .. } | TypeCommands::Remove { .. }
                }
        )
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });
    builder.parse_default_env();

    // Keep log lines off the dashboard's screen
    if let Some(path) = log_file {
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(path) {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
    }
    let _ = builder.try_init();
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Ui);

    let dir = cli.data_dir.unwrap_or_else(Store::default_dir);
    let store = Store::open(&dir)
        .with_context(|| format!("Failed to open data directory {}", dir.display()))?;

    let log_file = matches!(command, Commands::Ui).then(|| dir.join("jobtrack.log"));
    init_logging(cli.verbose, log_file.as_deref());

    let settings = Settings::load(&dir);
    let _lock = if command.mutates() {
        Some(InstanceLock::acquire(&dir)?)
    } else {
        None
    };

    let mut tracker = Tracker::open(store, settings.daily_goal);
    if !matches!(command, Commands::Ui) {
        for warning in tracker.take_warnings() {
            eprintln!("Warning: {}", warning);
        }
    }
    let today = Local::now().date_naive();

    match command {
        Commands::Ui => {
            tui::run_dashboard(tracker, &settings)?;
        }

        Commands::Add {
            company,
            job_type,
            phone,
        } => {
            let job_type = match job_type {
                Some(t) => t,
                None => tracker
                    .job_types()
                    .first()
                    .cloned()
                    .ok_or_else(|| anyhow!("No job types configured"))?,
            };
            let id = tracker.add(&company, &job_type, &phone, today)?;
            println!("Added application #{} ({}, {})", id, company.trim(), job_type);
            if let Some(celebration) = tracker.check_milestone(today) {
                println!("\n*** {} ***\n{}", celebration.title(), celebration.message());
            }
        }

        Commands::List { filter } => {
            let view = tracker.view(&filter.into_filter(), today);
            if view.rows.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<6} {:<24} {:<18} {:<14} {:<11} {:>4} {:<8}",
                    "ID", "COMPANY", "TYPE", "HR PHONE", "APPLIED", "LEFT", "STATUS"
                );
                println!("{}", "-".repeat(91));
                for row in &view.rows {
                    let phone = if row.app.hr_phone.is_empty() { "-" } else { row.app.hr_phone.as_str() };
                    let marker = if row.is_ready_to_call() { " <" } else { "" };
                    println!(
                        "{:<6} {:<24} {:<18} {:<14} {:<11} {:>4} {:<8}{}",
                        row.app.id,
                        truncate(&row.app.company, 22),
                        truncate(&row.app.job_type, 16),
                        truncate(phone, 12),
                        row.app.apply_date.to_string(),
                        row.days_left,
                        row.status.to_string(),
                        marker
                    );
                }
                println!("\n{}", view.stats);
            }
        }

        Commands::Show { id } => {
            let app = tracker.find(id)?;
            println!("Application #{}", app.id);
            println!("Company: {}", app.company);
            println!("Type: {}", app.job_type);
            if !app.hr_phone.is_empty() {
                println!("HR Phone: {}", app.hr_phone);
            }
            println!("Applied: {}", app.apply_date);
            let days_left = view::days_left(app.apply_date, today);
            println!("Status: {}", view::Status::of(app, days_left));
            if app.inactive {
                println!("(inactive)");
            }
        }

        Commands::Edit {
            id,
            company,
            job_type,
            phone,
        } => {
            let current = tracker.find(id)?.clone();
            tracker.edit(
                id,
                company.as_deref().unwrap_or(&current.company),
                job_type.as_deref().unwrap_or(&current.job_type),
                phone.as_deref().unwrap_or(&current.hr_phone),
            )?;
            println!("Updated application #{}.", id);
        }

        Commands::Called { id } => {
            tracker.mark_called(id)?;
            println!("Marked #{} as called.", id);
        }

        Commands::Inactive { id } => {
            tracker.mark_inactive(id)?;
            println!("Marked #{} as inactive.", id);
        }

        Commands::Delete { id } => {
            let removed = tracker.delete(id)?;
            println!("Deleted #{} ({}).", removed.id, removed.company);
        }

        Commands::Stats { filter } => {
            let filter = filter.into_filter();
            let stats = tracker.view(&filter, today).stats;
            println!("Filter: {}", export::describe_filter(&filter));
            println!("{:<8} {:>6} {:>6}", "", "APPS", "CALLS");
            println!("{:<8} {:>6} {:>6}", "Today", stats.today_apps, stats.today_calls);
            println!("{:<8} {:>6} {:>6}", "Week", stats.week_apps, stats.week_calls);
            println!("{:<8} {:>6} {:>6}", "Month", stats.month_apps, stats.month_calls);
            println!("Active: {}", stats.total_active);
            println!(
                "Daily goal: {}/{}",
                milestone::applied_on(tracker.applications(), today),
                tracker.daily_goal()
            );
        }

        Commands::Graph { job_type } => {
            let job_type = job_type.filter(|t| t != "All");
            let series = tracker.week_series(job_type.as_deref(), today);
            print!("{}", chart::render_week(&series, job_type.as_deref().unwrap_or("All")));
        }

        Commands::Export { filter, no_open } => {
            let filter = filter.into_filter();
            let view = tracker.view(&filter, today);
            let html = export::render_summary(&view.rows, &filter, Local::now().naive_local());
            let path = export::write_summary(tracker.store().dir(), &html)?;
            println!("Summary written to {}", path.display());
            if !no_open {
                if let Err(e) = export::open_in_browser(&path) {
                    eprintln!("Warning: {:#}", e);
                }
            }
        }

        Commands::Types { command } => match command {
            TypeCommands::List => {
                for t in tracker.job_types() {
                    println!("{}", t);
                }
            }
            TypeCommands::Add { name } => {
                tracker.add_job_type(&name)?;
                println!("Added job type '{}'.", name.trim());
            }
            TypeCommands::Remove { name } => {
                tracker.remove_job_type(&name)?;
                println!("Removed job type '{}'.", name);
            }
        },

        Commands::Backups => {
            let backups = tracker.store().list_backups()?;
            if backups.is_empty() {
                println!("No backups found.");
            } else {
                for path in backups {
                    println!("{}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
