use anchorwise_core::{
    AnchorScheduler, CalendarSource, RescheduleReason, TaskQuery, TaskStore, completion_metrics, fetch_or_empty,
    format_availability_for_prompt, format_calendar_context, format_minute, lookup_anchor, resolve_anchor_timestamp,
};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod file_store;
#[cfg(feature = "gcal")]
mod google_calendar;
mod state;

use config::{CalendarBackend, Config, load_config};
use file_store::{JsonCalendarSource, JsonTaskStore, JsonlAuditSink};

#[derive(Parser, Debug)]
#[command(
    name = "anchorwise",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("ANCHORWISE_BUILD_SHA"), ")"),
    about = "Anchor availability and adaptive rescheduling"
)]
struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Override config.user_id
    #[arg(long, global = true)]
    user: Option<String>,

    /// Override config.timezone (IANA name)
    #[arg(long, global = true)]
    tz: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve an anchor name to a concrete timestamp
    Resolve {
        anchor: String,

        /// Base date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Free anchors per day, checked against calendar + open tasks
    Availability {
        /// Days to check, starting today (default from config)
        #[arg(long)]
        days: Option<u32>,

        /// Task length in minutes (default from config)
        #[arg(long)]
        duration: Option<i64>,

        /// Comma-separated anchors (default from config)
        #[arg(long, value_delimiter = ',')]
        anchors: Option<Vec<String>>,

        /// Print JSON instead of the prompt summary
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Next free slot for an anchor preference, starting tomorrow
    FindSlot {
        preference: String,

        /// Estimated minutes (default from config)
        #[arg(long)]
        minutes: Option<i64>,
    },

    /// Move one task to its next free slot
    Reschedule {
        task_id: String,

        #[arg(long, value_enum, default_value_t = ReasonArg::UserRequested)]
        reason: ReasonArg,
    },

    /// Reschedule every open task more than an hour overdue
    Sweep,

    /// Completion / on-time / reschedule-success rates
    Metrics {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Tasks whose reminder is due now
    Reminders {
        /// Mark listed reminders as sent
        #[arg(long, default_value_t = false)]
        mark_sent: bool,
    },

    /// List the user's tasks
    Tasks {
        /// Include completed tasks
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Calendar commands
    Calendar {
        #[command(subcommand)]
        command: CalendarCommand,
    },

    /// Config commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CalendarCommand {
    /// Upcoming events from the configured backend
    Show {
        #[arg(long, default_value_t = 3)]
        days: u32,
    },

    /// Connect Google Calendar (OAuth installed-app flow)
    #[cfg(feature = "gcal")]
    Connect,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.anchorwise/config.toml with defaults
    Init,
    /// Print the effective config
    Show,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReasonArg {
    UserRequested,
    AutoMissedDeadline,
}

impl From<ReasonArg> for RescheduleReason {
    fn from(r: ReasonArg) -> Self {
        match r {
            ReasonArg::UserRequested => RescheduleReason::UserRequested,
            ReasonArg::AutoMissedDeadline => RescheduleReason::AutoMissedDeadline,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

/// Effective settings after CLI overrides.
struct Ctx {
    cfg: Config,
    user_id: String,
    tz: Tz,
}

impl Ctx {
    fn load(user: Option<&str>, tz: Option<&str>) -> Result<Self> {
        let mut cfg = load_config()?;
        if let Some(tz) = tz {
            cfg.timezone = tz.to_string();
        }
        let tz = cfg.tz()?;
        let user_id = user.map(str::to_string).unwrap_or_else(|| cfg.user_id.clone());
        tracing::debug!(user_id = %user_id, tz = %tz, "loaded config");
        Ok(Self { cfg, user_id, tz })
    }

    fn calendar(&self) -> Result<Option<Arc<dyn CalendarSource>>> {
        match self.cfg.calendar.backend {
            CalendarBackend::None => Ok(None),
            CalendarBackend::File => Ok(Some(Arc::new(JsonCalendarSource::new(state::calendar_path()?, self.tz)))),
            #[cfg(feature = "gcal")]
            CalendarBackend::Google => Ok(Some(Arc::new(google_calendar::GoogleCalendarSource::new(
                self.cfg.calendar.calendar_id.clone(),
            )))),
            #[cfg(not(feature = "gcal"))]
            CalendarBackend::Google => {
                bail!("calendar.backend = \"google\" needs a build with --features gcal")
            }
        }
    }

    fn scheduler(&self) -> Result<AnchorScheduler> {
        let mut s = AnchorScheduler::new()
            .with_task_store(Arc::new(JsonTaskStore::new(state::tasks_path()?)))
            .with_audit_sink(Arc::new(JsonlAuditSink::new(state::audit_log_path()?)));
        if let Some(cal) = self.calendar()? {
            s = s.with_calendar(cal);
        }
        Ok(s)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        verbose,
        user,
        tz,
        command,
    } = Cli::parse();
    init_tracing(verbose);

    let load = || Ctx::load(user.as_deref(), tz.as_deref());

    match command {
        Command::Resolve { anchor, date } => {
            let ctx = load()?;
            let at = resolve_anchor_timestamp(&anchor, ctx.tz, date);
            match lookup_anchor(&anchor) {
                Some((key, _)) => println!("{}  (matched \"{}\")", at.to_rfc3339(), key),
                None => println!("{}  (no match; default afternoon)", at.to_rfc3339()),
            }
        }

        Command::Availability {
            days,
            duration,
            anchors,
            json,
        } => {
            let ctx = load()?;
            let anchors = anchors.unwrap_or_else(|| ctx.cfg.anchors.clone());
            if anchors.is_empty() {
                bail!("no anchors configured (set `anchors` in config.toml or pass --anchors)");
            }
            let map = ctx
                .scheduler()?
                .compute_availability(
                    &ctx.user_id,
                    &anchors,
                    days.unwrap_or(ctx.cfg.availability.days_ahead),
                    duration.unwrap_or(ctx.cfg.availability.task_duration_minutes),
                    ctx.tz,
                )
                .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                println!("{}", format_availability_for_prompt(&map));
            }
        }

        Command::FindSlot { preference, minutes } => {
            let ctx = load()?;
            let slot = ctx
                .scheduler()?
                .find_next_available_slot(
                    &ctx.user_id,
                    &preference,
                    minutes.unwrap_or(ctx.cfg.slots.estimated_minutes),
                    ctx.tz,
                )
                .await;
            println!("{}  {}", format_minute(&slot.scheduled_at), slot.scheduled_text);
        }

        Command::Reschedule { task_id, reason } => {
            let ctx = load()?;
            let outcome = ctx
                .scheduler()?
                .try_reschedule_task(&task_id, &ctx.user_id, reason.into(), ctx.tz)
                .await
                .with_context(|| format!("rescheduling {task_id}"))?;
            println!(
                "{}: {} -> {} ({})",
                outcome.event.task_name, outcome.event.original_date, outcome.event.new_date, outcome.slot.scheduled_text
            );
        }

        Command::Sweep => {
            let ctx = load()?;
            let moved = ctx.scheduler()?.detect_and_reschedule_missed(&ctx.user_id, ctx.tz).await;
            if moved.is_empty() {
                println!("No missed tasks.");
            } else {
                println!("Rescheduled {} task(s):", moved.len());
                for id in moved {
                    println!("- {id}");
                }
            }
        }

        Command::Metrics { json } => {
            let ctx = load()?;
            let store = JsonTaskStore::new(state::tasks_path()?);
            let tasks = store
                .query_tasks(&ctx.user_id, &TaskQuery::all())
                .await?;
            let m = completion_metrics(&tasks);
            if json {
                println!("{}", serde_json::to_string_pretty(&m)?);
            } else {
                println!("Tasks:               {}", m.total_tasks);
                println!("Completed:           {} ({}%)", m.completed_tasks, m.completion_rate);
                println!("On time:             {}%", m.on_time_rate);
                println!("Rescheduled:         {}", m.rescheduled_tasks);
                println!("Reschedule success:  {}%", m.reschedule_success_rate);
            }
        }

        Command::Reminders { mark_sent } => {
            let ctx = load()?;
            let scheduler = ctx.scheduler()?;
            let due = scheduler
                .collect_due_reminders(&ctx.user_id, ctx.tz, ctx.cfg.reminders)
                .await;
            if due.is_empty() {
                println!("No reminders due.");
            }
            for r in &due {
                println!("- {} at {} [{}]", r.task_name, r.when_text, r.task_id);
                if mark_sent {
                    scheduler
                        .mark_reminder_sent(&r.task_id)
                        .await
                        .with_context(|| format!("marking reminder for {}", r.task_id))?;
                }
            }
        }

        Command::Tasks { all } => {
            let ctx = load()?;
            let query = if all { TaskQuery::all() } else { TaskQuery::not_completed() };
            let store = JsonTaskStore::new(state::tasks_path()?);
            let tasks = store.query_tasks(&ctx.user_id, &query).await?;
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for t in &tasks {
                let when = t
                    .scheduled_time()
                    .map(|at| format_minute(&at.in_zone(ctx.tz)))
                    .unwrap_or_else(|| "unscheduled".to_string());
                println!(
                    "[{:?}] {} | {} | {} ({}m){}",
                    t.status,
                    t.id,
                    t.name(),
                    when,
                    t.duration_minutes(),
                    if t.was_rescheduled { " | rescheduled" } else { "" }
                );
            }
        }

        Command::Calendar { command } => match command {
            CalendarCommand::Show { days } => {
                let ctx = load()?;
                let events = match ctx.calendar()? {
                    Some(cal) => fetch_or_empty("calendar", cal.fetch_busy_events(&ctx.user_id, days)).await,
                    None => Vec::new(),
                };
                println!("{}", format_calendar_context(&events, days, ctx.tz));
            }
            #[cfg(feature = "gcal")]
            CalendarCommand::Connect => google_calendar::connect_interactive().await?,
        },

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = load_config()?;
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}
