//! CLI interface for jobdesk.
//!
//! Each subcommand is non-interactive: arguments in, plain lines out.
//! Every command runs as one principal, resolved from `--as`,
//! `JOBDESK_IDENTITY` or the configured default identity.
//!
//! Commands split into three groups:
//!
//! - `jobdesk archive add|list`: the containers jobs are filed under.
//! - `jobdesk job ...`: listing, publishing and scheduling jobs.
//! - `jobdesk check`: ask whether a raw command would be allowed.

mod format;

use std::collections::BTreeSet;
use std::fmt;

use clap::{Parser, Subcommand};
use jiff::civil::{Date, Time};

use crate::calendar::CalendarError;
use crate::config::Config;
use crate::identity::resolve_identity;
use crate::model::{Archive, ArchiveId, EntityKind, Principal, RecordId};
use crate::storage::StorageError;
use crate::workflow::{JobDraft, Workflow, WorkflowError};

use format::{format_archive, format_record, format_snapshot};

/// jobdesk: scheduled job listings with archive-scoped access.
#[derive(Debug, Parser)]
#[command(name = "jobdesk", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Identity to act as. Overrides `JOBDESK_IDENTITY` and the configured
    /// default identity.
    #[arg(long = "as", global = true)]
    identity: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow: publishing a job
  1. jobdesk --as root archive add 5 'Engineering'
  2. jobdesk --as editor job add --archive 5 --date 2024-03-15 --time 14:30 'Welder'
     → prints the job line, including its id (e.g. #12)
  3. jobdesk --as editor job publish 12
  4. jobdesk --as editor job history 12

Links rendered by `job list` can be followed directly:
  jobdesk --as editor job follow 'act=toggle&tid=12&state='";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage archives.
    Archive {
        #[command(subcommand)]
        command: ArchiveCommand,
    },

    /// List, publish and schedule jobs.
    Job {
        #[command(subcommand)]
        command: JobCommand,
    },

    /// Check whether the acting identity may run a raw command.
    ///
    /// Exits 0 when allowed, 2 for a malformed command, 3 when denied and
    /// 4 when the job does not exist.
    Check {
        /// Operation name (`edit`, `toggle`, `deleteAll`, ...). Omit to
        /// check access to an archive listing.
        #[arg(long)]
        act: Option<String>,

        /// Job id for single-job operations, archive id otherwise.
        #[arg(long)]
        id: Option<i64>,

        /// Parent archive id for `create`.
        #[arg(long)]
        pid: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ArchiveCommand {
    /// Create an archive. Administrators only.
    Add {
        /// Archive id. Must be positive.
        id: i64,

        title: String,
    },

    /// List the archives the acting identity may access.
    List,
}

#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// Create a job. Prints the new job.
    Add {
        #[arg(long)]
        archive: i64,

        title: String,

        /// Scheduled day (`YYYY-MM-DD`). Defaults to today.
        #[arg(long)]
        date: Option<Date>,

        /// Scheduled time of day (`HH:MM[:SS]`). Defaults to now.
        #[arg(long)]
        time: Option<Time>,

        /// Publish right away.
        #[arg(long)]
        published: bool,
    },

    /// List the jobs of an archive, latest schedule first.
    List {
        #[arg(long)]
        archive: i64,
    },

    /// Make a job visible.
    Publish { id: i64 },

    /// Hide a job.
    Unpublish { id: i64 },

    /// Follow a toggle link (`tid=<id>&state=<1|>`).
    Follow { query: String },

    /// Move a job to another day and/or time of day.
    Reschedule {
        id: i64,

        #[arg(long)]
        date: Option<Date>,

        #[arg(long)]
        time: Option<Time>,
    },

    /// Show a job's version history, oldest first.
    History {
        id: i64,

        /// Print the snapshots as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Narrow a selection of job ids to those filed under an archive.
    Select {
        #[arg(long)]
        archive: i64,

        ids: Vec<i64>,
    },
}

/// A failed command: the message for stderr and the process exit code.
#[derive(Debug)]
pub struct Failure {
    pub code: i32,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self { code: 1, message }
    }
}

impl From<WorkflowError> for Failure {
    fn from(e: WorkflowError) -> Self {
        Self {
            code: e.exit_code(),
            message: e.to_string(),
        }
    }
}

impl From<StorageError> for Failure {
    fn from(e: StorageError) -> Self {
        WorkflowError::from(e).into()
    }
}

impl From<CalendarError> for Failure {
    fn from(e: CalendarError) -> Self {
        WorkflowError::from(e).into()
    }
}

/// Run the CLI against `workflow`.
pub fn run(config: &Config, workflow: &Workflow) -> Result<(), Failure> {
    let cli = Cli::parse();
    let name = resolve_identity(cli.identity.as_deref(), config)?;
    let principal = config.principal(&name);

    match cli.command {
        Command::Archive { command } => match command {
            ArchiveCommand::Add { id, title } => cmd_archive_add(workflow, &principal, id, title),
            ArchiveCommand::List => cmd_archive_list(workflow, &principal),
        },
        Command::Job { command } => run_job(workflow, &principal, command),
        Command::Check { act, id, pid } => {
            let command = workflow.check(&principal, act.as_deref(), id, pid)?;
            println!("allowed: {} {}", command.operation(), command.target());
            Ok(())
        }
    }
}

fn run_job(workflow: &Workflow, principal: &Principal, command: JobCommand) -> Result<(), Failure> {
    match command {
        JobCommand::Add {
            archive,
            title,
            date,
            time,
            published,
        } => {
            let calendar = workflow.calendar();
            let draft = JobDraft {
                title,
                date: date.map(|d| calendar.combine(d, Time::midnight())).transpose()?,
                time: time.map(|t| calendar.at_epoch(t)).transpose()?,
                published,
            };
            let record = workflow.create(principal, ArchiveId(archive), draft)?;
            println!("{}", format_record(calendar, &record, None));
            Ok(())
        }
        JobCommand::List { archive } => cmd_job_list(workflow, principal, archive),
        JobCommand::Publish { id } => cmd_toggle(workflow, principal, id, true),
        JobCommand::Unpublish { id } => cmd_toggle(workflow, principal, id, false),
        JobCommand::Follow { query } => {
            match workflow.handle_intent(principal, &query)? {
                Some(record) => println!("{}", format_record(workflow.calendar(), &record, None)),
                None => eprintln!("No toggle in link"),
            }
            Ok(())
        }
        JobCommand::Reschedule { id, date, time } => {
            let calendar = workflow.calendar();
            let date = date.map(|d| calendar.combine(d, Time::midnight())).transpose()?;
            let time = time.map(|t| calendar.at_epoch(t)).transpose()?;
            let record = workflow.reschedule(principal, RecordId(id), date, time)?;
            println!("{}", format_record(calendar, &record, None));
            Ok(())
        }
        JobCommand::History { id, json } => cmd_job_history(workflow, principal, id, json),
        JobCommand::Select { archive, ids } => {
            let candidates: BTreeSet<RecordId> = ids.into_iter().map(RecordId).collect();
            let kept = workflow.filter_selection(principal, ArchiveId(archive), &candidates)?;
            for id in kept {
                println!("{id}");
            }
            Ok(())
        }
    }
}

fn cmd_archive_add(
    workflow: &Workflow,
    principal: &Principal,
    id: i64,
    title: String,
) -> Result<(), Failure> {
    if !principal.is_administrator() {
        return Err(Failure {
            code: 3,
            message: format!("not enough permissions to create job archive ID {id}"),
        });
    }

    let archive = Archive {
        id: ArchiveId(id),
        title,
    };
    workflow.storage().create_archive(&archive)?;
    println!("{}", format_archive(&archive));
    Ok(())
}

fn cmd_archive_list(workflow: &Workflow, principal: &Principal) -> Result<(), Failure> {
    let archives: Vec<Archive> = workflow
        .storage()
        .list_archives()?
        .into_iter()
        .filter(|a| principal.may_access_archive(a.id))
        .collect();

    if archives.is_empty() {
        println!("No archives");
        return Ok(());
    }

    for archive in &archives {
        println!("{}", format_archive(archive));
    }
    Ok(())
}

fn cmd_job_list(workflow: &Workflow, principal: &Principal, archive: i64) -> Result<(), Failure> {
    workflow.check(principal, None, Some(archive), None)?;

    let records = workflow.storage().list_records(ArchiveId(archive))?;
    if records.is_empty() {
        println!("No jobs");
        return Ok(());
    }

    for record in &records {
        let link = workflow.toggle_link(principal, record);
        println!("{}", format_record(workflow.calendar(), record, link.as_deref()));
    }
    Ok(())
}

fn cmd_toggle(workflow: &Workflow, principal: &Principal, id: i64, published: bool) -> Result<(), Failure> {
    let record = workflow.toggle(principal, RecordId(id), published, None)?;
    println!("{}", format_record(workflow.calendar(), &record, None));
    Ok(())
}

fn cmd_job_history(workflow: &Workflow, principal: &Principal, id: i64, json: bool) -> Result<(), Failure> {
    workflow.check(principal, Some("show"), Some(id), None)?;

    let versions = workflow.storage().versions(EntityKind::Job, RecordId(id))?;

    if json {
        let json = serde_json::to_string_pretty(&versions)
            .map_err(|e| format!("failed to serialize history: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    if versions.is_empty() {
        println!("No versions");
        return Ok(());
    }

    for snapshot in &versions {
        println!("{}", format_snapshot(workflow.calendar(), snapshot));
    }
    Ok(())
}
