//! Command-line interface for tb
//!
//! This module defines the CLI structure using clap derive macros.
//! Each group of subcommands is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod archive;
mod context;
mod maintenance;
mod task;

pub use context::GlobalOptions;
pub use task::{deadline_after, parse_deadline, parse_duration};

/// tb - a four-column to-do board
///
/// Short, medium, long and daily tasks with deadline countdowns, a nightly
/// reset for dailies, and an archive of deleted tasks.
#[derive(Parser, Debug)]
#[command(name = "tb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the board (store.json, config.toml)
    #[arg(long, global = true, env = "TB_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (defaults to config.toml in the data directory)
    #[arg(long, global = true, env = "TB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task text (at least 5 characters by default)
        text: String,

        /// Column type: short, medium, long, daily
        #[arg(short, long, default_value = "short")]
        column: String,

        /// Deadline as an RFC 3339 timestamp (ignored for daily tasks)
        #[arg(long, conflicts_with = "within")]
        deadline: Option<String>,

        /// Deadline relative to now (e.g., "2h", "3d")
        #[arg(long = "in", value_name = "DURATION")]
        within: Option<String>,
    },

    /// List tasks with time left and urgency
    List {
        /// Only show one column type
        #[arg(short, long)]
        column: Option<String>,
    },

    /// Advance a task: idle -> in_progress -> done
    Click {
        /// Task id or unique prefix
        id: String,
    },

    /// Set a task's status directly
    Status {
        /// Task id or unique prefix
        id: String,

        /// idle, in_progress, or done
        status: String,
    },

    /// Delete a task into the archive
    Delete {
        /// Task id or unique prefix
        id: String,
    },

    /// Move a task to another column
    Move {
        /// Task id or unique prefix
        id: String,

        /// Target column type (or column id)
        to: String,
    },

    /// Restore an archived task as idle
    Restore {
        /// Archived task id or unique prefix
        id: String,
    },

    /// Deleted-task archive
    #[command(subcommand)]
    Archive(ArchiveCommands),

    /// Reset the board to its default empty columns
    Reset {
        /// Also clear every key in the store, not just the board
        #[arg(long)]
        hard: bool,
    },

    /// Completion counts and the day/year clocks
    Stats,

    /// Run the day-boundary check now
    Reconcile,

    /// Open the interactive terminal board
    Board,
}

/// Archive subcommands
#[derive(Subcommand, Debug)]
pub enum ArchiveCommands {
    /// List archived tasks
    List,

    /// Permanently drop every archived task
    Clear,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = GlobalOptions {
            data_dir: self.data_dir,
            config: self.config,
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Add {
                text,
                column,
                deadline,
                within,
            } => task::run_add(task::AddOptions {
                text,
                column,
                deadline,
                within,
                globals,
            }),
            Commands::List { column } => task::run_list(task::ListOptions { column, globals }),
            Commands::Click { id } => task::run_click(task::ClickOptions { id, globals }),
            Commands::Status { id, status } => {
                task::run_status(task::StatusOptions { id, status, globals })
            }
            Commands::Delete { id } => task::run_delete(task::DeleteOptions { id, globals }),
            Commands::Move { id, to } => task::run_move(task::MoveOptions { id, to, globals }),
            Commands::Restore { id } => archive::run_restore(archive::RestoreOptions { id, globals }),
            Commands::Archive(cmd) => match cmd {
                ArchiveCommands::List => archive::run_list(globals),
                ArchiveCommands::Clear => archive::run_clear(globals),
            },
            Commands::Reset { hard } => {
                maintenance::run_reset(maintenance::ResetOptions { hard, globals })
            }
            Commands::Stats => maintenance::run_stats(globals),
            Commands::Reconcile => maintenance::run_reconcile(globals),
            Commands::Board => {
                let ctx = context::open_board(&globals)?;
                crate::ui::board::run(ctx.store, ctx.storage)
            }
        }
    }
}
