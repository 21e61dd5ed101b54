//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::{MemberId, Node};

/// Counselor/counselee hierarchy manager: capacity-bounded pastoral-care trees
#[derive(Parser, Debug)]
#[command(name = "shepherd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (repeat for more: -d -d -d)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Roster file (default: from config)
    #[arg(short = 'f', long, global = true, value_hint = ValueHint::FilePath)]
    pub roster: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the hierarchy as a tree
    Tree,

    /// List direct counselees of a node
    Children {
        /// `root` or a member id
        node: Node,
    },

    /// Show how many slots of a node are taken
    Occupancy {
        /// `root` or a member id
        node: Node,
    },

    /// Show the chain from the root tier down to a member
    Path {
        /// Member id
        id: MemberId,
    },

    /// List members outside the hierarchy
    Unassigned,

    /// List counselors: root tier and anyone with counselees
    Leaders,

    /// Place members under a node
    Assign {
        /// `root` or a member id
        target: Node,
        /// Members to place
        #[arg(required = true, num_args = 1..)]
        ids: Vec<MemberId>,
        /// Print the patches without persisting
        #[arg(long)]
        dry_run: bool,
    },

    /// Take a member out of the hierarchy
    Remove {
        /// Member id
        id: MemberId,
        /// Print the patches without persisting
        #[arg(long)]
        dry_run: bool,
    },

    /// Put an unassigned member into another member's position
    Replace {
        /// Member leaving the position
        outgoing: MemberId,
        /// Member taking over the position
        incoming: MemberId,
        /// Unassigned member inheriting the incoming member's counselees
        #[arg(short, long)]
        successor: Option<MemberId>,
        /// Print the patches without persisting
        #[arg(long)]
        dry_run: bool,
    },

    /// Exchange the positions of two members
    Swap {
        first: MemberId,
        second: MemberId,
        /// Print the patches without persisting
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear root roles shadowed by a counselor assignment
    Reconcile {
        /// Print the patches without persisting
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
