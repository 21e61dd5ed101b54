//! Command dispatch: settings, service wiring and output

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::AssignmentService;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::render::TreeNodeConvert;
use crate::config::{expand_path, global_config_path, local_config_path, Settings};
use crate::domain::{MemberId, Node, Operation};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `shepherd --help`".to_string(),
        ));
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = load_settings(cli.roster.as_deref())?;
    debug!("roster file: {}", settings.roster_file.display());

    if let Commands::Config { command } = command {
        return cmd_config(command, &settings);
    }

    let container = ServiceContainer::new(settings);
    let service = container.assignment_service();
    let settings = &container.settings;

    match command {
        Commands::Tree => cmd_tree(&service, &settings.hierarchy.root_label),
        Commands::Children { node } => cmd_children(&service, node),
        Commands::Occupancy { node } => cmd_occupancy(&service, node),
        Commands::Path { id } => cmd_path(&service, id, &settings.hierarchy.root_label),
        Commands::Unassigned => cmd_unassigned(&service),
        Commands::Leaders => cmd_leaders(&service),
        Commands::Assign {
            target,
            ids,
            dry_run,
        } => run_operation(
            &service,
            Operation::Assign {
                candidates: ids.clone(),
                target: target.clone(),
            },
            *dry_run,
        ),
        Commands::Remove { id, dry_run } => run_operation(
            &service,
            Operation::Remove { member: id.clone() },
            *dry_run,
        ),
        Commands::Replace {
            outgoing,
            incoming,
            successor,
            dry_run,
        } => run_operation(
            &service,
            Operation::Replace {
                outgoing: outgoing.clone(),
                incoming: incoming.clone(),
                successor: successor.clone(),
            },
            *dry_run,
        ),
        Commands::Swap {
            first,
            second,
            dry_run,
        } => run_operation(
            &service,
            Operation::Swap {
                first: first.clone(),
                second: second.clone(),
            },
            *dry_run,
        ),
        Commands::Reconcile { dry_run } => {
            run_operation(&service, Operation::Reconcile, *dry_run)
        }
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

/// Settings for the chosen roster; `-f` wins over the configured roster file.
fn load_settings(roster: Option<&Path>) -> CliResult<Settings> {
    match roster {
        Some(path) => {
            let path = PathBuf::from(expand_path(&path.to_string_lossy()));
            let mut settings = Settings::load(path.parent())?;
            settings.roster_file = path;
            Ok(settings)
        }
        None => {
            let settings = Settings::load(None)?;
            let local_dir = settings
                .roster_file
                .parent()
                .filter(|dir| local_config_path(dir).exists())
                .map(Path::to_path_buf);
            match local_dir {
                Some(dir) => Ok(Settings::load(Some(&dir))?),
                None => Ok(settings),
            }
        }
    }
}

#[instrument(skip(service))]
fn cmd_tree(service: &AssignmentService, root_label: &str) -> CliResult<()> {
    let view = service.view(root_label)?;
    let max = service.policy().max_fan_out;

    output::info(&view.active.to_tree_string(max));

    if !view.detached.is_empty() {
        output::header("Detached");
        for tree in &view.detached {
            output::info(&tree.to_tree_string(max));
        }
    }
    if !view.unassigned.is_empty() {
        output::header("Unassigned");
        output::detail(&view.unassigned.iter().join(", "));
    }
    Ok(())
}

#[instrument(skip(service))]
fn cmd_children(service: &AssignmentService, node: &Node) -> CliResult<()> {
    let roster = service.snapshot()?;
    for member in roster.children_of(node)? {
        output::info(&member.label());
    }
    Ok(())
}

#[instrument(skip(service))]
fn cmd_occupancy(service: &AssignmentService, node: &Node) -> CliResult<()> {
    let roster = service.snapshot()?;
    output::info(&format!(
        "{}: {}/{}",
        node,
        roster.occupancy(node)?,
        roster.policy().max_fan_out
    ));
    Ok(())
}

#[instrument(skip(service))]
fn cmd_path(service: &AssignmentService, id: &MemberId, root_label: &str) -> CliResult<()> {
    let roster = service.snapshot()?;
    let path = roster.path_to_root(id)?;
    let chain = path.iter().join(" -> ");
    if roster.is_rooted(id)? {
        output::info(&format!("{} -> {}", root_label, chain));
    } else {
        output::info(&chain);
        output::warning(&format!("{} is not connected to {}", id, root_label));
    }
    Ok(())
}

fn cmd_unassigned(service: &AssignmentService) -> CliResult<()> {
    let roster = service.snapshot()?;
    for member in roster.unassigned() {
        output::info(&member.label());
    }
    Ok(())
}

fn cmd_leaders(service: &AssignmentService) -> CliResult<()> {
    let roster = service.snapshot()?;
    for member in roster.leaders() {
        let occupancy = roster.occupancy(&Node::Member(member.id.clone()))?;
        output::info(&format!(
            "{} [{}/{}]",
            member.label(),
            occupancy,
            roster.policy().max_fan_out
        ));
    }
    Ok(())
}

#[instrument(skip(service, operation), fields(op = operation.name()))]
fn run_operation(
    service: &AssignmentService,
    operation: Operation,
    dry_run: bool,
) -> CliResult<()> {
    if dry_run {
        let changes = service.plan(&operation)?;
        if changes.is_empty() {
            output::info("nothing to change");
        } else {
            output::header(&format!("{} (dry run)", operation.name()));
            output::changes(&changes);
            for warning in &changes.warnings {
                output::warning(warning);
            }
        }
        return Ok(());
    }

    let outcome = service.execute(&operation)?;
    if outcome.changes.is_empty() {
        output::info("nothing to change");
        return Ok(());
    }
    // warnings of applied operations are logged by the service
    output::changes(&outcome.changes);
    output::success(&format!(
        "{}: {} member(s) updated",
        operation.name(),
        outcome.changes.patches.len()
    ));
    Ok(())
}

fn cmd_config(command: &ConfigCommands, settings: &Settings) -> CliResult<()> {
    let local = settings.roster_file.parent().map(local_config_path);
    match command {
        ConfigCommands::Show => {
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            let describe = |path: &Option<PathBuf>| match path {
                Some(p) if p.exists() => format!("{} (exists)", p.display()),
                Some(p) => format!("{} (not found)", p.display()),
                None => "unavailable".to_string(),
            };
            output::action("Global", &describe(&global_config_path()));
            output::action("Local", &describe(&local));
        }
        ConfigCommands::Init { global } => {
            let target = if *global { global_config_path() } else { local };
            let path = target
                .ok_or_else(|| CliError::Usage("cannot determine config location".to_string()))?;
            if path.exists() {
                return Err(InfraError::AlreadyExists(path).into());
            }
            let fs = RealFileSystem;
            fs.ensure_parent(&path)
                .and_then(|()| fs.write(&path, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("created {}", path.display()));
        }
    }
    Ok(())
}
