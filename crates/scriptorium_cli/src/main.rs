//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `scriptorium_core` linkage.
//! - Open (or create) one project and print its tree and tags.
//!
//! Usage: `scriptorium [PROJECT_FILE]`. A missing file is created from the
//! starter template. `SCRIPTORIUM_LOG_DIR` enables file logging.

use log::info;
use scriptorium_core::{
    default_log_level, init_logging, HubResult, ItemRole, ProjectId, ProjectRegistry,
    ProjectTemplate, SqliteProjectManager,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Some(log_dir) = std::env::var_os("SCRIPTORIUM_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), PathBuf::from(log_dir)) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("scriptorium_core ping={}", scriptorium_core::ping());
    println!("scriptorium_core version={}", scriptorium_core::core_version());

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    match run(path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error[{}]: {err}", err.code());
            ExitCode::FAILURE
        }
    }
}

fn run(path: Option<PathBuf>) -> HubResult<()> {
    let mut registry = ProjectRegistry::new(SqliteProjectManager::new());
    let project_id = match path.as_deref() {
        Some(path) if path.is_file() => registry.open(path)?,
        Some(path) => registry.create(ProjectTemplate::Starter, Some(path))?,
        None => registry.create(ProjectTemplate::Starter, None)?,
    };
    info!("event=cli_probe module=cli status=ok project_id={project_id}");

    print_tree(&mut registry, project_id)?;
    print_tags(&mut registry, project_id)?;
    registry.close_all()
}

fn print_tree(
    registry: &mut ProjectRegistry<SqliteProjectManager>,
    project_id: ProjectId,
) -> HubResult<()> {
    let tree = registry.tree();
    let mut cache = tree.load_cache(project_id)?;
    println!("tree items={}", cache.len());
    for index in 0..cache.len() {
        let depth = cache.items()[index].indent_level();
        let name = tree.cached_field(&mut cache, index, ItemRole::Name)?;
        let words = tree.cached_field(&mut cache, index, ItemRole::WordCount)?;
        println!(
            "{}- {} ({} words)",
            "  ".repeat(depth),
            name.as_text().unwrap_or_default(),
            words.as_integer().unwrap_or_default()
        );
    }
    Ok(())
}

fn print_tags(
    registry: &mut ProjectRegistry<SqliteProjectManager>,
    project_id: ProjectId,
) -> HubResult<()> {
    let tags = registry.tags();
    let tag_ids = tags.all_tag_ids(project_id)?;
    println!("tags count={}", tag_ids.len());
    for tag_id in tag_ids {
        let items = tags.items_of_tag(project_id, tag_id)?;
        println!("{} items={}", tags.tag_name(project_id, tag_id)?, items.len());
    }
    Ok(())
}
