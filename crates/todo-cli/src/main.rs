// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod signals;
mod views;

use anyhow::{Context, Result, anyhow};
use config::Config;
use std::env;
use std::path::PathBuf;
use todo_app::ViewKind;
use todo_db::Store;
use todo_tui::{CancelSignal, ViewChain};
use tracing::{error, info, warn};
use views::ViewFactory;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Must happen before any thread is spawned.
    todo_app::init_local_offset();

    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `todo --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = config.db_path()?;
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let keys = config.key_map()?;
    if options.check_only {
        let store = Store::open(&db_path).with_context(|| {
            format!(
                "open database {} -- if this path is wrong, set [storage].db_path or TODO_DB",
                db_path.display()
            )
        })?;
        store.bootstrap()?;
        return Ok(());
    }

    let log_path = config.log_path()?;
    let _log_guard = logging::init_logging(&log_path, config.log_level())
        .with_context(|| format!("initialize logging at {}", log_path.display()))?;
    info!(view = options.view.as_str(), db = %db_path.display(), "starting todo");

    // Logged here so the event is flushed before the guard drops.
    let result = run_views(options.view, ViewFactory::new(db_path, keys));
    if let Err(error) = &result {
        error!(error = %format!("{error:#}"), "todo exited with a fatal error");
    }
    result
}

fn run_views(first: ViewKind, factory: ViewFactory) -> Result<()> {
    let cancel = CancelSignal::new();
    signals::spawn_signal_watcher(cancel.clone())?;

    let report = ViewChain::in_terminal(|kind| factory.open(kind)).run(first, &cancel)?;
    for error in &report.errors {
        warn!(%error, "view reported an error");
        eprintln!("todo: {error}");
    }
    info!(views = report.visited.len(), "todo finished");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    view: ViewKind,
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        view: ViewKind::List,
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };
    let mut view_given = false;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            other => match ViewKind::parse(other) {
                Some(view) if !view_given => {
                    options.view = view;
                    view_given = true;
                }
                Some(_) => {
                    return Err(anyhow!(
                        "only one view may be given, found {other:?}; run with --help to see supported options"
                    ));
                }
                None => {
                    return Err(anyhow!(
                        "unknown argument {other:?}; run with --help to see supported options"
                    ));
                }
            },
        }
    }

    Ok(options)
}

fn print_help() {
    println!("todo [list|add] [options]");
    println!("  list                     Open the task list (default)");
    println!("  add                      Open the add-task form");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and database, then exit");
    println!("  --help                   Show this help");
}
