use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tasktree::config::{ConfigResolver, Settings};
use tasktree::diagnostics::{DiagnosticSink, JsonlDiagnostics};
use tasktree::orchestrator::{Orchestrator, TickOutcome};
use tasktree::runner::{ControlLoop, LoopConfig};
use tasktree::sim::{Scenario, ScriptedTask, SimContext, SimReport, Simulation};
use tasktree::{StatusReason, SystemClock};

mod cli;

use cli::Cli;
use cli::commands::Commands;

/// Tick cap for `--instant` runs without an explicit one.
const DEFAULT_INSTANT_MAX_TICKS: u64 = 100_000;

fn setup_logging(cli: &Cli, settings: &Settings) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tasktree")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("tasktree.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = if cli.is_verbose() {
        "debug"
    } else {
        settings.log_level.as_deref().unwrap_or("info")
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, settings: &Settings) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run {
            scenario,
            max_ticks,
            tick_ms,
            json,
            instant,
        } => handle_run_command(scenario, *max_ticks, *tick_ms, *json, *instant, settings),
        Commands::Validate { scenario } => handle_validate_command(scenario),
        Commands::Config => handle_config_command(settings),
    }
}

fn diagnostics_sink(settings: &Settings) -> Result<Option<Box<dyn DiagnosticSink>>> {
    if !settings.diagnostics.enabled {
        return Ok(None);
    }
    let sink = JsonlDiagnostics::new(&settings.diagnostics.dir).context("Failed to open diagnostics directory")?;
    info!("Timeout snapshots go to {}", sink.path().display());
    Ok(Some(Box::new(sink)))
}

fn handle_run_command(
    path: &Path,
    max_ticks: Option<u64>,
    tick_ms: Option<u64>,
    json: bool,
    instant: bool,
    settings: &Settings,
) -> Result<()> {
    let scenario = Scenario::load(path).context(format!("Failed to load scenario {}", path.display()))?;

    let mut scheduler = settings.scheduler.clone();
    if let Some(ms) = tick_ms {
        if ms == 0 {
            eyre::bail!("--tick-ms must be > 0");
        }
        scheduler = scheduler.with_tick_interval_ms(ms);
    }
    let max_ticks = max_ticks.or(scenario.max_ticks);
    let resolver = ConfigResolver::new(settings);
    info!(
        "Running scenario {} ({} nodes, instant={}, max_ticks={:?})",
        scenario.name,
        scenario.node_count(),
        instant,
        max_ticks
    );

    let report = if instant {
        let mut simulation = Simulation::new(&scenario, scheduler, resolver)?;
        if let Some(sink) = diagnostics_sink(settings)? {
            simulation = simulation.with_diagnostics(sink);
        }
        simulation.run(max_ticks.unwrap_or(DEFAULT_INSTANT_MAX_TICKS))
    } else {
        run_realtime(&scenario, scheduler, resolver, max_ticks, settings)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_realtime(
    scenario: &Scenario,
    scheduler: tasktree::SchedulerConfig,
    resolver: ConfigResolver,
    max_ticks: Option<u64>,
    settings: &Settings,
) -> Result<SimReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    runtime.block_on(drive_scenario(scenario, scheduler, resolver, max_ticks, settings))
}

async fn drive_scenario(
    scenario: &Scenario,
    scheduler: tasktree::SchedulerConfig,
    resolver: ConfigResolver,
    max_ticks: Option<u64>,
    settings: &Settings,
) -> Result<SimReport> {
    let mut loop_config = LoopConfig::from(&scheduler);
    if let Some(max) = max_ticks {
        loop_config = loop_config.with_max_ticks(max);
    }

    let mut orchestrator = Orchestrator::new(scheduler).with_clock(Arc::new(SystemClock));
    if let Some(sink) = diagnostics_sink(settings)? {
        orchestrator = orchestrator.with_diagnostics(sink);
    }

    let mut ctx = SimContext::new(resolver);
    orchestrator.set_root_task(&mut ctx, Some(ScriptedTask::boxed(scenario.root.clone())))?;

    let mut control = ControlLoop::new(orchestrator, loop_config);
    let stop = control.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping");
            stop.stop();
        }
    });

    let summary = control.run(&mut ctx).await;
    Ok(SimReport {
        scenario: scenario.name.clone(),
        ticks: summary.ticks,
        errors: summary.errors,
        outcome: summary.last_outcome,
        stats: summary.stats,
        held_keys: ctx.held_keys().into_iter().map(String::from).collect(),
        journal: ctx.journal().to_vec(),
        final_tree: summary.final_tree,
    })
}

fn print_report(report: &SimReport) {
    println!("{} {}", "Scenario:".bold(), report.scenario.cyan());
    println!();

    for event in &report.journal {
        let line = format!("{:>5}  {:<16} {}", event.tick, event.task, event.event);
        let colored_line = match event.event.as_str() {
            "timeout" => line.red(),
            "interrupt" => line.yellow(),
            "complete" => line.green(),
            "ignored" | "restart" => line.blue(),
            _ => line.normal(),
        };
        println!("{}", colored_line);
    }

    if let Some(tree) = &report.final_tree {
        println!();
        print!("{}", tree.render());
    }

    println!();
    let outcome = match report.outcome {
        Some(TickOutcome::TreeCompleted(StatusReason::Completed)) => "completed".green(),
        Some(TickOutcome::TreeCompleted(reason)) => reason.as_str().red(),
        Some(TickOutcome::Idle) => "idle".normal(),
        Some(TickOutcome::Running) | Some(TickOutcome::Restarted) => "stopped while running".yellow(),
        None => "no successful tick".red(),
    };
    println!("{} {} after {} tick(s)", "Outcome:".bold(), outcome, report.ticks);
    println!(
        "  completed={} ignored={} timeouts={} restarts={} interrupts={} errors={}",
        report.stats.completed,
        report.stats.ignored,
        report.stats.timeouts,
        report.stats.restarts,
        report.stats.interrupts,
        report.errors
    );

    if !report.held_keys.is_empty() {
        println!("{} {}", "Leaked keys:".red().bold(), report.held_keys.join(", "));
    }
}

fn handle_validate_command(path: &Path) -> Result<()> {
    info!("Validating scenario {}", path.display());
    let scenario = Scenario::load(path).context(format!("Invalid scenario {}", path.display()))?;

    println!(
        "{} {} ({} nodes)",
        "Valid:".green(),
        scenario.name,
        scenario.node_count()
    );
    if let Some(description) = &scenario.description {
        println!("  {}", description);
    }

    let mut stack = vec![(&scenario.root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        println!("  {}{} [{}]", "  ".repeat(depth), node.display_name(), node.kind);
        for child in node.children.iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    Ok(())
}

fn handle_config_command(settings: &Settings) -> Result<()> {
    info!("Printing effective configuration");
    print!("{}", serde_yaml::to_string(settings).context("Failed to serialize config")?);
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the configured level is known
    setup_logging(&cli, &settings).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &settings).context("Application failed")?;

    Ok(())
}
