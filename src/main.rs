use std::io;
use std::path::PathBuf;
use std::process::exit;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use powertest::config::Defaults;
use powertest::observability::{log_snapshot, write_summary};
use powertest::pipeline::{PipelineExecutor, ScanStage};
use powertest::tools::{DirTool, Toolchain};
use powertest::{commands, prompt, report, target};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

const EXIT_NO_TARGET: i32 = 1;
const EXIT_NMAP_MISSING: i32 = 2;
const EXIT_NO_DIR_TOOL: i32 = 3;
const EXIT_NIKTO_MISSING: i32 = 4;
const EXIT_SQLMAP_MISSING: i32 = 5;

fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_tracing()?;

    match cli.command {
        Some(Commands::CheckTools) => {
            print_tool_statuses(&Toolchain::probe());
            Ok(())
        }
        None => interactive_run(),
    }
}

fn configure_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr; stdout belongs to the mirrored scanner output.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(())
}

fn print_tool_statuses(toolchain: &Toolchain) {
    for (name, present) in toolchain.statuses() {
        println!("  - {name}: {}", if present { "OK" } else { "MISSING" });
    }
}

fn interactive_run() -> Result<()> {
    println!("\nPowerTest (sequential) - verbose streaming\n");

    let defaults = Defaults::discover().unwrap_or_else(|err| {
        warn!("Falling back to built-in defaults: {err:#}");
        Defaults::default()
    });

    let target_raw = prompt::ask("Target (IP/hostname/URL)", "")?;
    if target_raw.is_empty() {
        eprintln!("No target provided. Exiting.");
        exit(EXIT_NO_TARGET);
    }
    let scheme = prompt::ask("Scheme if URL needed (http/https)", &defaults.scheme)?;
    let wordlist = PathBuf::from(prompt::ask(
        "Wordlist",
        &defaults.wordlist.to_string_lossy(),
    )?);
    let extensions = prompt::ask("Extensions (csv)", &defaults.extensions)?;
    let timeout_raw = prompt::ask("Timeout per command in seconds (0 = none)", "0")?;
    let timeout = prompt::parse_timeout_seconds(&timeout_raw);

    let target = match target::normalize(&target_raw, &scheme) {
        Ok(target) => target,
        Err(err) => {
            eprintln!("Invalid target: {err}");
            exit(EXIT_NO_TARGET);
        }
    };

    let stamp = report::timestamp();
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let outdir = report::create_run_dir(&cwd, &target.host, &stamp)?;
    println!(
        "\nReports -> {}\nNormalized: host={} url={}\n",
        outdir.display(),
        target.host,
        target.base_url
    );

    let toolchain = Toolchain::probe();
    print_tool_statuses(&toolchain);
    if !toolchain.nmap {
        eprintln!("nmap is required. Install and retry.");
        exit(EXIT_NMAP_MISSING);
    }
    let dir_tool = match toolchain.dir_tool() {
        Some(tool) => tool,
        None => {
            eprintln!("Either gobuster or dirb required. Install one and retry.");
            exit(EXIT_NO_DIR_TOOL);
        }
    };
    if !toolchain.nikto {
        eprintln!("nikto not found. Please install.");
        exit(EXIT_NIKTO_MISSING);
    }
    if !toolchain.sqlmap {
        eprintln!("sqlmap not found. Please install.");
        exit(EXIT_SQLMAP_MISSING);
    }

    // Strict order: nmap first, then directory enumeration, nikto, sqlmap.
    let nmap_report = report::report_path(&outdir, "nmap", &target.host, &stamp);
    report::write_title(&nmap_report, &format!("Nmap scan report for {}", target.host))?;
    let mut stages = vec![ScanStage::new(
        "Nmap",
        commands::nmap(&target.host),
        nmap_report,
    )];

    let dir_report = report::report_path(&outdir, "dir", &target.host, &stamp);
    report::write_title(
        &dir_report,
        &format!("Dir enum report for {}", target.base_url),
    )?;
    let dir_argv = match dir_tool {
        DirTool::Gobuster => commands::gobuster(
            &target.base_url,
            &wordlist,
            &extensions,
            defaults.gobuster_threads,
        ),
        DirTool::Dirb => commands::dirb(&target.base_url, &wordlist, &extensions),
    };
    stages.push(ScanStage::new("DirEnum", dir_argv, dir_report));

    let nikto_report = report::report_path(&outdir, "nikto", &target.host, &stamp);
    report::write_title(
        &nikto_report,
        &format!("Nikto report for {}", target.base_url),
    )?;
    stages.push(ScanStage::new(
        "Nikto",
        commands::nikto(&target.base_url, &nikto_report),
        nikto_report,
    ));

    let sql_report = report::report_path(&outdir, "sqlmap", &target.host, &stamp);
    report::write_title(
        &sql_report,
        &format!("Sqlmap report for {}", target.base_url),
    )?;
    stages.push(ScanStage::new(
        "Sqlmap",
        commands::sqlmap(&target, defaults.sqlmap_threads),
        sql_report,
    ));

    let executor = PipelineExecutor::new(stages, timeout);
    let outcomes = executor.execute(|_outcome| match prompt::confirm_continue() {
        Ok(proceed) => proceed,
        Err(err) => {
            warn!("Failed to read confirmation, stopping: {err}");
            false
        }
    });

    let failed = outcomes
        .iter()
        .filter(|outcome| !outcome.result.is_completed())
        .count();
    if failed > 0 {
        warn!(failed, "Some stages did not complete; partial reports kept");
    }

    let snapshot = executor.metrics().snapshot();
    log_snapshot(&snapshot);
    let summary_path = outdir.join("summary.json");
    // A broken summary must not turn a finished run into a failure exit;
    // the reports themselves are already on disk.
    match write_summary(&summary_path, &snapshot) {
        Ok(()) => info!(summary = %summary_path.display(), "Run summary written"),
        Err(err) => warn!("Failed to write run summary: {err:#}"),
    }

    println!("\nAll done (or stopped). Report files in: {}", outdir.display());
    for path in report::list_reports(&outdir)? {
        println!(" - {}", path.display());
    }
    println!("\nNote: run only against authorized/test targets. Some scans are intrusive.");

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "powertest",
    version,
    about = "Sequential security-scan pipeline: nmap, gobuster/dirb, nikto, sqlmap"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe PATH for the wrapped scanners and print their availability
    CheckTools,
}
