use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use covtrack::changelog::LogFormat;
use covtrack::cli;
use covtrack::source::{FileSource, JacocoCli, ReportSource};
use covtrack::watch::WatchOptions;

/// covtrack — log how JaCoCo coverage grows while a program runs.
#[derive(Parser)]
#[command(name = "covtrack", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Periodically snapshot coverage and append what changed to a log.
    Watch(WatchArgs),

    /// Print the change record between two JaCoCo XML reports.
    Diff {
        /// The earlier report.
        previous: PathBuf,

        /// The later report.
        current: PathBuf,

        /// Output encoding.
        #[arg(long, value_enum, default_value_t = LogFormat::Yaml)]
        format: LogFormat,
    },

    /// Show overall coverage of a JaCoCo XML report.
    Summary {
        /// Path to the report.
        report: PathBuf,
    },
}

#[derive(Args)]
struct WatchArgs {
    /// Path to jacococli.jar (required unless --report is given).
    #[arg(long)]
    cli: Option<PathBuf>,

    /// Path to the application's compiled .class files.
    #[arg(long)]
    classfiles: Option<PathBuf>,

    /// Path to the application's source files.
    #[arg(long)]
    sourcefiles: Option<PathBuf>,

    /// JaCoCo agent address.
    #[arg(long, default_value = "localhost")]
    address: String,

    /// JaCoCo agent port.
    #[arg(long, default_value_t = 6300)]
    port: u16,

    /// Java launcher used to run jacococli.jar.
    #[arg(long, default_value = "java")]
    java: PathBuf,

    /// Where the dumped execution data is written.
    #[arg(long, default_value = "jacoco.exec")]
    exec_file: PathBuf,

    /// Where the generated XML report is written.
    #[arg(long, default_value = "jacoco_report.xml")]
    xml_file: PathBuf,

    /// Watch an existing XML report instead of dumping from the agent.
    #[arg(long, conflicts_with_all = ["cli", "classfiles"])]
    report: Option<PathBuf>,

    /// Change log to write (truncated at startup).
    #[arg(long, default_value = "coverage_log.yaml")]
    output: PathBuf,

    /// Change log encoding.
    #[arg(long, value_enum, default_value_t = LogFormat::Yaml)]
    format: LogFormat,

    /// Seconds between coverage snapshots.
    #[arg(long, default_value_t = 10)]
    interval: u64,

    /// Stop after this many cycles.
    #[arg(long)]
    max_cycles: Option<u64>,
}

impl WatchArgs {
    fn source(&self) -> Result<Box<dyn ReportSource>> {
        if let Some(report) = &self.report {
            return Ok(Box::new(FileSource::new(report)));
        }
        let (Some(cli_jar), Some(classfiles)) = (&self.cli, &self.classfiles) else {
            bail!("--cli and --classfiles are required unless --report is given");
        };
        Ok(Box::new(JacocoCli {
            java: self.java.clone(),
            cli_jar: cli_jar.clone(),
            address: self.address.clone(),
            port: self.port,
            classfiles: classfiles.clone(),
            sourcefiles: self.sourcefiles.clone(),
            exec_file: self.exec_file.clone(),
            xml_file: self.xml_file.clone(),
        }))
    }

    fn options(&self) -> WatchOptions {
        WatchOptions {
            interval: Duration::from_secs(self.interval),
            max_cycles: self.max_cycles,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("covtrack=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Cli::parse();

    match opts.command {
        Commands::Watch(args) => {
            let source = args.source()?;
            let stats = cli::cmd_watch(source.as_ref(), &args.output, args.format, &args.options());
            tracing::info!(
                attempts = stats.attempts,
                logged = stats.logged,
                failed = stats.failed,
                "watch finished"
            );
            Ok(())
        }
        Commands::Diff {
            previous,
            current,
            format,
        } => {
            print!("{}", cli::cmd_diff(&previous, &current, format)?);
            Ok(())
        }
        Commands::Summary { report } => {
            print!("{}", cli::cmd_summary(&report)?);
            Ok(())
        }
    }
}
