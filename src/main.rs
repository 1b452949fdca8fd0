mod batch;
mod client;
mod ops;
mod target;
mod telemetry;

use crate::client::DeviceClient;
use crate::ops::{DesiredState, ExportMode, Selection};
use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "telemetryctl",
    version,
    about = "Manage telemetry metric reports on Redfish management controllers"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Skip TLS certificate verification (for controllers with self-signed certificates)"
    )]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete metric report definitions
    Delete {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(
            long,
            conflicts_with = "names",
            help = "Delete every metric report definition"
        )]
        all: bool,
        #[arg(
            long,
            value_name = "NAME,NAME",
            value_delimiter = ',',
            help = "Comma-separated metric report names to delete (skips enumeration)"
        )]
        names: Option<Vec<String>>,
        #[arg(long, help = "Print usage examples and exit")]
        examples: bool,
    },
    /// Enable or disable the telemetry service and its metric reports
    SetState {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(
            long,
            conflicts_with = "names",
            help = "Apply the report state to every metric report definition"
        )]
        all: bool,
        #[arg(
            long,
            value_name = "NAME,NAME",
            value_delimiter = ',',
            help = "Comma-separated metric report names to set (skips enumeration)"
        )]
        names: Option<Vec<String>>,
        #[arg(
            long,
            value_enum,
            default_value_t = StateArg::Enabled,
            help = "Desired state for the selected metric reports"
        )]
        reports: StateArg,
        #[arg(
            long,
            value_enum,
            default_value_t = StateArg::Enabled,
            help = "Desired state for the telemetry service itself"
        )]
        service: StateArg,
        #[arg(long, help = "Print usage examples and exit")]
        examples: bool,
    },
    /// Export metric report definitions to a CSV file in the working directory
    Export {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(
            long,
            conflicts_with = "with_metrics",
            help = "One row per report, containing the report name"
        )]
        reports_only: bool,
        #[arg(
            long,
            help = "One row per metric, containing the report name and metric identifier"
        )]
        with_metrics: bool,
        #[arg(long, help = "Print usage examples and exit")]
        examples: bool,
    },
}

#[derive(Args)]
struct TargetArgs {
    #[arg(
        long,
        value_name = "ADDRESS",
        conflicts_with = "file",
        help = "Controller address, only required when operating on a single target"
    )]
    ip: Option<String>,

    #[arg(
        short = 'u',
        long,
        conflicts_with = "file",
        help = "Controller username, only required when operating on a single target"
    )]
    username: Option<String>,

    #[arg(
        short = 'p',
        long,
        conflicts_with = "file",
        help = "Controller password, only required when operating on a single target"
    )]
    password: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_name = "FILE",
        help = "CSV file of address,username,password rows; the header row is always skipped"
    )]
    file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StateArg {
    Enabled,
    Disabled,
}

impl From<StateArg> for DesiredState {
    fn from(value: StateArg) -> Self {
        match value {
            StateArg::Enabled => DesiredState::Enabled,
            StateArg::Disabled => DesiredState::Disabled,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let verify_tls = !cli.insecure;
    if cli.insecure {
        warn!("TLS certificate verification is disabled; traffic to targets can be intercepted");
    }

    match cli.command {
        Commands::Delete {
            target,
            all,
            names,
            examples,
        } => {
            if examples {
                print_delete_examples();
                return Ok(());
            }
            let selection = selection_from(all, names)?;
            let targets = resolve_targets(&target)?;
            batch::process_targets(&targets, "deleting metric report definitions", |t| {
                let client = DeviceClient::new(&t.address, &t.username, &t.password, verify_tls)?;
                ops::delete_reports(&client, &selection)
            });
        }
        Commands::SetState {
            target,
            all,
            names,
            reports,
            service,
            examples,
        } => {
            if examples {
                print_set_state_examples();
                return Ok(());
            }
            let selection = selection_from(all, names)?;
            let targets = resolve_targets(&target)?;
            let banner = format!("setting metric reports {}", DesiredState::from(reports));
            batch::process_targets(&targets, &banner, |t| {
                let client = DeviceClient::new(&t.address, &t.username, &t.password, verify_tls)?;
                ops::set_reports_state(&client, &selection, reports.into(), service.into())
            });
        }
        Commands::Export {
            target,
            reports_only,
            with_metrics,
            examples,
        } => {
            if examples {
                print_export_examples();
                return Ok(());
            }
            let mode = export_mode_from(reports_only, with_metrics)?;
            let targets = resolve_targets(&target)?;
            let out_path = Path::new(ops::EXPORT_FILE_NAME);
            batch::process_targets(&targets, "exporting metric report definitions", |t| {
                let client = DeviceClient::new(&t.address, &t.username, &t.password, verify_tls)?;
                ops::export_reports(&client, mode, out_path)
            });
        }
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn resolve_targets(args: &TargetArgs) -> Result<Vec<target::Target>> {
    let targets = target::resolve(
        args.ip.as_deref(),
        args.username.as_deref(),
        args.password.as_deref(),
        args.file.as_deref(),
    )?;
    Ok(targets)
}

fn selection_from(all: bool, names: Option<Vec<String>>) -> Result<Selection> {
    if all {
        return Ok(Selection::All);
    }
    let names: Vec<String> = names
        .unwrap_or_default()
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        bail!("pass --all or --names to select which metric reports to operate on");
    }
    Ok(Selection::Named(names))
}

fn export_mode_from(reports_only: bool, with_metrics: bool) -> Result<ExportMode> {
    match (reports_only, with_metrics) {
        (true, false) => Ok(ExportMode::ReportsOnly),
        (false, true) => Ok(ExportMode::WithMetrics),
        _ => bail!("pass --reports-only or --with-metrics to choose the export shape"),
    }
}

fn print_delete_examples() {
    println!(
        "\ntelemetryctl delete --ip 192.168.0.120 -u root -p calvin --all\n    \
         delete every metric report definition on one controller\n\n\
         telemetryctl delete --ip 192.168.0.120 -u root -p calvin --names PowerMetrics\n    \
         delete the PowerMetrics report on one controller\n\n\
         telemetryctl delete -f targets.csv --all\n    \
         delete every metric report definition on each controller listed in targets.csv\n"
    );
}

fn print_set_state_examples() {
    println!(
        "\ntelemetryctl set-state --ip 192.168.0.120 -u root -p calvin --all\n    \
         enable the telemetry service and every metric report\n\n\
         telemetryctl set-state --ip 192.168.0.120 -u root -p calvin --all --reports disabled --service disabled\n    \
         disable every metric report, then the telemetry service\n\n\
         telemetryctl set-state --ip 192.168.0.120 -u root -p calvin --names PowerMetrics,SystemUsage --service enabled\n    \
         enable the telemetry service and the two named reports\n\n\
         telemetryctl set-state -f targets.csv --all --reports disabled --service disabled\n    \
         disable telemetry on each controller listed in targets.csv\n"
    );
}

fn print_export_examples() {
    println!(
        "\ntelemetryctl export --ip 192.168.0.120 -u root -p calvin --reports-only\n    \
         write one row per metric report to {file}\n\n\
         telemetryctl export --ip 192.168.0.120 -u root -p calvin --with-metrics\n    \
         write one row per metric, with its report name, to {file}\n",
        file = ops::EXPORT_FILE_NAME
    );
}
