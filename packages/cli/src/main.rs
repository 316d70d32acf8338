use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use hazard_twin::infrastructure::telemetry;
use hazard_twin::{HarnessKind, HarnessReport, HazardConfig, HazardDriver};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Hazard Twin CLI
/// Reproduces lock-ordering deadlocks and visibility hazards on demand
#[derive(Parser)]
#[command(name = "hazard")]
#[command(version, about = "Concurrency hazard simulation harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Timeout applied to every selected harness (ms)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Producer warm-up before the visibility flag is raised (ms)
    #[arg(long, global = true)]
    warm_up_ms: Option<u64>,

    /// Wait before the lock-ordering snapshot (ms)
    #[arg(long, global = true)]
    grace_ms: Option<u64>,

    /// Skip the rendezvous barrier; the deadlock becomes timing-dependent
    #[arg(long, global = true)]
    no_barrier: bool,

    /// Report format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Two tasks take A and B in opposite order, then detect the cycle
    LockOrdering,
    /// Spin on an unsynchronized flag until it flips or the timeout passes
    Visibility,
    /// Run every harness in sequence
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Line-oriented text
    Text,
    /// One JSON report per line
    Json,
}

impl Commands {
    fn selection(&self) -> &'static [HarnessKind] {
        match self {
            Self::LockOrdering => &[HarnessKind::LockOrdering],
            Self::Visibility => &[HarnessKind::Visibility],
            Self::All => &HarnessKind::ALL,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    info!("⚡ hazard twin v{}", hazard_twin::VERSION);

    let config = resolve_config(&cli);
    let driver = HazardDriver::new(config);

    let reports = driver.run(cli.command.selection());
    publish(&mut io::stdout().lock(), &reports, cli.format);

    Ok(())
}

/// Write every report; a failed write (closed pipe) is logged, not fatal
fn publish(out: &mut impl Write, reports: &[HarnessReport], format: Format) {
    let written = reports
        .iter()
        .try_for_each(|report| write_report(out, report, format))
        .and_then(|()| out.flush().map_err(anyhow::Error::from));

    if let Err(err) = written {
        warn!(error = %err, "could not write reports");
    }
}

/// File (or defaults), then flags. Invalid fields fall back to their defaults.
fn resolve_config(cli: &Cli) -> HazardConfig {
    let mut config = match &cli.config {
        Some(path) => HazardConfig::load(path).unwrap_or_else(|err| {
            warn!(error = %err, "using default configuration");
            HazardConfig::default()
        }),
        None => HazardConfig::default(),
    };

    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = cli.warm_up_ms {
        config.visibility = config.visibility.with_warm_up(Duration::from_millis(ms));
    }
    if let Some(ms) = cli.grace_ms {
        config.lock_ordering = config
            .lock_ordering
            .with_grace_delay(Duration::from_millis(ms));
    }
    if cli.no_barrier {
        config.lock_ordering = config.lock_ordering.with_barrier(false);
    }

    let (config, problems) = config.sanitized();
    for problem in problems {
        warn!(error = %problem, "using the default for this setting");
    }
    config
}

fn write_report(out: &mut impl Write, report: &HarnessReport, format: Format) -> Result<()> {
    match format {
        Format::Text => write!(out, "{}", report)?,
        Format::Json => writeln!(out, "{}", serde_json::to_string(report)?)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazard_twin::Outcome;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("hazard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&["visibility", "--timeout-ms", "2000", "--warm-up-ms", "50"]);
        let config = resolve_config(&cli);

        assert_eq!(config.visibility.timeout_ms, 2000);
        assert_eq!(config.lock_ordering.timeout_ms, 2000);
        assert_eq!(config.visibility.warm_up_ms, 50);
    }

    #[test]
    fn test_zero_timeout_falls_back_to_defaults() {
        let cli = parse(&["all", "--timeout-ms", "0"]);
        assert_eq!(resolve_config(&cli), HazardConfig::default());
    }

    #[test]
    fn test_invalid_flag_keeps_other_overrides() {
        let cli = parse(&["all", "--timeout-ms", "0", "--no-barrier", "--warm-up-ms", "50"]);
        let config = resolve_config(&cli);

        assert_eq!(config.lock_ordering.timeout_ms, 1000);
        assert_eq!(config.visibility.timeout_ms, 1000);
        assert!(!config.lock_ordering.use_barrier);
        assert_eq!(config.visibility.warm_up_ms, 50);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let report = HarnessReport::new(HarnessKind::Visibility, Outcome::VisibilityHung);
        assert!(write_report(&mut ClosedPipe, &report, Format::Text).is_err());

        // Returns normally so main still exits 0
        publish(&mut ClosedPipe, &[report], Format::Json);
    }

    #[test]
    fn test_missing_config_file_falls_back_to_defaults() {
        let cli = parse(&["lock-ordering", "--config", "/no/such/hazard.toml", "--no-barrier"]);
        let config = resolve_config(&cli);
        assert!(!config.lock_ordering.use_barrier);
    }

    #[test]
    fn test_selection() {
        assert_eq!(parse(&["all"]).command.selection(), &HarnessKind::ALL);
        assert_eq!(
            parse(&["lock-ordering"]).command.selection(),
            &[HarnessKind::LockOrdering]
        );
    }

    #[test]
    fn test_json_report_is_one_line() {
        let report = HarnessReport::new(HarnessKind::Visibility, Outcome::VisibilityHung);
        let mut buf = Vec::new();
        write_report(&mut buf, &report, Format::Json).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("visibility"));
    }
}
