use std::backtrace::Backtrace;
use std::io::{self, Write};
use std::panic;
use std::path::PathBuf;
use std::process::exit;

use chrono::Utc;
use clap::error::ErrorKind;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

use tlsexpiry::config::{CheckSettings, Config, ConfigError, PrometheusConfig};
use tlsexpiry::metrics::prom;
use tlsexpiry::report::{self, OutputFormat};
use tlsexpiry::{source, CheckError, StatusLevel};

#[derive(Parser, Debug)]
#[command(name = "tlsexpiry", version, about, long_about = None)]
struct Cli {
    /// Server name
    #[arg(short, long)]
    server: Option<String>,

    /// Port, defaults to the STARTTLS protocol's port or 443
    #[arg(short, long)]
    port: Option<u16>,

    /// Warning threshold in days
    #[arg(short, long, allow_negative_numbers = true)]
    warning: Option<i32>,

    /// Critical threshold in days
    #[arg(short, long, allow_negative_numbers = true)]
    critical: Option<i32>,

    /// STARTTLS protocol: smtp, lmtp, pop3, imap, ftp, xmpp, postgres
    #[arg(short = 't', long, value_name = "PROTOCOL")]
    starttls: Option<String>,

    /// Check a PEM certificate file instead of a server
    #[arg(long, value_name = "PATH", conflicts_with = "server")]
    cert_file: Option<PathBuf>,

    /// Network timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format: nagios, json
    #[arg(short, long, value_name = "FORMAT")]
    output: Option<String>,

    /// Push the result to a Prometheus Push Gateway
    #[arg(long)]
    prometheus: bool,

    /// Push gateway address
    #[arg(long, value_name = "URL")]
    prometheus_address: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,
}

impl Cli {
    fn to_config(&self) -> Config {
        Config {
            host: self.server.clone(),
            port: self.port,
            warning: self.warning,
            critical: self.critical,
            starttls: self.starttls.clone(),
            cert_file: self.cert_file.clone(),
            timeout: self.timeout,
            output: self.output.clone(),
            prometheus: Some(PrometheusConfig {
                enabled: if self.prometheus { Some(true) } else { None },
                address: self.prometheus_address.clone(),
            }),
        }
    }

    /// Output format for reporting failures that happen before settings resolve.
    fn requested_output(&self) -> OutputFormat {
        self.output
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or(OutputFormat::Nagios)
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            exit(parse_error_status(e.kind()).exit_code());
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    panic::set_hook(Box::new(|info| {
        error!("unhandled fault: {}\n{}", info, Backtrace::force_capture());
    }));

    let status = match panic::catch_unwind(|| run(&cli, &mut io::stdout())) {
        Ok(status) => status,
        Err(_) => {
            emit(
                &mut io::stdout(),
                &report::failure_line(StatusLevel::Critical, "Unhandled fault, see log for details"),
            );
            StatusLevel::Critical
        }
    };

    exit(status.exit_code());
}

/// Exit status for command lines clap refused to parse.
///
/// Usage errors and --help must not leave with clap's exit code 2, which a
/// supervisor reads as CRITICAL.
fn parse_error_status(kind: ErrorKind) -> StatusLevel {
    match kind {
        ErrorKind::DisplayVersion => StatusLevel::Ok,
        _ => StatusLevel::Unknown,
    }
}

/// Writes plugin output. A vanished reader must not change the exit code.
fn emit(out: &mut dyn Write, text: &str) {
    if let Err(e) = writeln!(out, "{}", text).and_then(|_| out.flush()) {
        warn!("failed to write check output: {}", e);
    }
}

fn run(cli: &Cli, out: &mut dyn Write) -> StatusLevel {
    if cli.example_config {
        emit(out, Config::example_toml().trim_end());
        return StatusLevel::Ok;
    }

    let settings = match load_settings(cli) {
        Ok(settings) => settings,
        Err(e) => {
            let e = CheckError::from(e);
            error!("{}", e);
            emit(out, &report::render_failure(&e, cli.requested_output()));
            return e.status();
        }
    };

    let source = source::for_settings(&settings);
    match tlsexpiry::check(source.as_ref(), Utc::now(), &settings.thresholds) {
        Ok(result) => {
            info!("{}: {}", settings.target, result.message);
            emit(out, &report::render(&result, settings.output));
            if let Some(address) = &settings.prometheus {
                prom::push_result(&settings.target, &result, address);
            }
            result.status
        }
        Err(e) => {
            error!("check of {} failed: {}", settings.target, e);
            emit(out, &report::render_failure(&e, settings.output));
            e.status()
        }
    }
}

fn load_settings(cli: &Cli) -> Result<CheckSettings, ConfigError> {
    let mut config = Config::defaults();
    if let Some(path) = &cli.config {
        config = config.merge_with(Config::from_file(path)?);
    }
    config.merge_with(cli.to_config()).resolve()
}
