use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dbx_adapters::http::UreqTransport;
use dbx_core::config::{default_config_dir, ConfigStore};
use dbx_core::history::FileHistoryStore;
use dbx_core::query_client::{QueryClient, QueryTransport};
use dbx_core::session::SessionController;
use dbx_tui::{TuiError, TuiOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "dbx.log";
const LOG_ENV: &str = "DBX_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseOutcome {
    Config,
    HelpRequested,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CliArgs {
    endpoint: Option<String>,
    config_dir: Option<PathBuf>,
    query_words: Vec<String>,
}

impl CliArgs {
    /// Positional words joined into one query; `None` means interactive mode.
    fn query(&self) -> Option<String> {
        (!self.query_words.is_empty()).then(|| self.query_words.join(" "))
    }

    fn config_dir(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        match &self.config_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_config_dir()?),
        }
    }
}

fn run_app<F>(
    config_dir: &Path,
    endpoint_override: Option<String>,
    run_tui: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(SessionController, QueryClient<UreqTransport>, &TuiOptions) -> Result<(), TuiError>,
{
    let config = ConfigStore::in_dir(config_dir).load_or_init();
    let endpoint = endpoint_override.unwrap_or_else(|| config.endpoint.clone());
    info!(%endpoint, config_dir = %config_dir.display(), "starting interactive session");

    let session = SessionController::new(config, FileHistoryStore::in_dir(config_dir));
    let client = QueryClient::new(UreqTransport::new(), endpoint);
    let options = TuiOptions {
        export_dir: std::env::current_dir()?,
    };
    run_tui(session, client, &options)?;
    Ok(())
}

/// Runs `query` once, printing the body to `stdout`. Returns the process exit
/// code: 1 when the server could not be reached.
fn run_once<T: QueryTransport>(
    client: &QueryClient<T>,
    query: &str,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> io::Result<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(client.execute(query)) {
        Ok(outcome) => {
            writeln!(stdout, "{}", outcome.printable())?;
            Ok(0)
        }
        Err(error) => {
            writeln!(stderr, "Error: {error}")?;
            Ok(1)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = CliArgs::default();
    if parse_args_from(std::env::args().skip(1), &mut args)? == ParseOutcome::HelpRequested {
        print_help();
        return Ok(());
    }

    if let Some(query) = args.query() {
        init_stderr_logging();
        let endpoint = match args.endpoint.clone() {
            Some(endpoint) => endpoint,
            None => ConfigStore::in_dir(&args.config_dir()?)
                .load_or_init()
                .endpoint,
        };
        let client = QueryClient::new(UreqTransport::new(), endpoint);
        let code = run_once(&client, &query, &mut io::stdout(), &mut io::stderr())?;
        if code != 0 {
            std::process::exit(code);
        }
        return Ok(());
    }

    let config_dir = args.config_dir()?;
    if let Err(error) = init_file_logging(&config_dir) {
        eprintln!("dbx: logging disabled: {error}");
    }
    run_app(&config_dir, args.endpoint, dbx_tui::run)
}

fn env_filter(default_directive: &str) -> EnvFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive))
}

/// The terminal belongs to the UI, so interactive runs log to a file.
fn init_file_logging(config_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(config_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config_dir.join(LOG_FILE_NAME))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(io::stderr)
        .try_init();
}

fn parse_args_from(
    args: impl IntoIterator<Item = String>,
    cli: &mut CliArgs,
) -> io::Result<ParseOutcome> {
    let args = args.into_iter().collect::<Vec<_>>();
    if args == ["help"] {
        return Ok(ParseOutcome::HelpRequested);
    }
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::HelpRequested),
            "--endpoint" => cli.endpoint = Some(next_value(&mut args, "--endpoint")?),
            "--config-dir" => {
                cli.config_dir = Some(PathBuf::from(next_value(&mut args, "--config-dir")?));
            }
            "--" => {
                cli.query_words.extend(args.by_ref());
            }
            flag if flag.starts_with("--") => {
                return Err(io_other(format!("unknown flag `{flag}`")));
            }
            word => cli.query_words.push(word.to_string()),
        }
    }

    Ok(ParseOutcome::Config)
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> io::Result<String> {
    args.next()
        .ok_or_else(|| io_other(format!("missing value for `{flag}`")))
}

fn print_help() {
    println!(
        "dbx query workbench\n\n\
Usage:\n  dbx [OPTIONS]            Start the interactive workbench\n  dbx [OPTIONS] QUERY...   Run one query and print the result\n\n\
Options:\n  --endpoint <url>      Query endpoint (default: from config, http://localhost:8000/db)\n  --config-dir <dir>    Directory for config.json, history.json and dbx.log\n  -h, --help            Show this help\n\n\
Environment:\n  DBX_CONFIG_DIR overrides the config directory.\n  DBX_LOG (or RUST_LOG) sets the log filter.\n"
    );
}

fn io_other(error: impl std::fmt::Display) -> io::Error {
    io::Error::other(error.to_string())
}
