use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use stressapi::affinity;
use stressapi::config::{ConfigFile, RunConfig};
use stressapi::control::{ControlLoop, Presenter, Report};
use stressapi::pool::WorkerPool;
use stressapi::render::ConsolePresenter;
use stressapi::report::ConfigSnapshot;
use stressapi::session::{Session, Stats};
use stressapi::telemetry::init_tracing;
use stressapi::terminal::{ConsoleWriter, CrosstermKeys};
use stressapi_client::HttpClient;
use stressapi_common::DEFAULT_WINDOW_SIZE;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "stressapi", version, about = "Interactive HTTP load generator")]
struct Args {
    /// JSON file describing the target and the starting rate
    #[arg(short, long, required_unless_present = "template")]
    conf: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    template: bool,

    /// Log debug messages
    #[arg(short, long)]
    debug: bool,

    /// Leave timestamps out of log lines
    #[arg(long)]
    nodate: bool,

    /// Number of most recent latencies kept for percentiles
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window: usize,
}

fn main() {
    let args = Args::parse();

    if args.template {
        match serde_json::to_string_pretty(&ConfigFile::template()) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Cannot render the configuration template: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let Some(path) = args.conf.as_deref() else {
        eprintln!("A configuration file is required, see --help");
        process::exit(1);
    };

    let settings = match ConfigFile::load(path).and_then(|file| file.validate(affinity::available_cpus())) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    init_tracing(args.debug, args.nodate, settings.syslog.as_ref());

    if let Err(e) = affinity::set_cpu_affinity(&settings.cpu_affinity) {
        warn!("Cannot set the CPU affinity to {:?}: {e}", settings.cpu_affinity);
    }

    let client = match HttpClient::new() {
        Ok(client) => client,
        Err(e) => {
            error!("Cannot create the HTTP client: {e}");
            process::exit(1);
        }
    };

    let threads = settings.threads;
    let session = Arc::new(Session::new(
        RunConfig::new(settings),
        Stats::new(args.window),
        Arc::new(client),
    ));

    let for_signal = Arc::clone(&session);
    if let Err(e) = ctrlc::set_handler(move || for_signal.request_quit()) {
        warn!("Cannot install the signal handler: {e}");
    }

    let mut presenter = ConsolePresenter::new(ConsoleWriter::stdout());
    presenter.present(&Report::Config(ConfigSnapshot::capture(&session, threads)));
    presenter.present(&Report::Help);

    let pool = match WorkerPool::start(Arc::clone(&session), threads) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Cannot start the worker threads: {e}");
            process::exit(1);
        }
    };
    info!("Sending {} {} from {} threads", session.config.method(), session.config.url(), pool.len());

    let mut control = ControlLoop::new(session, pool);
    control.run(&mut CrosstermKeys::new(), &mut presenter);
    info!("Finished");
}
