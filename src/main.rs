//! CLI entry point for `mailsweep`.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use mailsweep::config::{self, Config, TOKEN_ENV};
use mailsweep::jmap::JmapClient;
use mailsweep::report;
use mailsweep::tail;
use mailsweep::unsub::{ActionExecutor, Resolver};

#[derive(Parser)]
#[command(name = "mailsweep", version, about = "JMAP mailbox toolkit: tail, rank senders, unsubscribe")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the most recent messages
    Tail {
        /// Number of messages to fetch
        #[arg(short, default_value_t = 10)]
        n: usize,
        /// Disable the built-in pager
        #[arg(long)]
        no_pager: bool,
        /// Color output
        #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
        color: ColorChoice,
    },
    /// Poll for new mail and append formatted log lines
    Watch {
        /// Log file path (default: ~/.fastmail.log)
        #[arg(long)]
        logfile: Option<PathBuf>,
        /// Polling interval in seconds
        #[arg(long)]
        interval: Option<u64>,
        /// Write the last N messages to the log on startup
        #[arg(long, value_name = "N")]
        backfill: Option<usize>,
        /// Color output
        #[arg(long, value_enum, default_value_t = ColorChoice::Never)]
        color: ColorChoice,
    },
    /// Rank senders by message count
    Top {
        /// Number of top senders to show
        #[arg(short, default_value_t = 25)]
        n: usize,
        /// How many months back to look
        #[arg(long, default_value_t = 6)]
        months: u32,
        /// Drill into a sender: which of your addresses do they deliver to?
        #[arg(long)]
        sender: Option<String>,
        /// Save fetched email data to a JSON file for later reuse
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
        /// Load previously saved email data instead of fetching
        #[arg(long, value_name = "FILE")]
        load: Option<PathBuf>,
    },
    /// Find and execute the unsubscribe mechanism for a sender
    Unsubscribe {
        /// Email address to unsubscribe from
        sender: String,
        /// Only match emails sent to this recipient address
        #[arg(long = "to", value_name = "RECIPIENT")]
        recipient: Option<String>,
        /// Find the unsubscribe mechanism but don't trigger it
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn resolve(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::stdout().is_terminal(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Tail { n, no_pager, color } => cmd_tail(&config, n, no_pager, color),
        Commands::Watch {
            logfile,
            interval,
            backfill,
            color,
        } => cmd_watch(&config, logfile, interval, backfill, color),
        Commands::Top {
            n,
            months,
            sender,
            save,
            load,
        } => cmd_top(&config, n, months, sender.as_deref(), save, load),
        Commands::Unsubscribe {
            sender,
            recipient,
            dry_run,
        } => cmd_unsubscribe(&config, &sender, recipient.as_deref(), dry_run),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailsweep.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Read the bearer token from the environment.
fn token() -> anyhow::Result<String> {
    std::env::var(TOKEN_ENV)
        .map_err(|_| anyhow::anyhow!("Error: {TOKEN_ENV} environment variable not set"))
}

fn connect(config: &Config) -> anyhow::Result<JmapClient> {
    Ok(JmapClient::connect(&config.api, &token()?)?)
}

/// Show the most recent messages.
fn cmd_tail(config: &Config, n: usize, no_pager: bool, color: ColorChoice) -> anyhow::Result<()> {
    let client = connect(config)?;
    tail::run_oneshot(&client, n, color.resolve(), no_pager)?;
    Ok(())
}

/// Run the polling daemon.
fn cmd_watch(
    config: &Config,
    logfile: Option<PathBuf>,
    interval: Option<u64>,
    backfill: Option<usize>,
    color: ColorChoice,
) -> anyhow::Result<()> {
    let mut client = connect(config)?;
    let opts = tail::daemon::WatchOptions {
        interval: Duration::from_secs(interval.unwrap_or(config.daemon.interval_secs)),
        logfile: logfile.unwrap_or_else(|| config::daemon_logfile(config)),
        backfill: backfill.unwrap_or(config.daemon.backfill),
        use_color: color.resolve(),
    };
    eprintln!(
        "Starting daemon, polling every {}s, logging to {}",
        opts.interval.as_secs(),
        opts.logfile.display()
    );
    tail::daemon::run(&mut client, &opts)?;
    Ok(())
}

/// Rank senders (or a sender's recipient addresses) by message count.
fn cmd_top(
    config: &Config,
    n: usize,
    months: u32,
    sender: Option<&str>,
    save: Option<PathBuf>,
    load: Option<PathBuf>,
) -> anyhow::Result<()> {
    let records = if let Some(path) = load {
        eprintln!("Loading emails from {}...", path.display());
        let records = report::load_records(&path)?;
        eprintln!("  loaded {} emails", records.len());
        records
    } else {
        let since = chrono::Utc::now() - chrono::Duration::days(i64::from(months) * 30);
        let after = since.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        eprintln!("Fetching emails since {}...", since.format("%Y-%m-%d"));

        let mut client = connect(config)?;

        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Fetching [{bar:40.cyan/blue}] {pos}/{len} emails")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        let records = report::collect_records(
            &mut client,
            config.api.max_retries,
            config.api.retry_backoff_secs,
            &after,
            &|fetched, total| {
                if let Some(total) = total {
                    pb.set_length(total);
                }
                pb.set_position(fetched as u64);
            },
        )?;
        pb.finish_and_clear();

        if let Some(path) = save {
            report::save_records(&path, &records)?;
            eprintln!("  saved {} emails to {}", records.len(), path.display());
        }
        records
    };

    let (top, total, label) = match sender {
        Some(sender) => {
            let (top, matched) = report::recipients_for(&records, sender, n);
            (top, matched, "recipient addresses")
        }
        None => {
            let top = report::top_senders(&records, n);
            (top, records.len(), "unique senders")
        }
    };

    if top.is_empty() {
        eprintln!("No emails found.");
        return Ok(());
    }

    let rank_width = n.to_string().len();
    let count_width = top[0].1.to_string().len();
    for (i, (addr, count)) in top.iter().enumerate() {
        println!("  {:>rank_width$}. {count:>count_width$}  {addr}", i + 1);
    }
    eprintln!("\n  {} {label}, {total} emails total", top.len());

    Ok(())
}

/// Resolve and execute the unsubscribe mechanism for one sender.
fn cmd_unsubscribe(
    config: &Config,
    sender: &str,
    recipient: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let client = connect(config)?;
    let executor = ActionExecutor::new(&config.http)?;
    let resolver = Resolver::new(&client, &executor);

    let resolution = resolver.resolve(sender, recipient, dry_run)?;
    for line in &resolution.transcript {
        println!("  {line}");
    }

    if !resolution.succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailsweep", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
