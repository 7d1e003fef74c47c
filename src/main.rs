use std::fs::File;
use std::future::IntoFuture;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scanscope_logs::{ConnectionState, HttpTransport, LogBuffer, StreamClient, StreamUpdate};
use scanscope_relay::{AppState as RelayState, BlobStore, JobTrigger, UploadSink, build_router};
use scanscope_tui::{
    Action, AppState, Event, EventHandler, HelpOverlay, KeyBindings, LogViewerScreen, Tui,
};

mod config;

use config::Config;

/// How long open streams may linger after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Scanscope - live log relay and terminal console for the scan pipeline
#[derive(Parser, Debug)]
#[command(name = "scanscope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the log relay and console API
    Serve(ServeArgs),
    /// Follow a relay's log stream in the terminal
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// TOML configuration file
    #[arg(long, env = "SCANSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Stream endpoint of the relay
    #[arg(
        long,
        env = "SCANSCOPE_URL",
        default_value = "http://127.0.0.1:3000/api/logs/stream"
    )]
    url: String,

    /// Number of log events kept in memory
    #[arg(long, default_value = "1000")]
    buffer_size: usize,

    /// Directory exported log files are written to
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli)?;

    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Watch(args) => watch(args).await,
    };

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// Where diagnostics go for a given invocation
#[derive(Debug, PartialEq, Eq)]
enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    /// The console owns the terminal, so nothing may write to it
    Discard,
}

impl Cli {
    fn log_target(&self) -> LogTarget<'_> {
        match (&self.command, self.log_file.as_deref()) {
            (_, Some(path)) => LogTarget::File(path),
            (Command::Serve(_), None) => LogTarget::Stderr,
            (Command::Watch(_), None) => LogTarget::Discard,
        }
    }

    fn default_level(&self) -> tracing::Level {
        match self.command {
            Command::Serve(_) => tracing::Level::INFO,
            Command::Watch(_) => tracing::Level::WARN,
        }
    }
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(cli.default_level().into())
        .from_env_lossy();

    match cli.log_target() {
        LogTarget::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::Discard => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .init();
        }
    }

    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env();
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    let relay = config.relay();
    for source in &relay.sources {
        info!(source = %source.source, command = %source.display(), "monitored process");
    }
    if config.jenkins.user.is_none() || config.jenkins.token.is_none() {
        warn!("scan job credentials not configured; trigger requests will fail");
    }

    let state = RelayState {
        relay: Arc::new(relay),
        files: BlobStore::new(&config.server.reports_dir),
        uploads: UploadSink::new(&config.server.upload_dir),
        trigger: JobTrigger::new(config.jenkins.clone()),
    };

    let listener = TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    info!(addr = %listener.local_addr()?, "relay listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
            }
            shutdown.cancel();
        }
    });

    let server = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .into_future();

    // Log streams never finish on their own; dropping the server after the
    // grace period drops their sessions, which kills the children.
    tokio::select! {
        result = server => result.context("relay server failed")?,
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } => {
            warn!("open streams did not finish, closing them");
        }
    }

    info!("relay stopped");
    Ok(())
}

async fn watch(args: WatchArgs) -> Result<()> {
    let transport = HttpTransport::new(&args.url).context("Failed to build HTTP client")?;
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let client = StreamClient::new(transport, update_tx).spawn(cancel.clone());

    let mut state = AppState::new(args.url.clone(), LogBuffer::new(args.buffer_size));
    let mut tui = Tui::new().context("Failed to initialise terminal")?;
    let mut events = EventHandler::new(Duration::from_millis(250));

    let result = run_app(
        &mut tui,
        &mut state,
        &mut events,
        &mut update_rx,
        &args.export_dir,
    )
    .await;

    // Teardown: stop the client (closes the transport or the pending retry)
    cancel.cancel();
    let _ = client.await;
    events.shutdown();
    tui.restore()?;

    result
}

async fn run_app(
    tui: &mut Tui,
    state: &mut AppState,
    events: &mut EventHandler,
    update_rx: &mut mpsc::UnboundedReceiver<StreamUpdate>,
    export_dir: &Path,
) -> Result<()> {
    let keybindings = KeyBindings::new();

    loop {
        if state.render_dirty {
            render(tui, state)?;
            state.render_dirty = false;
        }

        tokio::select! {
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        if let Some(action) = keybindings.get_action(state.key_context(), &key) {
                            handle_action(state, action, export_dir);
                        }
                    }
                    Event::Tick => {
                        // Keep the retry countdown moving
                        if matches!(state.connection(), ConnectionState::RetryScheduled { .. }) {
                            state.render_dirty = true;
                        }
                    }
                    Event::Resize(_, _) => {
                        state.render_dirty = true;
                    }
                    Event::Error(e) => {
                        state.show_message(e);
                    }
                }
            }

            Some(update) = update_rx.recv() => {
                state.apply_update(update);
            }

            else => break,
        }

        if state.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_action(state: &mut AppState, action: Action, export_dir: &Path) {
    match action {
        Action::ExportLogs => {
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let path = export_dir.join(format!("scanscope_{}.log", timestamp));

            match export_logs_to_file(&path, state) {
                Ok(count) => {
                    state.show_message(format!("Exported {} lines to {}", count, path.display()))
                }
                Err(e) => state.show_message(format!("Export failed: {:#}", e)),
            }
        }
        other => state.handle(other),
    }
}

fn render(tui: &mut Tui, state: &mut AppState) -> Result<()> {
    tui.terminal().draw(|frame| {
        LogViewerScreen::render(frame, state);

        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    })?;

    Ok(())
}

fn export_logs_to_file(path: &Path, state: &AppState) -> Result<usize> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let lines = state.export_lines();

    for line in &lines {
        writeln!(file, "{}", line)?;
    }

    Ok(lines.len())
}
