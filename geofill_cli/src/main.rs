use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use geofill_core::runtime::{parse_command_line, ProfileCommand, Settings};
use geofill_core::{
    dispatch, load_locales, profile_lines, session_event, AppConfig, ProfileService,
    ReqwestTransport, ServiceEvent, Storage, TcpPageBridge,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::info;

mod app;
mod ui;

use app::{GeofillApp, UiUpdate, ViewState};

#[derive(Clone)]
struct ChannelWriter {
    sender: Sender<String>,
}

impl std::io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = String::from_utf8(buf.to_vec()) {
            let _ = self.sender.send(text);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "GeoFill profile generator", long_about = None)]
struct Cli {
    /// JSON file holding the cached profile, locks, settings, archives and history.
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Address of the page-side form collaborator.
    #[arg(long, global = true)]
    page_endpoint: Option<String>,
    /// Locale catalog overriding the builtin one.
    #[arg(long, global = true)]
    locales: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Interactive terminal UI (default).
    Tui,
    /// Run one command, e.g. `exec lock email` or `exec country Japan`.
    Exec {
        #[arg(required = true, trailing_var_arg = true)]
        words: Vec<String>,
    },
    /// Print the current profile.
    Show,
    /// Print the JSON schema of the settings object.
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Some(Mode::Schema) => {
            println!("{}", serde_json::to_string_pretty(&Settings::schema_json())?);
            Ok(())
        }
        Some(Mode::Exec { ref words }) => {
            init_stderr_logging();
            let command = parse_command_line(&words.join(" "))?;
            let mut service = build_service(&cli)?;
            let event = run_once(&mut service, command).await;
            print_event(&event);
            if event.is_success() {
                Ok(())
            } else {
                Err(eyre!("command failed"))
            }
        }
        Some(Mode::Show) => {
            init_stderr_logging();
            let mut service = build_service(&cli)?;
            let event = run_once(&mut service, ProfileCommand::Show).await;
            print_event(&event);
            Ok(())
        }
        Some(Mode::Tui) | None => run_tui(&cli).await,
    }
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

fn build_service(cli: &Cli) -> Result<ProfileService> {
    let mut config = AppConfig::from_env()
        .with_store_path(cli.store.clone())
        .with_page_endpoint(cli.page_endpoint.clone());
    if cli.locales.is_some() {
        config.locales_path = cli.locales.clone();
    }
    let (catalog, metadata) = load_locales(config.locales_path.clone());
    info!(
        locales = catalog.len(),
        path = ?metadata.path(),
        store = %config.store_path.display(),
        page = %config.page_endpoint,
        "service.configured"
    );
    let storage = Storage::open_file(&config.store_path);
    let transport = Arc::new(ReqwestTransport::new()?);
    let bridge = Arc::new(TcpPageBridge::new(config.page_endpoint));
    Ok(ProfileService::with_entropy(catalog, storage, transport, bridge))
}

async fn run_once(service: &mut ProfileService, command: ProfileCommand) -> ServiceEvent {
    let start = service.init().await;
    let opening = session_event(&start);
    for toast in &opening.toasts {
        eprintln!("{toast}");
    }
    dispatch(service, command).await
}

fn print_event(event: &ServiceEvent) {
    for toast in &event.toasts {
        eprintln!("{toast}");
    }
    for line in &event.lines {
        println!("{line}");
    }
}

async fn run_tui(cli: &Cli) -> Result<()> {
    let (log_tx, log_rx) = mpsc::channel::<String>();
    let log_writer_tx = log_tx.clone();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(move || ChannelWriter {
            sender: log_writer_tx.clone(),
        })
        .init();

    let mut service = build_service(cli)?;
    let (update_tx, update_rx) = unbounded_channel::<UiUpdate>();
    let (command_tx, command_rx) = unbounded_channel::<ProfileCommand>();

    let ui_handle = std::thread::spawn(move || -> color_eyre::Result<()> {
        let app = GeofillApp::new(update_rx, command_tx, log_rx)?;
        app.run()
    });

    let start = service.init().await;
    let _ = update_tx.send(UiUpdate::Event(session_event(&start)));
    let _ = update_tx.send(UiUpdate::State(ViewState::capture(&service)));
    serve_commands(&mut service, command_rx, &update_tx).await;

    info!("UI closed; shutting down");
    ui_handle
        .join()
        .map_err(|_| eyre!("UI thread panicked"))??;
    Ok(())
}

/// Run commands one at a time until the UI drops its sender.
async fn serve_commands(
    service: &mut ProfileService,
    mut commands: UnboundedReceiver<ProfileCommand>,
    updates: &UnboundedSender<UiUpdate>,
) {
    while let Some(command) = commands.recv().await {
        let read_only = command.is_read_only();
        let event = dispatch(service, command).await;
        if updates
            .send(UiUpdate::Completed { event, read_only })
            .is_err()
        {
            break;
        }
        let _ = updates.send(UiUpdate::State(ViewState::capture(service)));
    }
}
