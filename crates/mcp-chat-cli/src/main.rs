//! MCP Chat - terminal client for an MCP tool-calling chat backend.
//!
//! This is the entry point for the `mcpchat` binary.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use mcp_chat_core::CursorPolicy;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use mcp_chat_cli::app::{App, Connection, WHEEL_SCROLL};
use mcp_chat_cli::registry::{load_servers, HttpRegistry, ServerLaunch};
use mcp_chat_cli::session::ChatSession;
use mcp_chat_cli::transport::{self, TransportEvent, WsChannel};
use mcp_chat_cli::{headless, ui, ClientConfig};

/// MCP Chat - terminal client for an MCP tool-calling chat backend.
#[derive(Parser, Debug)]
#[command(name = "mcpchat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket endpoint of the chat stream.
    #[arg(long, env = "MCP_CHAT_WS_URL", default_value = ClientConfig::DEFAULT_WS_URL)]
    ws_url: String,

    /// Base URL of the registry API.
    #[arg(long, env = "MCP_CHAT_API_URL", default_value = ClientConfig::DEFAULT_API_URL)]
    api_url: String,

    /// Timeout for registry requests and the WebSocket handshake.
    #[arg(
        long,
        env = "MCP_CHAT_REQUEST_TIMEOUT",
        default_value_t = ClientConfig::DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    request_timeout_secs: u64,

    /// How tool events interact with a streaming reply (preserve | close-on-tool).
    #[arg(long, env = "MCP_CHAT_CURSOR_POLICY", default_value = "preserve")]
    cursor_policy: CursorPolicy,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,

    /// Write logs to this file while the TUI is running.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message and print the response.
    Ask {
        /// Message text.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Manage the backend's MCP servers.
    Servers {
        #[command(subcommand)]
        action: Option<ServersAction>,
    },
    /// Check that the backend is up.
    Health,
}

#[derive(Subcommand, Debug)]
enum ServersAction {
    /// List servers and their tools.
    List,
    /// Register and connect a server.
    Add {
        /// Server name.
        name: String,
        /// Executable that starts the server.
        command: String,
        /// Arguments for the executable.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Disconnect and remove a server.
    Remove {
        /// Server name.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ClientConfig::new(
        args.ws_url.clone(),
        &args.api_url,
        args.request_timeout_secs,
        args.cursor_policy,
    );

    init_tracing(&args)?;

    match args.command {
        None => run_tui(&config).await,
        Some(Command::Ask { text }) => run_ask(&config, &text.join(" ")).await,
        Some(Command::Servers { action }) => {
            let registry = HttpRegistry::new(config.api_url.as_str(), config.request_timeout())?;
            let mut out = io::stdout().lock();
            match action.unwrap_or(ServersAction::List) {
                ServersAction::List => headless::list_servers(&registry, &mut out).await,
                ServersAction::Add {
                    name,
                    command,
                    args,
                } => {
                    let launch = ServerLaunch { command, args };
                    headless::add_server(&registry, &name, &launch, &mut out).await
                }
                ServersAction::Remove { name } => {
                    headless::remove_server(&registry, &name, &mut out).await
                }
            }
        }
        Some(Command::Health) => {
            let registry = HttpRegistry::new(config.api_url.as_str(), config.request_timeout())?;
            headless::health(&registry, &mut io::stdout().lock()).await
        }
    }
}

/// Set up `tracing`. The TUI owns the terminal, so it only logs to a file
/// when one is given; headless commands log to stderr.
fn init_tracing(args: &Args) -> anyhow::Result<()> {
    let default_filter = if args.debug {
        "mcp_chat=debug,warn"
    } else {
        "mcp_chat=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    if args.command.is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

// =============================================================================
// Headless ask
// =============================================================================

async fn run_ask(config: &ClientConfig, text: &str) -> anyhow::Result<()> {
    let registry = HttpRegistry::new(config.api_url.as_str(), config.request_timeout())?;
    let servers = load_servers(&registry).await;

    let (channel, mut events) = transport::connect(&config.ws_url, config.request_timeout())
        .await
        .with_context(|| format!("Failed to connect to {}", config.ws_url))?;

    let mut session = ChatSession::with_transport(config.cursor_policy, channel);
    session.install_servers(servers);

    let mut out = io::stdout().lock();
    let result = headless::ask(&mut session, &mut events, text, &mut out).await;
    out.flush()?;
    session.shutdown().await;
    result
}

// =============================================================================
// TUI
// =============================================================================

async fn run_tui(config: &ClientConfig) -> anyhow::Result<()> {
    let registry = HttpRegistry::new(config.api_url.as_str(), config.request_timeout())?;
    let servers = load_servers(&registry).await;

    let (session, connection, events) =
        match transport::connect(&config.ws_url, config.request_timeout()).await {
            Ok((channel, events)) => (
                ChatSession::with_transport(config.cursor_policy, channel),
                Connection::Connecting,
                Some(events),
            ),
            Err(e) => {
                tracing::warn!(error = %e, url = %config.ws_url, "Chat connection failed");
                (
                    ChatSession::new(config.cursor_policy),
                    Connection::Failed(e.to_string()),
                    None,
                )
            }
        };

    let mut app = App::new(session, connection, config.ws_url.clone());
    app.install_servers(servers);
    if let Connection::Failed(reason) = &app.connection {
        let message = format!("Offline: {reason}");
        app.set_error(message);
    }

    // Setup terminal with mouse capture enabled
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut app, events).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    app.shutdown().await;
    result
}

/// Main event loop. Transport events redraw immediately so streaming text
/// appears as it arrives.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<WsChannel>,
    mut events: Option<mpsc::Receiver<TransportEvent>>,
) -> anyhow::Result<()> {
    loop {
        app.tick_animation();
        terminal.draw(|f| ui::render(f, app))?;

        let tick_rate = if app.is_streaming() {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(100)
        };

        tokio::select! {
            () = tokio::time::sleep(tick_rate) => {
                while event::poll(Duration::from_millis(0)).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        handle_input(app, evt).await;
                    }
                }
            }

            event = next_transport_event(&mut events) => match event {
                Some(event) => {
                    if app.handle_transport_event(event) {
                        terminal.draw(|f| ui::render(f, app))?;
                    }
                }
                None => events = None,
            },
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

async fn next_transport_event(
    events: &mut Option<mpsc::Receiver<TransportEvent>>,
) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn handle_input(app: &mut App<WsChannel>, event: Event) {
    match event {
        Event::Key(key) => app.handle_key(key).await,
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => app.scroll_chat_up(WHEEL_SCROLL),
            MouseEventKind::ScrollDown => app.scroll_chat_down(WHEEL_SCROLL),
            _ => {}
        },
        _ => {}
    }
}
