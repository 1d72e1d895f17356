use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::*;
use mudchat_core::{Config, GameApi, GameController, SessionClient, Theme};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::{Action, App, InputMode, View};
use tui::{AppEvent, EventHandler, Tui};

#[derive(Parser)]
#[command(name = "mudchat")]
#[command(about = "Terminal client for the MUD adventure game server", version)]
struct Cli {
    /// Game server base URL
    #[arg(long, env = "MUDCHAT_SERVER")]
    server: Option<String>,

    /// Theme for the next new game
    #[arg(long)]
    theme: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file (defaults to the user data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved games on the server
    Sessions,
    /// List available themes
    Themes,
    /// Delete saved games older than the given number of days
    Cleanup {
        #[arg(short, long, default_value = "7")]
        days: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_file.as_deref())?;

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::get_config_path()?,
    };
    let config = Config::load_from(&config_path)
        .with_context(|| format!("Failed to read config at {}", config_path.display()))?;

    let server_url = resolve_server_url(cli.server.as_deref(), &config);
    let theme = resolve_theme(cli.theme.as_deref(), &config)?;
    info!(%server_url, %theme, "mudchat starting");

    let client = SessionClient::connect(&server_url);

    match cli.command {
        Some(Commands::Sessions) => list_sessions(&client).await,
        Some(Commands::Themes) => {
            list_themes(theme);
            Ok(())
        }
        Some(Commands::Cleanup { days }) => cleanup_sessions(&client, days).await,
        None => {
            let mut controller = GameController::new(client).with_preferences(&config, config_path);
            controller.select_theme(theme);
            run_tui(&mut controller).await
        }
    }
}

fn resolve_server_url(flag: Option<&str>, config: &Config) -> String {
    flag.map(str::to_string)
        .unwrap_or_else(|| config.server_url().to_string())
}

fn resolve_theme(flag: Option<&str>, config: &Config) -> Result<Theme> {
    match flag {
        Some(name) => Theme::from_str(name).ok_or_else(|| {
            let known: Vec<&str> = Theme::all().iter().map(Theme::as_str).collect();
            anyhow!("Unknown theme '{}'. Available: {}", name, known.join(", "))
        }),
        None => Ok(config.theme()),
    }
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mudchat")
        .join("mudchat.log")
}

/// Creates the log directory and splits `path` into directory and file name.
fn prepare_log_file(path: &Path) -> Result<(PathBuf, PathBuf)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("Log path {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&dir)?;
    Ok((dir, PathBuf::from(file_name)))
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(path: Option<&Path>) -> Result<WorkerGuard> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_log_path);
    let (dir, file_name) = prepare_log_file(&path)?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();

    Ok(guard)
}

async fn list_sessions<A: GameApi>(client: &SessionClient<A>) -> Result<()> {
    println!("\n{}", "Previous Games".bold().blue());
    println!("{}", "=".repeat(40).dimmed());

    match client.list_saved_sessions().await {
        Ok(sessions) if sessions.is_empty() => {
            println!("{}", "No saved games found".yellow());
        }
        Ok(sessions) => {
            for session in sessions {
                println!(
                    "  {}  {}  {}",
                    session.id.bold(),
                    session.theme.green(),
                    session
                        .created_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string()
                        .dimmed()
                );
            }
        }
        Err(e) => {
            println!("{}: {}", "Error loading saved sessions".red(), e);
            println!("Make sure the game server is running: {}", "uvicorn api:app".bold());
        }
    }

    Ok(())
}

fn list_themes(selected: Theme) {
    println!("\n{}", "Available Themes".bold().blue());
    println!("{}", "=".repeat(40).dimmed());

    for theme in Theme::all() {
        let marker = if theme == selected { "*" } else { " " };
        println!(
            "{} {:<16} {}",
            marker,
            theme.as_str().green(),
            theme.display_name()
        );
    }
}

async fn cleanup_sessions<A: GameApi>(client: &SessionClient<A>, days: u32) -> Result<()> {
    let report = match client.cleanup_sessions(days).await {
        Ok(report) => report,
        Err(e) => bail!("Cleanup failed: {}", e),
    };

    println!("{}", report.message);
    if let (Some(removed), Some(remaining)) = (report.removed_count, report.remaining_count) {
        println!(
            "{} removed, {} remaining",
            removed.to_string().bold(),
            remaining.to_string().bold()
        );
    }

    Ok(())
}

async fn run_tui<A: GameApi>(controller: &mut GameController<A>) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run_app(&mut terminal, controller).await;

    tui::restore()?;
    result
}

async fn run_app<A: GameApi>(terminal: &mut Tui, controller: &mut GameController<A>) -> Result<()> {
    let mut app = App::new();
    let mut events = EventHandler::new(Duration::from_millis(120));

    // Saved games are offered on the welcome screen
    app.request(Action::RefreshSessions);

    loop {
        let view = View::capture(controller);
        terminal.draw(|frame| ui::render(&mut app, &view, frame))?;

        if let Some(action) = app.pending_action.take() {
            run_action(terminal, &mut app, controller, &mut events, action).await?;
        } else {
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, controller, event)?,
                None => break,
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Runs one remote action to completion. Meanwhile the screen is drawn from
/// a snapshot, the spinner keeps turning and key presses are dropped.
async fn run_action<A: GameApi>(
    terminal: &mut Tui,
    app: &mut App,
    controller: &mut GameController<A>,
    events: &mut EventHandler,
    action: Action,
) -> Result<()> {
    let opens_game = matches!(action, Action::StartGame | Action::LoadGame(_));
    let view = View::capture(controller).in_flight(&action);
    terminal.draw(|frame| ui::render(app, &view, frame))?;

    {
        let operation = action.perform(controller);
        tokio::pin!(operation);
        let mut events_open = true;

        loop {
            tokio::select! {
                _ = &mut operation => break,
                event = events.next(), if events_open => match event {
                    Some(AppEvent::Key(key)) if handler::is_quit_chord(&key) => {
                        app.should_quit = true;
                    }
                    Some(AppEvent::Tick) => {
                        app.tick_animation();
                        terminal.draw(|frame| ui::render(app, &view, frame))?;
                    }
                    Some(AppEvent::Resize) => {
                        terminal.draw(|frame| ui::render(app, &view, frame))?;
                    }
                    Some(_) => {}
                    None => events_open = false,
                },
            }
        }
    }

    if opens_game && controller.is_in_progress() && controller.error().is_none() {
        app.input_mode = InputMode::Editing;
        app.follow_chat = true;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_server_flag_overrides_config() {
        let config = Config {
            server_url: Some("http://configured:9000".to_string()),
            ..Config::new()
        };
        assert_eq!(
            resolve_server_url(Some("http://flag:1234"), &config),
            "http://flag:1234"
        );
        assert_eq!(resolve_server_url(None, &config), "http://configured:9000");
        assert_eq!(
            resolve_server_url(None, &Config::new()),
            "http://localhost:8000"
        );
    }

    #[test]
    fn test_theme_flag_validation() {
        let config = Config {
            default_theme: Some("gym".to_string()),
            ..Config::new()
        };
        assert_eq!(resolve_theme(None, &config).unwrap(), Theme::Gym);
        assert_eq!(resolve_theme(Some("church"), &config).unwrap(), Theme::Church);

        let err = resolve_theme(Some("dungeon"), &config).unwrap_err();
        assert!(err.to_string().contains("Unknown theme 'dungeon'"));
    }

    #[test]
    fn test_prepare_log_file_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("mudchat.log");

        let (log_dir, file_name) = prepare_log_file(&path).unwrap();
        assert!(log_dir.is_dir());
        assert_eq!(file_name, PathBuf::from("mudchat.log"));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["mudchat", "--server", "http://x:1", "cleanup", "--days", "3"])
            .unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://x:1"));
        assert!(matches!(cli.command, Some(Commands::Cleanup { days: 3 })));
    }
}
