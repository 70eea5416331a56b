mod controller;
mod view;

#[cfg(not(unix))]
compile_error!("fractal-player drives mpv over a Unix socket and needs a Unix platform");

use std::io;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use fractal_player::catalog::CatalogClient;
use fractal_player::config::Config;
use fractal_player::logging;
use fractal_player::model::AppModel;
use fractal_player::mpv::MpvSurface;
use fractal_player::player::{
    event_channel, spawn_player, HlsEngine, NoEngine, PlaybackController, PlaybackOrchestrator,
    RenderingMode, StreamingEngine, SurfaceSet,
};

use controller::AppController;
use view::AppView;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    if let Err(e) = logging::init_logging(&config.log_dir) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!(origin = %config.origin, "=== fractal-player starting ===");

    let catalog = CatalogClient::builder(config.origin.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let model = Arc::new(AppModel::new(config.initial_volume));

    // Player task: the HLS engine picks a rendition and mpv renders it
    let engine: Box<dyn StreamingEngine> = if config.adaptive_streaming {
        Box::new(HlsEngine::new(catalog.http_client().clone()))
    } else {
        Box::new(NoEngine)
    };
    let (events_tx, events_rx) = event_channel();
    let surfaces = SurfaceSet::new(
        Box::new(MpvSurface::new(RenderingMode::Audio, config.mpv_path.clone())),
        Box::new(MpvSurface::new(RenderingMode::Video, config.mpv_path.clone())),
    );
    let playback = PlaybackController::new(engine, surfaces, catalog.origin(), events_tx)
        .with_volume(config.initial_volume)
        .with_max_recovery_attempts(config.max_recovery_attempts);
    let (display_tx, display_rx) = mpsc::unbounded_channel();
    let orchestrator = PlaybackOrchestrator::new(playback, display_tx);
    let (player, player_task) = spawn_player(orchestrator, events_rx);

    let controller = AppController::new(model.clone(), player, catalog);
    let display_task = controller.start_display_listener(display_rx);
    controller.load_catalog().await;

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model, &controller).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    controller.shutdown().await;
    if let Err(e) = player_task.await {
        tracing::error!(error = %e, "Player task failed");
    }
    display_task.abort();

    tracing::info!("fractal-player shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<AppModel>,
    controller: &AppController,
) -> io::Result<()> {
    loop {
        // Auto-clear old errors (after 5 seconds)
        model.auto_clear_old_errors().await;

        let playback = model.get_playback_info().await;
        let ui_state = model.get_ui_state().await;
        let catalog_state = model.get_catalog_state().await;
        let should_quit = model.should_quit().await;

        terminal.draw(|f| {
            AppView::render(f, &playback, &ui_state, &catalog_state);
        })?;

        if should_quit {
            break;
        }

        // Handle input with shorter poll time for smoother UI updates
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Err(e) = controller.handle_key_event(key).await {
                    tracing::warn!(error = %e, "Key handling failed");
                }
            }
        }
    }

    Ok(())
}
