use std::env;
use std::path::Path;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::AudioPlayer;
use crate::catalog::LocalCatalog;
use crate::engine::Transport;
use crate::mpris::ControlCmd;

mod event_loop;
mod logging;
mod mpris_sync;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, warning) = settings::load_settings();
    let log_file = logging::init(&settings.logging, settings.log_path());
    if let Some(warning) = warning {
        log::warn!("{warning}");
    }

    let dir = env::args().nth(1).unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "Music".to_string())
    });
    log::info!(
        "chordsync starting in {dir} (log: {})",
        log_file.as_deref().map_or("off".into(), |p| p.display().to_string())
    );

    let catalog = Arc::new(LocalCatalog::open(Path::new(&dir), &settings.catalog));
    log::info!("catalog: {} tracks", catalog.tracks().len());

    let transport = Transport::new(
        AudioPlayer::new(),
        catalog.clone(),
        startup::transport_settings(&settings),
    );
    let mut app = App::new(catalog, transport, startup::view_options(&settings));
    app.set_current_dir(dir.clone());

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());

    startup::activate_first_track(&mut app);
    mpris_sync::update_mpris(&mpris, &app);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::default();

        event_loop::run(
            &mut terminal,
            &settings,
            &mut app,
            &mpris,
            &control_tx,
            &control_rx,
            &mut state,
        )
    })();

    app.transport
        .backend()
        .quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = &run_result {
        log::error!("event loop failed: {e}");
    }
    log::info!("chordsync exiting");
    run_result
}
