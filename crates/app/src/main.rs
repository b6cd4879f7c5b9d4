//! Anarchy - Main Entry Point
//!
//! Opens the window, then runs the main loop: pump events, run the game
//! layer once the window is ready, pace toward the target frame rate.
//! The loop ends when the window manager asks to close the window.

use anyhow::{Context, Result};
use tracing::{debug, info};

use anarchy_core::{FrameScheduler, FrameTimer, TARGET_FRAME_RATE};
use anarchy_platform::{InputState, WindowConfig, WindowContext};

/// Stand-in for the game layer, which lives outside this repository.
struct Game {
    frames: u64,
}

impl Game {
    fn start(window: &WindowContext) -> Self {
        let geometry = window.geometry();
        info!(
            "Starting game on a {}x{} window ({} samples)",
            geometry.width,
            geometry.height,
            window.fb_config().samples
        );
        Self { frames: 0 }
    }

    fn frame(&mut self, input: &InputState) {
        self.frames += 1;

        for key in input.keys_pressed() {
            debug!("Key {} pressed", key);
        }
        if let Some(button) = input.click_button()
            && input.button_up().is_some()
        {
            debug!("Click with {:?} at {:?}", button, input.click_pos());
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    anarchy_core::init_logging();
    info!("Starting Anarchy");

    let config = WindowConfig::new("Anarchy FM").with_msaa(4);
    let mut window = WindowContext::init(&config).context("Failed to set up the window")?;

    let mut input = InputState::new();
    let mut timer = FrameTimer::new();
    let mut scheduler = FrameScheduler::new();
    let mut game: Option<Game> = None;

    info!("Entering main loop at {} Hz", TARGET_FRAME_RATE);

    loop {
        timer.start_frame();

        let summary = window.process_events(&mut input, -1);
        if summary.close_requested() {
            info!("Close requested, shutting down");
            break;
        }

        if window.is_ready() {
            game.get_or_insert_with(|| Game::start(&window))
                .frame(&input);
            window.present();
        }

        let span = timer.end_frame();
        scheduler.pace(span);
    }

    info!(
        "Ran {} frames ({} game frames), {:.1} fps average",
        timer.frame_count(),
        game.map_or(0, |game| game.frames),
        timer.average_fps()
    );

    Ok(())
}
