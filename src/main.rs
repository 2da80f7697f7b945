use anyhow::{Context, Result};
use tokio::sync::mpsc;

use wavebar::config::{Config, SurfaceKind};
use wavebar::controller::{spawn_ticker, IconController};
use wavebar::icon::IconEvent;
use wavebar::surface::PngSurface;
use wavebar::{audio, telemetry, tray};

fn main() -> Result<()> {
    let config = Config::load()?;
    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!("wavebar starting");

    // Background tasks live on the runtime; the main thread is kept free for
    // the platform event loop in tray mode.
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let (events, receiver) = mpsc::channel::<IconEvent>(config.meter.queue_capacity.max(1));
    let style = config.icon.style();

    let meter = {
        let _guard = runtime.enter();
        let meter = audio::start(&config.meter, events.clone())?;
        let _ticker = spawn_ticker(config.icon.tick_interval(), events.clone());

        let shutdown = events.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
                let _ = shutdown.send(IconEvent::Shutdown).await;
            }
        });
        meter
    };
    drop(events);

    match config.surface.kind {
        SurfaceKind::Tray => tray::run_event_loop(style, receiver, Box::new(meter), runtime),
        SurfaceKind::Png => {
            let dir = Config::expand_path(&config.surface.png_dir)?;
            tracing::info!(dir = %dir.display(), every = config.surface.png_every, "writing frames");
            let surface = PngSurface::new(dir, config.surface.png_every);
            let mut controller = IconController::new(style, Box::new(surface), receiver)
                .with_meter(Box::new(meter));
            let state = runtime.block_on(controller.run());
            tracing::info!(frames = state.frames_rendered, "wavebar exiting");
            Ok(())
        }
    }
}
