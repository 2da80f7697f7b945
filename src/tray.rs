use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop};
#[cfg(target_os = "macos")]
use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

use crate::audio::MeterControl;
use crate::controller::IconController;
use crate::icon::{IconEvent, IconImage, IconStyle, WaveIcon};
use crate::surface::IconSurface;

const TOGGLE_ID: &str = "toggle-recording";
const QUIT_ID: &str = "quit";

/// How long the event loop sleeps between queue drains (~60 fps)
const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Action picked from the tray menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    /// Start or stop recording
    ToggleRecording,
    /// Leave the application
    Quit,
}

impl TrayCommand {
    /// Event to put on the icon queue for this command
    #[must_use]
    pub const fn into_event(self) -> IconEvent {
        match self {
            Self::ToggleRecording => IconEvent::ToggleRecording,
            Self::Quit => IconEvent::Shutdown,
        }
    }
}

/// Menu-bar icon showing the rendered waveform
pub struct TraySurface {
    tray: TrayIcon,
    status: MenuItem,
    toggle: MenuItem,
}

impl TraySurface {
    /// Create the tray icon with its menu
    ///
    /// Must be called on the main thread.
    ///
    /// # Errors
    /// Returns error if the menu or tray icon cannot be created
    pub fn new(initial: &IconImage) -> Result<Self> {
        let status = MenuItem::new(Self::get_status_text(false), false, None);
        let toggle = MenuItem::with_id(TOGGLE_ID, Self::get_toggle_text(false), true, None);
        let quit = MenuItem::with_id(QUIT_ID, "Quit", true, None);

        let menu = Menu::new();
        menu.append(&status)
            .context("failed to append status item")?;
        menu.append(&PredefinedMenuItem::separator())
            .context("failed to append separator")?;
        menu.append(&toggle)
            .context("failed to append recording item")?;
        menu.append(&PredefinedMenuItem::separator())
            .context("failed to append separator")?;
        menu.append(&quit).context("failed to append quit item")?;

        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip(Self::get_status_text(false))
            .with_icon(Self::to_icon(initial)?)
            .with_icon_as_template(initial.is_template())
            .build()
            .context("failed to build tray icon")?;

        tracing::info!("tray icon created");
        Ok(Self {
            tray,
            status,
            toggle,
        })
    }

    /// Convert a frame to a tray icon
    ///
    /// macOS gets the alpha-only template so the menu bar can tint it; other
    /// platforms show the gradient colours.
    fn to_icon(image: &IconImage) -> Result<Icon> {
        let (width, height) = image.pixel_size();
        let rgba = if cfg!(target_os = "macos") && image.is_template() {
            image.template_mask().into_raw()
        } else {
            image.pixels().clone().into_raw()
        };
        Icon::from_rgba(rgba, width, height).context("failed to create icon from RGBA data")
    }

    const fn get_status_text(recording: bool) -> &'static str {
        if recording {
            "Wavebar - Recording..."
        } else {
            "Wavebar - Ready"
        }
    }

    const fn get_toggle_text(recording: bool) -> &'static str {
        if recording {
            "Stop Recording"
        } else {
            "Start Recording"
        }
    }

    /// Next pending menu command, if any
    #[must_use]
    pub fn poll_command() -> Option<TrayCommand> {
        if let Ok(event) = MenuEvent::receiver().try_recv() {
            let id = event.id.0.as_str();
            tracing::debug!("tray menu event received: id={:?}", id);
            return Self::parse_menu_event(id);
        }
        None
    }

    fn parse_menu_event(id: &str) -> Option<TrayCommand> {
        match id {
            TOGGLE_ID => Some(TrayCommand::ToggleRecording),
            QUIT_ID => Some(TrayCommand::Quit),
            _ => None,
        }
    }
}

impl IconSurface for TraySurface {
    fn present(&mut self, image: &IconImage) -> Result<()> {
        self.tray
            .set_icon(Some(Self::to_icon(image)?))
            .context("failed to update tray icon")?;
        Ok(())
    }

    fn set_recording(&mut self, recording: bool) -> Result<()> {
        self.status.set_text(Self::get_status_text(recording));
        self.toggle.set_text(Self::get_toggle_text(recording));
        self.tray
            .set_tooltip(Some(Self::get_status_text(recording)))
            .context("failed to update tray tooltip")?;
        tracing::info!("tray menu updated: recording={}", recording);
        Ok(())
    }
}

/// Build the tray and a controller presenting onto it
fn start_controller(
    style: IconStyle,
    events: mpsc::Receiver<IconEvent>,
    meter: Box<dyn MeterControl>,
) -> Result<IconController> {
    let preview = WaveIcon::new(style);
    let tray = TraySurface::new(preview.image())?;
    let mut controller = IconController::new(style, Box::new(tray), events).with_meter(meter);
    controller.start();
    Ok(controller)
}

/// Apply pending menu commands, then queued icon events
///
/// Returns false once the controller should stop.
fn pump_controller(controller: &mut IconController) -> bool {
    while let Some(command) = TraySurface::poll_command() {
        if !controller.handle(command.into_event()) {
            return false;
        }
    }
    controller.drain()
}

/// Run the tray on the platform event loop until Quit or shutdown
///
/// Must be called on the main thread. The tray is created once the loop has
/// started; `runtime` keeps the ticker and meter tasks alive and is shut down
/// on exit.
pub fn run_event_loop(
    style: IconStyle,
    events: mpsc::Receiver<IconEvent>,
    meter: Box<dyn MeterControl>,
    runtime: Runtime,
) -> ! {
    #[cfg_attr(not(target_os = "macos"), allow(unused_mut))]
    let mut event_loop = EventLoop::new();

    // Menu-bar only (no Dock icon); must be set before run()
    #[cfg(target_os = "macos")]
    event_loop.set_activation_policy(ActivationPolicy::Accessory);

    let mut pending = Some((events, meter));
    let mut controller: Option<IconController> = None;
    let mut runtime = Some(runtime);

    event_loop.run(move |event, _, control_flow| {
        if let Event::NewEvents(StartCause::Init) = event {
            if let Some((events, meter)) = pending.take() {
                match start_controller(style, events, meter) {
                    Ok(started) => controller = Some(started),
                    Err(e) => {
                        tracing::error!("failed to start tray: {:#}", e);
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                }
            }
        }

        let Some(active) = controller.as_mut() else {
            return;
        };

        if pump_controller(active) {
            *control_flow = ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL);
            return;
        }

        let state = active.finish();
        tracing::info!(frames = state.frames_rendered, "wavebar exiting");
        // Drops the tray and the meter before the loop tears down
        controller = None;
        if let Some(runtime) = runtime.take() {
            runtime.shutdown_background();
        }
        *control_flow = ControlFlow::Exit;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::WaveIcon;

    #[test]
    fn test_parse_menu_event_toggle() {
        let cmd = TraySurface::parse_menu_event("toggle-recording");
        assert_eq!(cmd, Some(TrayCommand::ToggleRecording));
    }

    #[test]
    fn test_parse_menu_event_quit() {
        let cmd = TraySurface::parse_menu_event("quit");
        assert_eq!(cmd, Some(TrayCommand::Quit));
    }

    #[test]
    fn test_parse_menu_event_unknown() {
        assert!(TraySurface::parse_menu_event("Unknown Item").is_none());
        assert!(TraySurface::parse_menu_event("").is_none());
    }

    #[test]
    fn test_tray_command_into_event() {
        assert_eq!(
            TrayCommand::ToggleRecording.into_event(),
            IconEvent::ToggleRecording
        );
        assert_eq!(TrayCommand::Quit.into_event(), IconEvent::Shutdown);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(TraySurface::get_status_text(false), "Wavebar - Ready");
        assert_eq!(TraySurface::get_status_text(true), "Wavebar - Recording...");
    }

    #[test]
    fn test_toggle_text() {
        assert_eq!(TraySurface::get_toggle_text(false), "Start Recording");
        assert_eq!(TraySurface::get_toggle_text(true), "Stop Recording");
    }

    #[test]
    fn test_to_icon_from_rendered_frame() {
        let icon = WaveIcon::default();
        let result = TraySurface::to_icon(icon.image());
        assert!(result.is_ok(), "Should convert frame: {:?}", result.err());
    }

    #[test]
    fn test_pump_controller_applies_queue_until_shutdown() {
        use crate::surface::MockIconSurface;

        let mut surface = MockIconSurface::new();
        surface.expect_present().times(2).returning(|_| Ok(()));
        surface.expect_set_recording().returning(|_| Ok(()));
        let (tx, rx) = mpsc::channel(4);
        let mut controller = IconController::new(IconStyle::default(), Box::new(surface), rx);

        tx.try_send(IconEvent::ToggleRecording).unwrap();
        tx.try_send(IconEvent::Tick).unwrap();
        assert!(pump_controller(&mut controller));
        assert!(controller.state().recording);

        tx.try_send(IconEvent::Shutdown).unwrap();
        assert!(!pump_controller(&mut controller));
    }

    #[test]
    #[ignore = "Requires main thread and a desktop session for tray creation"]
    fn test_tray_surface_presents_frames() {
        let mut icon = WaveIcon::default();
        let mut tray = TraySurface::new(icon.image()).unwrap();
        icon.tick();
        assert!(tray.present(icon.image()).is_ok());
        assert!(tray.set_recording(true).is_ok());
    }
}
