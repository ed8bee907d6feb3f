use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use gtk4::prelude::*;
use gtk4::{Application, ApplicationWindow};

use crate::error::{AppError, AppResult};
use crate::hotkeys::{HotkeyAction, HotkeyService};
use crate::selector::SelectionMachine;
use crate::settings::SettingsStore;
use crate::ui::LAYOUT_TOKENS;

mod actions;
mod layout;
mod overlay;
mod runtime_css;
mod window_state;
mod worker;

use self::actions::{
    apply_settings, browse_save_directory, reset_settings, start_region_selection,
    trigger_fullscreen_capture, ControllerContext,
};
use self::layout::build_shell_ui;
use self::runtime_css::install_runtime_css;
use self::window_state::{ResizeTracker, WindowGeometry};

const APP_ID: &str = "com.github.snapstamp.Snapstamp";
const HOTKEY_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct App {
    application: Application,
}

impl App {
    pub fn new() -> Self {
        let application = Application::builder().application_id(APP_ID).build();
        Self { application }
    }

    /// Run the GTK main loop; returns once the shell window closes.
    pub fn start(&self) -> AppResult<()> {
        self.application.connect_activate(activate);
        let code = i32::from(self.application.run_with_args::<&str>(&[]));
        if code != 0 {
            return Err(AppError::Startup { code });
        }
        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

fn activate(app: &Application) {
    if let Some(window) = app.active_window() {
        window.present();
        return;
    }

    let tokens = LAYOUT_TOKENS;
    install_runtime_css(tokens);

    let store = Rc::new(RefCell::new(SettingsStore::load()));
    let settings = store.borrow().settings().clone();
    tracing::info!(config = %store.borrow().path().display(), "loaded settings");

    let ui = build_shell_ui(tokens, &settings);
    let window = ApplicationWindow::builder()
        .application(app)
        .title("Snapstamp")
        .build();
    window.set_child(Some(&ui.root));

    let geometry = WindowGeometry::parse(&settings.window_geometry).unwrap_or_else(|| {
        tracing::warn!(
            geometry = %settings.window_geometry,
            "unparseable window geometry; using defaults"
        );
        WindowGeometry {
            width: tokens.shell_default_width,
            height: tokens.shell_default_height,
            x: 0,
            y: 0,
        }
    });
    window.set_default_size(
        geometry.width.max(tokens.shell_min_width),
        geometry.height.max(tokens.shell_min_height),
    );

    let ctx = ControllerContext {
        app: app.clone(),
        window: window.clone(),
        ui: ui.clone(),
        tokens,
        store: store.clone(),
        capture_in_flight: Rc::new(Cell::new(false)),
        selection_active: Rc::new(Cell::new(false)),
        selector: Rc::new(RefCell::new(SelectionMachine::new())),
    };

    ui.full_capture_button.connect_clicked({
        let ctx = ctx.clone();
        move |_| trigger_fullscreen_capture(&ctx)
    });
    ui.region_capture_button.connect_clicked({
        let ctx = ctx.clone();
        move |_| start_region_selection(&ctx)
    });
    ui.apply_button.connect_clicked({
        let ctx = ctx.clone();
        move |_| apply_settings(&ctx)
    });
    ui.reset_button.connect_clicked({
        let ctx = ctx.clone();
        move |_| reset_settings(&ctx)
    });
    ui.browse_button.connect_clicked({
        let ctx = ctx.clone();
        move |_| browse_save_directory(&ctx)
    });

    let hotkeys = match HotkeyService::register(&settings) {
        Ok(service) => Some(Rc::new(service)),
        Err(err) => {
            tracing::warn!(?err, "global hotkeys unavailable");
            ui.set_status_text("Global hotkeys unavailable");
            None
        }
    };
    if let Some(service) = hotkeys.clone() {
        let ctx = ctx.clone();
        gtk4::glib::timeout_add_local(HOTKEY_POLL_INTERVAL, move || {
            for action in service.drain_pressed() {
                match action {
                    HotkeyAction::CaptureFullscreen => trigger_fullscreen_capture(&ctx),
                    HotkeyAction::CaptureRegion => start_region_selection(&ctx),
                }
            }
            gtk4::glib::ControlFlow::Continue
        });
    }

    let resize_tracker = Rc::new(ResizeTracker::default());
    window.connect_map({
        let tracker = resize_tracker.clone();
        move |window| {
            let tracker = tracker.clone();
            let window = window.clone();
            // size settles after the first layout pass
            gtk4::glib::idle_add_local_once(move || {
                tracker.record_baseline(window.width(), window.height());
            });
        }
    });

    window.connect_close_request({
        let store = store.clone();
        let tracker = resize_tracker;
        let hotkeys = hotkeys.clone();
        move |window| {
            if let Some(service) = hotkeys.as_ref() {
                service.unregister_all();
            }
            close_other_windows(window);

            let (width, height) = (window.width(), window.height());
            if tracker.user_resized(width, height) {
                let previous = {
                    let store = store.borrow();
                    WindowGeometry::parse(&store.settings().window_geometry)
                };
                let updated = WindowGeometry {
                    width,
                    height,
                    x: previous.map(|g| g.x).unwrap_or(0),
                    y: previous.map(|g| g.y).unwrap_or(0),
                };
                store.borrow_mut().set_window_geometry(updated.format());
                tracing::info!(geometry = %updated.format(), "persisted window geometry");
            }

            gtk4::glib::Propagation::Proceed
        }
    });

    window.present();
    tracing::info!("shell window presented");
}

/// Tear down any secondary window (the selection overlay) still alive when
/// the shell closes.
fn close_other_windows(shell: &ApplicationWindow) {
    let Some(application) = shell.application() else {
        return;
    };
    let shell = shell.clone().upcast::<gtk4::Window>();
    for open in application.windows() {
        if open != shell {
            open.close();
        }
    }
}
