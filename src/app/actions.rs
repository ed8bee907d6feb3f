use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;
use std::time::Duration;

use gtk4::prelude::*;
use gtk4::{Application, ApplicationWindow, Box as GtkBox, Dialog, Label, Orientation, ResponseType};
use image::RgbaImage;
use thiserror::Error;

use crate::capture::stamp::{stamp_timestamp, StampCorner};
use crate::capture::{self, CaptureError};
use crate::geometry::{ScreenPoint, SelectionRegion};
use crate::notification;
use crate::selector::{SelectionMachine, SelectorEvent, SelectorOutcome};
use crate::settings::{Settings, SettingsStore};
use crate::storage::{OutputWriter, StorageError};
use crate::ui::StyleTokens;

use super::layout::ShellUi;
use super::overlay::present_selection_overlay;
use super::worker::spawn_worker_action;

/// Delay between overlay dismissal and the region grab, so the compositor
/// has unmapped the overlay before the frame is read.
const POST_OVERLAY_CAPTURE_DELAY: Duration = Duration::from_millis(80);

const STAMP_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub(super) enum CaptureFlowError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Save(#[from] StorageError),
}

enum CaptureRequest {
    FullScreen,
    Region { a: ScreenPoint, b: ScreenPoint },
}

/// Shared controller state threaded through every action closure.
#[derive(Clone)]
pub(super) struct ControllerContext {
    pub(super) app: Application,
    pub(super) window: ApplicationWindow,
    pub(super) ui: ShellUi,
    pub(super) tokens: StyleTokens,
    pub(super) store: Rc<RefCell<SettingsStore>>,
    pub(super) capture_in_flight: Rc<Cell<bool>>,
    pub(super) selection_active: Rc<Cell<bool>>,
    pub(super) selector: Rc<RefCell<SelectionMachine>>,
}

pub(super) fn trigger_fullscreen_capture(ctx: &ControllerContext) {
    if ctx.selection_active.get() {
        ctx.ui.set_status_text("Region selection in progress");
        return;
    }
    if ctx.capture_in_flight.replace(true) {
        ctx.ui.set_status_text("A capture is already in progress");
        return;
    }

    ctx.ui.set_status_text("Capturing full screen…");
    let settings = ctx.store.borrow().settings().clone();
    let ctx = ctx.clone();
    spawn_worker_action(
        move || capture_and_save(&settings, CaptureRequest::FullScreen),
        move |result| {
            ctx.capture_in_flight.set(false);
            finish_capture(&ctx, result);
        },
    );
}

pub(super) fn start_region_selection(ctx: &ControllerContext) {
    if ctx.selection_active.get() || ctx.capture_in_flight.get() {
        ctx.ui.set_status_text("Another capture is already in progress");
        return;
    }

    if ctx
        .selector
        .borrow_mut()
        .transition(SelectorEvent::OverlayShown)
        .is_err()
    {
        ctx.ui.set_status_text("Region selection already active");
        return;
    }

    ctx.selection_active.set(true);
    ctx.ui.set_region_capture_enabled(false);
    ctx.ui.set_status_text("Drag to select a region (Esc cancels)");

    let on_outcome: Rc<dyn Fn(SelectorOutcome)> = {
        let ctx = ctx.clone();
        Rc::new(move |outcome| handle_selection_outcome(&ctx, outcome))
    };

    let screen = capture::screen_size();
    if let Err(err) =
        present_selection_overlay(&ctx.app, screen, ctx.selector.clone(), on_outcome)
    {
        tracing::warn!(?err, "selection overlay setup failed");
        if let Err(err) = ctx.selector.borrow_mut().transition(SelectorEvent::OverlayFailed) {
            tracing::warn!(?err, "selector did not unwind after overlay failure");
        }
        ctx.selection_active.set(false);
        ctx.ui.set_region_capture_enabled(true);
        ctx.ui.set_status_text("Region selection unavailable");
        show_error_dialog(&ctx.window, "Region Selection Error", &err.to_string());
    }
}

fn handle_selection_outcome(ctx: &ControllerContext, outcome: SelectorOutcome) {
    ctx.selection_active.set(false);
    ctx.ui.set_region_capture_enabled(true);

    match outcome {
        SelectorOutcome::Selected(region) => queue_region_capture(ctx, region),
        SelectorOutcome::RegionTooSmall => {
            ctx.ui
                .set_status_text("Region too small - please select a larger area");
        }
        SelectorOutcome::Cancelled => ctx.ui.set_status_text("Region selection cancelled"),
    }
}

fn queue_region_capture(ctx: &ControllerContext, region: SelectionRegion) {
    if ctx.capture_in_flight.replace(true) {
        ctx.ui.set_status_text("A capture is already in progress");
        return;
    }

    ctx.ui.set_status_text("Capturing region…");
    let settings = ctx.store.borrow().settings().clone();
    let a = ScreenPoint::new(region.x, region.y);
    let b = ScreenPoint::new(region.x + region.width as i32, region.y + region.height as i32);

    let ctx = ctx.clone();
    gtk4::glib::timeout_add_local_once(POST_OVERLAY_CAPTURE_DELAY, move || {
        let ctx = ctx.clone();
        spawn_worker_action(
            move || capture_and_save(&settings, CaptureRequest::Region { a, b }),
            move |result| {
                ctx.capture_in_flight.set(false);
                finish_capture(&ctx, result);
            },
        );
    });
}

/// Runs on a worker thread; must not touch any widget.
fn capture_and_save(
    settings: &Settings,
    request: CaptureRequest,
) -> Result<PathBuf, CaptureFlowError> {
    let frame = match request {
        CaptureRequest::FullScreen => capture::capture_full_screen()?,
        CaptureRequest::Region { a, b } => capture::capture_region(a, b)?,
    };
    let stamped = apply_timestamp(frame);
    let writer = OutputWriter::from_settings(settings);
    Ok(writer.save_screenshot(&stamped, None)?)
}

fn apply_timestamp(frame: RgbaImage) -> RgbaImage {
    let caption = chrono::Local::now().format(STAMP_TEXT_FORMAT).to_string();
    match stamp_timestamp(&frame, StampCorner::BottomRight, &caption) {
        Ok(stamped) => stamped,
        Err(err) => {
            tracing::warn!(?err, "timestamp stamp failed; saving unstamped frame");
            frame
        }
    }
}

fn finish_capture(ctx: &ControllerContext, result: Result<PathBuf, CaptureFlowError>) {
    match result {
        Ok(path) => {
            let settings = ctx.store.borrow().settings().clone();
            tracing::info!(path = %path.display(), "capture saved");
            ctx.ui.set_status_text(&format!("Saved {}", path.display()));
            if settings.show_preview {
                ctx.ui.show_preview_from_file(&path, ctx.tokens);
            }
            notification::send("Screenshot saved", path.display().to_string());
            if settings.auto_open_folder {
                open_save_directory(&settings.save_directory);
            }
        }
        Err(err) => {
            tracing::warn!(?err, "capture failed");
            ctx.ui.set_status_text("Capture failed");
            show_error_dialog(&ctx.window, "Capture Error", &err.to_string());
        }
    }
}

pub(super) fn apply_settings(ctx: &ControllerContext) {
    let patch = ctx.ui.settings_patch();
    ctx.store.borrow_mut().update(patch);
    let settings = ctx.store.borrow().settings().clone();
    ctx.ui.set_preview_visible(settings.show_preview);
    ctx.ui.set_status_text("Settings saved");
}

pub(super) fn reset_settings(ctx: &ControllerContext) {
    ctx.store.borrow_mut().reset_to_defaults();
    let settings = ctx.store.borrow().settings().clone();
    ctx.ui.load_settings(&settings);
    ctx.ui.set_preview_visible(settings.show_preview);
    ctx.ui.set_status_text("Settings reset to defaults");
}

pub(super) fn browse_save_directory(ctx: &ControllerContext) {
    let dialog = gtk4::FileChooserDialog::new(
        Some("Choose save directory"),
        Some(&ctx.window),
        gtk4::FileChooserAction::SelectFolder,
        &[
            ("Cancel", ResponseType::Cancel),
            ("Select", ResponseType::Accept),
        ],
    );
    dialog.set_modal(true);

    let ui = ctx.ui.clone();
    dialog.connect_response(move |dialog, response| {
        if response == ResponseType::Accept {
            if let Some(path) = dialog.file().and_then(|file| file.path()) {
                ui.set_directory_text(&path);
            }
        }
        dialog.close();
    });
    dialog.present();
}

pub(super) fn show_error_dialog(window: &ApplicationWindow, title: &str, detail: &str) {
    let dialog = Dialog::new();
    dialog.set_title(Some(title));
    dialog.set_transient_for(Some(window));
    dialog.set_modal(true);
    dialog.set_destroy_with_parent(true);
    dialog.add_button("OK", ResponseType::Ok);
    dialog.set_default_response(ResponseType::Ok);

    let body = Label::new(Some(detail));
    body.set_wrap(true);
    body.set_max_width_chars(60);

    let dialog_content = GtkBox::new(Orientation::Vertical, 0);
    dialog_content.set_margin_top(12);
    dialog_content.set_margin_bottom(12);
    dialog_content.set_margin_start(12);
    dialog_content.set_margin_end(12);
    dialog_content.append(&body);
    dialog.content_area().append(&dialog_content);

    dialog.connect_response(move |dialog, _| dialog.close());
    dialog.present();
}

fn open_save_directory(directory: &Path) {
    if let Err(err) = Command::new("xdg-open").arg(directory).spawn() {
        tracing::warn!(?err, path = %directory.display(), "failed to open save directory");
    }
}
