//! Fullscreen translucent overlay that hosts the region-selection gesture.
//!
//! The overlay owns no selection state of its own; it forwards pointer and
//! key events to the shared [`SelectionMachine`] and closes itself on every
//! terminal outcome.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{Application, DrawingArea, EventControllerKey, GestureDrag, Window};
use thiserror::Error;

use crate::geometry::{ScreenPoint, ScreenSize};
use crate::selector::{SelectionMachine, SelectorEvent, SelectorOutcome};

#[derive(Debug, Error)]
pub(super) enum OverlayError {
    #[error("no display available for the selection overlay")]
    NoDisplay,
}

/// Build, present, and wire the overlay window. The caller arms the machine
/// before calling and unwinds it if this fails; `on_outcome` fires exactly
/// once per gesture, after the overlay has been closed.
pub(super) fn present_selection_overlay(
    app: &Application,
    screen: ScreenSize,
    machine: Rc<RefCell<SelectionMachine>>,
    on_outcome: Rc<dyn Fn(SelectorOutcome)>,
) -> Result<Window, OverlayError> {
    if gtk4::gdk::Display::default().is_none() {
        return Err(OverlayError::NoDisplay);
    }

    let window = Window::new();
    window.set_application(Some(app));
    window.set_decorated(false);
    window.add_css_class("selection-overlay");
    window.set_default_size(screen.width as i32, screen.height as i32);

    let canvas = DrawingArea::new();
    canvas.set_hexpand(true);
    canvas.set_vexpand(true);
    {
        let machine = machine.clone();
        canvas.set_draw_func(move |_, context, _, _| {
            draw_rubber_band(context, &machine.borrow());
        });
    }
    window.set_child(Some(&canvas));

    // fires at most once even when several exit paths race
    let finish: Rc<dyn Fn(SelectorOutcome)> = {
        let window = window.clone();
        let finished = Cell::new(false);
        let on_outcome = on_outcome.clone();
        Rc::new(move |outcome: SelectorOutcome| {
            if finished.replace(true) {
                return;
            }
            window.close();
            on_outcome(outcome);
        })
    };

    let drag = GestureDrag::new();
    {
        let machine = machine.clone();
        let canvas = canvas.clone();
        drag.connect_drag_begin(move |_, x, y| {
            feed(&machine, SelectorEvent::PointerPressed(event_point(x, y)));
            canvas.queue_draw();
        });
    }
    {
        let machine = machine.clone();
        let canvas = canvas.clone();
        drag.connect_drag_update(move |gesture, dx, dy| {
            let Some((start_x, start_y)) = gesture.start_point() else {
                return;
            };
            feed(
                &machine,
                SelectorEvent::PointerMoved(event_point(start_x + dx, start_y + dy)),
            );
            canvas.queue_draw();
        });
    }
    {
        let machine = machine.clone();
        let finish = finish.clone();
        drag.connect_drag_end(move |gesture, dx, dy| {
            let Some((start_x, start_y)) = gesture.start_point() else {
                return;
            };
            let outcome = feed(
                &machine,
                SelectorEvent::PointerReleased(event_point(start_x + dx, start_y + dy)),
            );
            if let Some(outcome) = outcome {
                finish(outcome);
            }
        });
    }
    canvas.add_controller(drag);

    let keys = EventControllerKey::new();
    {
        let machine = machine.clone();
        let finish = finish.clone();
        keys.connect_key_pressed(move |_, key, _, _| {
            if key != gtk4::gdk::Key::Escape {
                return gtk4::glib::Propagation::Proceed;
            }
            if let Some(outcome) = feed(&machine, SelectorEvent::EscapePressed) {
                finish(outcome);
            }
            gtk4::glib::Propagation::Stop
        });
    }
    window.add_controller(keys);

    // compositor-initiated close (or app shutdown) counts as a cancel
    {
        let machine = machine.clone();
        let finish = finish.clone();
        window.connect_close_request(move |_| {
            if machine.borrow().is_active() {
                if let Some(outcome) = feed(&machine, SelectorEvent::EscapePressed) {
                    finish(outcome);
                }
            }
            gtk4::glib::Propagation::Proceed
        });
    }

    window.fullscreen();
    window.present();

    Ok(window)
}

fn feed(machine: &Rc<RefCell<SelectionMachine>>, event: SelectorEvent) -> Option<SelectorOutcome> {
    match machine.borrow_mut().transition(event) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(?err, "overlay event ignored");
            None
        }
    }
}

fn event_point(x: f64, y: f64) -> ScreenPoint {
    ScreenPoint::new(x.round() as i32, y.round() as i32)
}

fn draw_rubber_band(context: &gtk4::cairo::Context, machine: &SelectionMachine) {
    let Some((anchor, cursor)) = machine.drag_rectangle() else {
        return;
    };

    let x = f64::from(anchor.x.min(cursor.x));
    let y = f64::from(anchor.y.min(cursor.y));
    let width = f64::from(anchor.x.abs_diff(cursor.x));
    let height = f64::from(anchor.y.abs_diff(cursor.y));

    context.rectangle(x, y, width, height);
    context.set_source_rgba(1.0, 1.0, 1.0, 0.25);
    let _ = context.fill_preserve();
    context.set_source_rgb(0.86, 0.18, 0.18);
    context.set_line_width(2.0);
    let _ = context.stroke();
}
