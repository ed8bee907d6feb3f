//! Interactive region selection modeled as an explicit state machine.
//!
//! The machine owns only the gesture bookkeeping; the GTK overlay feeds it
//! pointer and key events and reacts to the outcomes. Every terminal event
//! returns the machine to `Idle`, so a single value drives any number of
//! selection gestures.

use thiserror::Error;

use crate::geometry::{ScreenPoint, SelectionRegion};

pub type SelectorResult<T> = std::result::Result<T, SelectorError>;

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("invalid selector transition: from {from:?} using event {event:?}")]
    InvalidTransition {
        from: SelectorState,
        event: SelectorEvent,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectorState {
    #[default]
    Idle,
    /// Overlay is visible, waiting for the first pointer press.
    Armed,
    /// Pointer is down; the rectangle spans anchor to cursor.
    Dragging {
        anchor: ScreenPoint,
        cursor: ScreenPoint,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorEvent {
    OverlayShown,
    OverlayFailed,
    PointerPressed(ScreenPoint),
    PointerMoved(ScreenPoint),
    PointerReleased(ScreenPoint),
    EscapePressed,
}

/// Terminal result of a selection gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorOutcome {
    Selected(SelectionRegion),
    RegionTooSmall,
    Cancelled,
}

#[derive(Debug, Default)]
pub struct SelectionMachine {
    state: SelectorState,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != SelectorState::Idle
    }

    /// Current rubber-band corners, for the overlay painter.
    pub fn drag_rectangle(&self) -> Option<(ScreenPoint, ScreenPoint)> {
        match self.state {
            SelectorState::Dragging { anchor, cursor } => Some((anchor, cursor)),
            _ => None,
        }
    }

    fn next(&self, event: SelectorEvent) -> Option<(SelectorState, Option<SelectorOutcome>)> {
        use SelectorEvent::*;
        match (self.state, event) {
            (SelectorState::Idle, OverlayShown) => Some((SelectorState::Armed, None)),
            (SelectorState::Idle | SelectorState::Armed, OverlayFailed) => {
                Some((SelectorState::Idle, Some(SelectorOutcome::Cancelled)))
            }
            (SelectorState::Armed, PointerPressed(point)) => Some((
                SelectorState::Dragging {
                    anchor: point,
                    cursor: point,
                },
                None,
            )),
            // hover before the first press is benign
            (SelectorState::Armed, PointerMoved(_)) => Some((SelectorState::Armed, None)),
            (SelectorState::Dragging { anchor, .. }, PointerMoved(point)) => Some((
                SelectorState::Dragging {
                    anchor,
                    cursor: point,
                },
                None,
            )),
            (SelectorState::Dragging { anchor, .. }, PointerReleased(point)) => {
                Some((SelectorState::Idle, Some(release_outcome(anchor, point))))
            }
            (SelectorState::Armed | SelectorState::Dragging { .. }, EscapePressed) => {
                Some((SelectorState::Idle, Some(SelectorOutcome::Cancelled)))
            }
            _ => None,
        }
    }

    /// Apply an event, replacing the state wholesale. Terminal events return
    /// the gesture outcome.
    pub fn transition(&mut self, event: SelectorEvent) -> SelectorResult<Option<SelectorOutcome>> {
        tracing::debug!(from = ?self.state, event = ?event, "selector transition");
        let Some((next, outcome)) = self.next(event) else {
            tracing::warn!(from = ?self.state, event = ?event, "invalid selector transition");
            return Err(SelectorError::InvalidTransition {
                from: self.state,
                event,
            });
        };
        self.state = next;
        Ok(outcome)
    }
}

fn release_outcome(anchor: ScreenPoint, release: ScreenPoint) -> SelectorOutcome {
    match SelectionRegion::from_corners(anchor, release) {
        Some(region) if region.meets_minimum_size() => SelectorOutcome::Selected(region),
        _ => SelectorOutcome::RegionTooSmall,
    }
}
