//! System-wide hotkey registration for the two capture actions.
//!
//! Bindings come from configuration as `"ctrl+print_screen"`-style strings.
//! Events are drained on the GTK main loop via [`HotkeyService::drain_pressed`];
//! the receiver callback never touches widgets from another thread.

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use thiserror::Error;

use crate::settings::Settings;

pub type HotkeyResult<T> = std::result::Result<T, HotkeyError>;

#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("empty hotkey binding")]
    EmptyBinding,
    #[error("hotkey binding '{binding}' names more than one key")]
    MultipleKeys { binding: String },
    #[error("unknown key token '{token}' in hotkey binding '{binding}'")]
    UnknownKey { binding: String, token: String },
    #[error("failed to initialize the global hotkey manager")]
    Manager {
        #[source]
        source: global_hotkey::Error,
    },
    #[error("failed to register hotkey '{binding}'")]
    Register {
        binding: String,
        #[source]
        source: global_hotkey::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    CaptureFullscreen,
    CaptureRegion,
}

/// A parsed binding: zero or more modifiers plus exactly one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub modifiers: Modifiers,
    pub code: Code,
}

impl HotkeyBinding {
    pub fn parse(binding: &str) -> HotkeyResult<Self> {
        let mut modifiers = Modifiers::empty();
        let mut code = None;

        for raw in binding.split('+') {
            let token = raw.trim().to_ascii_lowercase();
            if token.is_empty() {
                continue;
            }
            match token.as_str() {
                "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
                "shift" => modifiers |= Modifiers::SHIFT,
                "alt" => modifiers |= Modifiers::ALT,
                "super" | "meta" | "cmd" => modifiers |= Modifiers::META,
                _ => {
                    if code.is_some() {
                        return Err(HotkeyError::MultipleKeys {
                            binding: binding.to_string(),
                        });
                    }
                    code = Some(key_code_for(&token).ok_or_else(|| HotkeyError::UnknownKey {
                        binding: binding.to_string(),
                        token: token.clone(),
                    })?);
                }
            }
        }

        let code = code.ok_or(HotkeyError::EmptyBinding)?;
        Ok(Self { modifiers, code })
    }

    fn to_hotkey(self) -> HotKey {
        let modifiers = (!self.modifiers.is_empty()).then_some(self.modifiers);
        HotKey::new(modifiers, self.code)
    }
}

fn key_code_for(token: &str) -> Option<Code> {
    let code = match token {
        "print_screen" | "printscreen" | "print" => Code::PrintScreen,
        "escape" | "esc" => Code::Escape,
        "enter" | "return" => Code::Enter,
        "space" => Code::Space,
        "tab" => Code::Tab,
        "insert" => Code::Insert,
        "delete" => Code::Delete,
        "home" => Code::Home,
        "end" => Code::End,
        "page_up" => Code::PageUp,
        "page_down" => Code::PageDown,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        _ => return single_character_code(token),
    };
    Some(code)
}

fn single_character_code(token: &str) -> Option<Code> {
    let mut chars = token.chars();
    let ch = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let code = match ch {
        'a' => Code::KeyA,
        'b' => Code::KeyB,
        'c' => Code::KeyC,
        'd' => Code::KeyD,
        'e' => Code::KeyE,
        'f' => Code::KeyF,
        'g' => Code::KeyG,
        'h' => Code::KeyH,
        'i' => Code::KeyI,
        'j' => Code::KeyJ,
        'k' => Code::KeyK,
        'l' => Code::KeyL,
        'm' => Code::KeyM,
        'n' => Code::KeyN,
        'o' => Code::KeyO,
        'p' => Code::KeyP,
        'q' => Code::KeyQ,
        'r' => Code::KeyR,
        's' => Code::KeyS,
        't' => Code::KeyT,
        'u' => Code::KeyU,
        'v' => Code::KeyV,
        'w' => Code::KeyW,
        'x' => Code::KeyX,
        'y' => Code::KeyY,
        'z' => Code::KeyZ,
        '0' => Code::Digit0,
        '1' => Code::Digit1,
        '2' => Code::Digit2,
        '3' => Code::Digit3,
        '4' => Code::Digit4,
        '5' => Code::Digit5,
        '6' => Code::Digit6,
        '7' => Code::Digit7,
        '8' => Code::Digit8,
        '9' => Code::Digit9,
        _ => return None,
    };
    Some(code)
}

/// Owns the registered hotkeys for the lifetime of the application.
pub struct HotkeyService {
    manager: GlobalHotKeyManager,
    fullscreen: HotKey,
    region: HotKey,
}

impl HotkeyService {
    /// Parse and register both capture bindings from the current settings.
    pub fn register(settings: &Settings) -> HotkeyResult<Self> {
        let fullscreen = HotkeyBinding::parse(&settings.hotkey_fullscreen)?.to_hotkey();
        let region = HotkeyBinding::parse(&settings.hotkey_region)?.to_hotkey();

        let manager = GlobalHotKeyManager::new().map_err(|source| HotkeyError::Manager { source })?;
        manager
            .register(fullscreen)
            .map_err(|source| HotkeyError::Register {
                binding: settings.hotkey_fullscreen.clone(),
                source,
            })?;
        if let Err(source) = manager.register(region) {
            if let Err(err) = manager.unregister(fullscreen) {
                tracing::warn!(?err, "failed to roll back fullscreen hotkey");
            }
            return Err(HotkeyError::Register {
                binding: settings.hotkey_region.clone(),
                source,
            });
        }

        tracing::info!(
            fullscreen = %settings.hotkey_fullscreen,
            region = %settings.hotkey_region,
            "registered global hotkeys"
        );
        Ok(Self {
            manager,
            fullscreen,
            region,
        })
    }

    pub fn action_for(&self, hotkey_id: u32) -> Option<HotkeyAction> {
        if hotkey_id == self.fullscreen.id() {
            Some(HotkeyAction::CaptureFullscreen)
        } else if hotkey_id == self.region.id() {
            Some(HotkeyAction::CaptureRegion)
        } else {
            None
        }
    }

    /// Drain pending presses; called from the main-loop tick.
    pub fn drain_pressed(&self) -> Vec<HotkeyAction> {
        let mut actions = Vec::new();
        while let Ok(event) = GlobalHotKeyEvent::receiver().try_recv() {
            if event.state() != HotKeyState::Pressed {
                continue;
            }
            if let Some(action) = self.action_for(event.id()) {
                actions.push(action);
            }
        }
        actions
    }

    /// Deregister both bindings; called at shutdown.
    pub fn unregister_all(&self) {
        for (hotkey, label) in [(self.fullscreen, "fullscreen"), (self.region, "region")] {
            if let Err(err) = self.manager.unregister(hotkey) {
                tracing::warn!(?err, binding = label, "failed to unregister hotkey");
            }
        }
    }
}
