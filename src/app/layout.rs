use std::path::{Path, PathBuf};

use gtk4::prelude::*;
use gtk4::{
    Align, Box as GtkBox, Button, CheckButton, DropDown, Entry, Frame, Label, Orientation,
    Picture, ScrolledWindow,
};

use crate::settings::{Settings, SettingsPatch};
use crate::ui::StyleTokens;

pub(super) const OUTPUT_FORMAT_CHOICES: [&str; 4] = ["png", "jpg", "bmp", "tiff"];

/// The shell window's widgets, shared by the controller closures.
#[derive(Clone)]
pub(super) struct ShellUi {
    pub(super) root: ScrolledWindow,
    pub(super) full_capture_button: Button,
    pub(super) region_capture_button: Button,
    pub(super) preview_picture: Picture,
    pub(super) preview_placeholder: Label,
    pub(super) directory_value: Label,
    pub(super) browse_button: Button,
    pub(super) prefix_entry: Entry,
    pub(super) format_dropdown: DropDown,
    pub(super) show_preview_toggle: CheckButton,
    pub(super) auto_open_toggle: CheckButton,
    pub(super) apply_button: Button,
    pub(super) reset_button: Button,
    pub(super) status_label: Label,
}

impl ShellUi {
    pub(super) fn set_status_text(&self, message: &str) {
        self.status_label.set_text(message);
    }

    pub(super) fn set_region_capture_enabled(&self, enabled: bool) {
        self.region_capture_button.set_sensitive(enabled);
    }

    /// Load a downscaled thumbnail of the saved file into the preview pane.
    /// The thumbnail is independent of the saved file's resolution.
    pub(super) fn show_preview_from_file(&self, path: &Path, tokens: StyleTokens) {
        match gtk4::gdk_pixbuf::Pixbuf::from_file_at_scale(
            path,
            tokens.preview_box_width,
            tokens.preview_box_height,
            true,
        ) {
            Ok(pixbuf) => {
                let texture = gtk4::gdk::Texture::for_pixbuf(&pixbuf);
                self.preview_picture.set_paintable(Some(&texture));
                self.preview_placeholder.set_visible(false);
                self.preview_picture.set_visible(true);
            }
            Err(err) => {
                tracing::warn!(?err, path = %path.display(), "failed to load preview thumbnail");
            }
        }
    }

    pub(super) fn set_preview_visible(&self, visible: bool) {
        let showable = visible && self.preview_picture.paintable().is_some();
        self.preview_picture.set_visible(showable);
        self.preview_placeholder.set_visible(!showable);
    }

    pub(super) fn set_directory_text(&self, path: &Path) {
        self.directory_value.set_text(&path.display().to_string());
    }

    pub(super) fn selected_format(&self) -> String {
        OUTPUT_FORMAT_CHOICES
            .get(self.format_dropdown.selected() as usize)
            .copied()
            .unwrap_or("png")
            .to_string()
    }

    /// Fill every settings field from the store's current state.
    pub(super) fn load_settings(&self, settings: &Settings) {
        self.set_directory_text(&settings.save_directory);
        self.prefix_entry.set_text(&settings.file_prefix);
        let format_index = OUTPUT_FORMAT_CHOICES
            .iter()
            .position(|choice| *choice == settings.file_format.to_lowercase())
            .unwrap_or(0);
        self.format_dropdown.set_selected(format_index as u32);
        self.show_preview_toggle.set_active(settings.show_preview);
        self.auto_open_toggle.set_active(settings.auto_open_folder);
    }

    /// One atomic patch carrying every field of the settings form.
    pub(super) fn settings_patch(&self) -> SettingsPatch {
        SettingsPatch {
            save_directory: Some(PathBuf::from(self.directory_value.text().as_str())),
            file_prefix: Some(self.prefix_entry.text().to_string()),
            file_format: Some(self.selected_format()),
            show_preview: Some(self.show_preview_toggle.is_active()),
            auto_open_folder: Some(self.auto_open_toggle.is_active()),
            ..SettingsPatch::default()
        }
    }
}

pub(super) fn build_shell_ui(tokens: StyleTokens, settings: &Settings) -> ShellUi {
    let content = GtkBox::new(Orientation::Vertical, tokens.spacing_12);
    content.set_margin_top(tokens.spacing_12);
    content.set_margin_bottom(tokens.spacing_12);
    content.set_margin_start(tokens.spacing_12);
    content.set_margin_end(tokens.spacing_12);
    content.add_css_class("shell-root");

    // ── Capture panel ──
    let full_capture_button = Button::with_label("Capture Full Screen");
    full_capture_button.add_css_class("shell-primary-button");
    full_capture_button.set_hexpand(true);
    let region_capture_button = Button::with_label("Capture Region");
    region_capture_button.set_hexpand(true);

    let capture_row = GtkBox::new(Orientation::Horizontal, tokens.spacing_8);
    capture_row.append(&full_capture_button);
    capture_row.append(&region_capture_button);
    content.append(&shell_panel(tokens, "Capture", &capture_row));

    // ── Preview panel ──
    let preview_picture = Picture::new();
    preview_picture.add_css_class("preview-surface");
    preview_picture.set_size_request(tokens.preview_box_width, tokens.preview_box_height);
    preview_picture.set_visible(false);

    let preview_placeholder = Label::new(Some("No capture yet"));
    preview_placeholder.set_size_request(-1, tokens.preview_box_height / 2);
    preview_placeholder.add_css_class("shell-kv-key");

    let preview_box = GtkBox::new(Orientation::Vertical, tokens.spacing_8);
    preview_box.set_halign(Align::Center);
    preview_box.append(&preview_picture);
    preview_box.append(&preview_placeholder);
    content.append(&shell_panel(tokens, "Preview", &preview_box));

    // ── Settings panel ──
    let directory_value = Label::new(None);
    directory_value.set_halign(Align::Start);
    directory_value.set_xalign(0.0);
    directory_value.set_hexpand(true);
    directory_value.set_ellipsize(gtk4::pango::EllipsizeMode::Middle);
    let browse_button = Button::with_label("Browse…");
    let directory_row = GtkBox::new(Orientation::Horizontal, tokens.spacing_8);
    directory_row.append(&directory_value);
    directory_row.append(&browse_button);

    let prefix_entry = Entry::new();
    prefix_entry.set_hexpand(true);

    let format_dropdown = DropDown::from_strings(&OUTPUT_FORMAT_CHOICES);

    let show_preview_toggle = CheckButton::with_label("Show preview");
    let auto_open_toggle = CheckButton::with_label("Open folder after saving");

    let apply_button = Button::with_label("Apply");
    apply_button.add_css_class("shell-primary-button");
    let reset_button = Button::with_label("Reset to Defaults");
    let settings_actions = GtkBox::new(Orientation::Horizontal, tokens.spacing_8);
    settings_actions.set_halign(Align::End);
    settings_actions.append(&reset_button);
    settings_actions.append(&apply_button);

    let settings_box = GtkBox::new(Orientation::Vertical, tokens.spacing_8);
    settings_box.append(&settings_row(tokens, "Save directory", &directory_row));
    settings_box.append(&settings_row(tokens, "Filename prefix", &prefix_entry));
    settings_box.append(&settings_row(tokens, "Image format", &format_dropdown));
    settings_box.append(&show_preview_toggle);
    settings_box.append(&auto_open_toggle);
    settings_box.append(&settings_actions);
    content.append(&shell_panel(tokens, "Settings", &settings_box));

    // ── Status bar ──
    let status_label = Label::new(Some("Ready"));
    status_label.add_css_class("status-bar");
    status_label.set_halign(Align::Start);
    status_label.set_xalign(0.0);
    status_label.set_ellipsize(gtk4::pango::EllipsizeMode::End);
    content.append(&status_label);

    let root = ScrolledWindow::new();
    root.set_policy(gtk4::PolicyType::Never, gtk4::PolicyType::Automatic);
    root.set_child(Some(&content));

    let ui = ShellUi {
        root,
        full_capture_button,
        region_capture_button,
        preview_picture,
        preview_placeholder,
        directory_value,
        browse_button,
        prefix_entry,
        format_dropdown,
        show_preview_toggle,
        auto_open_toggle,
        apply_button,
        reset_button,
        status_label,
    };
    ui.load_settings(settings);
    ui
}

fn section_title(text: &str) -> Label {
    let label = Label::new(Some(text));
    label.add_css_class("shell-section-title");
    label.set_halign(Align::Start);
    label.set_xalign(0.0);
    label
}

fn shell_panel(tokens: StyleTokens, title: &str, child: &GtkBox) -> Frame {
    let panel = Frame::new(None);
    panel.add_css_class("shell-panel");
    let panel_box = GtkBox::new(Orientation::Vertical, tokens.spacing_8);
    panel_box.append(&section_title(title));
    panel_box.append(child);
    panel.set_child(Some(&panel_box));
    panel
}

fn settings_row(tokens: StyleTokens, key: &str, value: &impl IsA<gtk4::Widget>) -> GtkBox {
    let key_label = Label::new(Some(key));
    key_label.add_css_class("shell-kv-key");
    key_label.set_halign(Align::Start);
    key_label.set_xalign(0.0);
    key_label.set_width_chars(16);

    let row = GtkBox::new(Orientation::Horizontal, tokens.spacing_8);
    row.append(&key_label);
    row.append(value);
    row
}
