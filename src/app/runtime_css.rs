use gtk4::CssProvider;

use crate::ui::StyleTokens;

pub(super) fn install_runtime_css(tokens: StyleTokens) {
    let css = format!(
        "
.shell-root {{
  background: @window_bg_color;
}}
.shell-panel {{
  border-radius: {panel_radius}px;
  border: {border_width}px solid alpha(currentColor, 0.15);
  padding: {spacing_8}px;
}}
.shell-section-title {{
  font-weight: 600;
  opacity: 0.85;
}}
.shell-primary-button {{
  border-radius: {control_radius}px;
  font-weight: 600;
}}
.shell-kv-key {{
  opacity: 0.7;
}}
.preview-surface {{
  border-radius: {control_radius}px;
  border: {border_width}px solid alpha(currentColor, 0.2);
}}
.status-bar {{
  font-size: 0.9em;
  opacity: 0.8;
  padding: {spacing_4}px {spacing_8}px;
}}
window.selection-overlay {{
  background: rgba(0, 0, 0, 0.3);
}}
",
        panel_radius = tokens.panel_radius,
        control_radius = tokens.control_radius,
        border_width = tokens.border_width,
        spacing_4 = tokens.spacing_4,
        spacing_8 = tokens.spacing_8,
    );

    let provider = CssProvider::new();
    provider.load_from_data(&css);

    let Some(display) = gtk4::gdk::Display::default() else {
        tracing::warn!("no display available; skipping runtime css install");
        return;
    };
    gtk4::style_context_add_provider_for_display(
        &display,
        &provider,
        gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );
}
