/// Compile-time layout tokens; not user-overridable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleTokens {
    pub spacing_4: i32,
    pub spacing_8: i32,
    pub spacing_12: i32,
    pub spacing_16: i32,
    pub panel_radius: u16,
    pub control_radius: u16,
    pub border_width: u16,
    pub preview_box_width: i32,
    pub preview_box_height: i32,
    pub shell_default_width: i32,
    pub shell_default_height: i32,
    pub shell_min_width: i32,
    pub shell_min_height: i32,
}

pub const LAYOUT_TOKENS: StyleTokens = StyleTokens {
    spacing_4: 4,
    spacing_8: 8,
    spacing_12: 12,
    spacing_16: 16,
    panel_radius: 12,
    control_radius: 8,
    border_width: 1,
    preview_box_width: 360,
    preview_box_height: 220,
    shell_default_width: 640,
    shell_default_height: 520,
    shell_min_width: 420,
    shell_min_height: 360,
};

#[cfg(test)]
mod tests {
    use super::LAYOUT_TOKENS;

    #[test]
    fn preview_box_fits_inside_the_minimum_shell() {
        assert!(LAYOUT_TOKENS.preview_box_width < LAYOUT_TOKENS.shell_min_width);
        assert!(LAYOUT_TOKENS.preview_box_height < LAYOUT_TOKENS.shell_min_height);
    }

    #[test]
    fn default_shell_size_covers_the_minimum() {
        assert!(LAYOUT_TOKENS.shell_default_width >= LAYOUT_TOKENS.shell_min_width);
        assert!(LAYOUT_TOKENS.shell_default_height >= LAYOUT_TOKENS.shell_min_height);
    }
}
