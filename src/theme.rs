use ratatui::style::{Color, Modifier, Style};

/// Colors of the terminal front end
#[derive(Clone, Debug)]
pub struct Theme {
    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the current file name in the status bar
    pub filename_color: Color,

    /// Foreground color for selected content
    pub selection_fg: Color,

    /// Background color for selected content
    pub selection_bg: Color,

    /// Foreground color for text with a background color
    pub highlight_fg: Color,

    /// Background color for text with a background color
    pub highlight_bg: Color,

    pub link_color: Color,

    pub code_color: Color,

    /// Gutter marks of quotes, lists and tables
    pub decoration_color: Color,

    /// Status bar badge shown while a format is pending at the caret
    pub pending_fg: Color,
    pub pending_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            selection_fg: Color::White,
            selection_bg: Color::LightBlue,
            highlight_fg: Color::Black,
            highlight_bg: Color::LightYellow,
            link_color: Color::Blue,
            code_color: Color::LightGreen,
            decoration_color: Color::DarkGray,
            pending_fg: Color::Black,
            pending_bg: Color::LightMagenta,
        }
    }
}

impl Theme {
    pub fn status_bar_style(&self) -> Style {
        Style::default().fg(self.status_bar_fg).bg(self.status_bar_bg)
    }

    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().fg(self.highlight_fg).bg(self.highlight_bg)
    }

    pub fn link_style(&self) -> Style {
        Style::default().fg(self.link_color).add_modifier(Modifier::UNDERLINED)
    }

    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code_color)
    }

    pub fn decoration_style(&self) -> Style {
        Style::default().fg(self.decoration_color)
    }

    pub fn pending_style(&self) -> Style {
        Style::default().fg(self.pending_fg).bg(self.pending_bg)
    }
}
