use ratatui::{
    layout::{Alignment, Rect},
    text::Line,
    widgets::{Block, Paragraph},
    Frame,
};

use crate::action::TabId;
use crate::component::{RenderContext, TabView};
use crate::theme;

/// Labelled empty panel for screens without content.
pub struct PlaceholderTab {
    id: TabId,
}

impl PlaceholderTab {
    pub fn new(id: TabId) -> Self {
        Self { id }
    }
}

impl TabView for PlaceholderTab {
    fn id(&self) -> TabId {
        self.id
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _ctx: &RenderContext) {
        let block = Block::bordered()
            .border_style(theme::style_border())
            .title(Line::styled(format!(" {} ", self.id.label()), theme::style_default()));
        let body = Paragraph::new(Line::styled("NO DATA", theme::style_muted()))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(body, area);
    }
}
