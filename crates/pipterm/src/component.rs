//! TabView trait: the interface every Pip-Boy screen implements.
//!
//! - Tabs render themselves from a read-only `RenderContext`.
//! - Tabs produce `Vec<Action>`; they never touch the radio directly.
//! - The App owns a `HashMap<TabId, Box<dyn TabView>>` and dispatches to the
//!   active one.

use pipterm_core::RadioSnapshot;
use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, TabId};

/// Per-frame data copied out of the radio before drawing.
pub struct RenderContext {
    pub radio: RadioSnapshot,
    pub waveform: Vec<f32>,
}

pub trait TabView {
    fn id(&self) -> TabId;

    /// Handle a key the App did not consume globally.
    fn handle_key(&mut self, _key: KeyEvent) -> Vec<Action> {
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, ctx: &RenderContext);
}
