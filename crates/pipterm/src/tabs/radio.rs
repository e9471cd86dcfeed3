//! RADIO tab: station list on the left, oscilloscope and now-playing line on
//! the right.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Chart, Dataset, List, ListItem, ListState, Paragraph},
    Frame,
};

use pipterm_core::scheduler::{NowPlaying, SchedulerPhase};
use pipterm_core::RadioSnapshot;

use crate::action::{Action, TabId};
use crate::component::{RenderContext, TabView};
use crate::scope::{oscilloscope::Oscilloscope, DataSet, Dimension, GraphConfig};
use crate::theme;

const ACTIVE_DOT: &str = "●";

pub struct RadioTab {
    list_state: ListState,
    graph_cfg: GraphConfig,
}

impl RadioTab {
    pub fn new() -> Self {
        Self {
            list_state: ListState::default(),
            graph_cfg: GraphConfig {
                trace_color: theme::C_PRIMARY,
                axis_color: theme::C_AXIS,
                ..GraphConfig::default()
            },
        }
    }

    fn draw_stations(&mut self, frame: &mut Frame, area: Rect, radio: &RadioSnapshot) {
        let block = Block::bordered()
            .border_style(theme::style_border())
            .title(Line::styled(" STATIONS ", theme::style_default()));

        if radio.stations.is_empty() {
            let msg = if radio.loading {
                "Scanning for stations…"
            } else {
                "No stations found"
            };
            frame.render_widget(
                Paragraph::new(Line::styled(msg, theme::style_muted())).block(block),
                area,
            );
            return;
        }

        let items: Vec<ListItem> = radio
            .stations
            .iter()
            .enumerate()
            .map(|(i, name)| ListItem::new(station_line(i, name, radio)))
            .collect();

        let selected = radio.selection.selected_index.min(radio.stations.len() - 1);
        self.list_state.select(Some(selected));
        let list = List::new(items)
            .block(block)
            .style(theme::style_secondary())
            .highlight_style(theme::style_selected());
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn draw_scope(&self, frame: &mut Frame, area: Rect, waveform: &[f32]) {
        let scope = Oscilloscope::new(waveform.len());
        let mut sets = scope.references(&self.graph_cfg);
        sets.push(scope.process(&self.graph_cfg, waveform));
        let datasets: Vec<Dataset> = sets.iter().map(|ds: &DataSet| ds.into()).collect();

        let chart = Chart::new(datasets)
            .block(Block::bordered().border_style(theme::style_border()))
            .x_axis(scope.axis(&self.graph_cfg, Dimension::X))
            .y_axis(scope.axis(&self.graph_cfg, Dimension::Y));
        frame.render_widget(chart, area);
    }
}

/// `  name` or `● name`; the dot dims while the cursor sits on its row.
fn station_line<'a>(index: usize, name: &'a str, radio: &RadioSnapshot) -> Line<'a> {
    let sel = &radio.selection;
    let on_air = sel.playing && sel.active_index == Some(index);
    let marker = if !on_air {
        Span::raw("  ")
    } else if sel.selected_index == index {
        Span::styled(format!("{} ", ACTIVE_DOT), theme::style_secondary())
    } else {
        Span::styled(format!("{} ", ACTIVE_DOT), theme::style_default())
    };
    Line::from(vec![marker, Span::raw(name)])
}

/// `m:ss`
pub fn fmt_clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn now_playing_text(np: &NowPlaying) -> String {
    match np.phase {
        SchedulerPhase::Idle => "Radio off".to_string(),
        SchedulerPhase::Resolving => "Tuning…".to_string(),
        SchedulerPhase::Playing | SchedulerPhase::Advancing => {
            let title = np
                .track
                .as_deref()
                .and_then(|p| p.file_stem())
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!(
                "{}  {} / {}",
                title,
                fmt_clock(np.offset_ms),
                fmt_clock(np.duration_ms)
            )
        }
    }
}

impl TabView for RadioTab {
    fn id(&self) -> TabId {
        TabId::Radio
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => vec![Action::SelectUp],
            KeyCode::Down | KeyCode::Char('j') => vec![Action::SelectDown],
            KeyCode::Enter | KeyCode::Char(' ') => vec![Action::Select],
            _ => Vec::new(),
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, ctx: &RenderContext) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);
        self.draw_stations(frame, cols[0], &ctx.radio);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(cols[1]);
        self.draw_scope(frame, right[0], &ctx.waveform);

        let mut spans = Vec::new();
        if let Some(station) = &ctx.radio.now_playing.station {
            spans.push(Span::styled(format!("{}  ", station), theme::style_default()));
        }
        spans.push(Span::styled(
            now_playing_text(&ctx.radio.now_playing),
            theme::style_secondary(),
        ));
        frame.render_widget(Paragraph::new(Line::from(spans)), right[1]);
    }
}
