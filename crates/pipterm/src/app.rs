//! App: the terminal event loop.
//!
//! - A blocking task polls crossterm events into an mpsc channel and exits
//!   once the loop is done with it.
//! - The loop redraws on every input and on a frame tick, so the
//!   oscilloscope keeps moving.
//! - Global keys (tab switching, quit) are handled here; the rest go to the
//!   active tab, whose actions the App dispatches against the `Radio`.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use pipterm_core::{Direction, Radio};

use crate::action::{Action, TabId};
use crate::component::{RenderContext, TabView};
use crate::sfx::CuePlayer;
use crate::tabs::build_tabs;
use crate::theme;

const FRAME_INTERVAL: Duration = Duration::from_millis(50);
/// Upper bound on how long the input task outlives the event loop.
const INPUT_POLL: Duration = Duration::from_millis(100);

pub struct App {
    radio: Radio,
    sfx: CuePlayer,
    tabs: HashMap<TabId, Box<dyn TabView>>,
    active: TabId,
    should_quit: bool,
}

/// Keys that work on every tab.
pub fn global_action(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Left => Some(Action::PrevTab),
        KeyCode::Right => Some(Action::NextTab),
        KeyCode::Char(c) => TabId::from_digit(c).map(Action::SwitchTab),
        _ => None,
    }
}

/// Forward events from `next` into `tx` until `stop` is set, the receiver
/// goes away or the source fails.  `next` waits at most the given time and
/// yields `None` when nothing arrived.
fn pump_events<F>(tx: mpsc::Sender<Event>, stop: &AtomicBool, mut next: F)
where
    F: FnMut(Duration) -> io::Result<Option<Event>>,
{
    while !stop.load(Ordering::Relaxed) {
        match next(INPUT_POLL) {
            Ok(Some(ev)) => {
                if tx.blocking_send(ev).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!("input: read error: {}", e);
                break;
            }
        }
    }
}

fn poll_terminal(timeout: Duration) -> io::Result<Option<Event>> {
    if event::poll(timeout)? {
        event::read().map(Some)
    } else {
        Ok(None)
    }
}

impl App {
    pub fn new(radio: Radio, sfx: CuePlayer) -> Self {
        Self {
            radio,
            sfx,
            tabs: build_tabs(),
            active: TabId::Stat,
            should_quit: false,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let result = self.event_loop(&mut terminal).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        self.radio.shutdown().await;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        // ── Background task: keyboard events ──────────────────────────────────
        let (tx, mut rx) = mpsc::channel::<Event>(256);
        let stop_input = Arc::new(AtomicBool::new(false));
        let input = {
            let stop = Arc::clone(&stop_input);
            tokio::task::spawn_blocking(move || pump_events(tx, &stop, poll_terminal))
        };

        let result = self.frame_loop(terminal, &mut rx).await;

        // The runtime waits for blocking tasks on exit; make sure this one ends.
        stop_input.store(true, Ordering::Relaxed);
        drop(rx);
        let _ = input.await;
        result
    }

    async fn frame_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        rx: &mut mpsc::Receiver<Event>,
    ) -> anyhow::Result<()> {
        let mut frame_tick = tokio::time::interval(FRAME_INTERVAL);
        frame_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let ctx = RenderContext {
                radio: self.radio.snapshot(),
                waveform: self.radio.waveform(),
            };
            terminal.draw(|f| self.draw(f, &ctx))?;

            if self.should_quit {
                break;
            }

            tokio::select! {
                ev = rx.recv() => match ev {
                    Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key).await;
                    }
                    Some(_) => {}
                    None => break,
                },
                _ = frame_tick.tick() => {}
            }
        }
        info!("app: quitting");
        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        let actions = match global_action(&key) {
            Some(action) => vec![action],
            None => match self.tabs.get_mut(&self.active) {
                Some(tab) => tab.handle_key(key),
                None => Vec::new(),
            },
        };
        for action in actions {
            self.dispatch(action).await;
        }
    }

    async fn dispatch(&mut self, action: Action) {
        debug!("dispatch: {:?}", action);
        match action {
            Action::SwitchTab(tab) => self.switch_tab(tab).await,
            Action::NextTab => self.switch_tab(self.active.next()).await,
            Action::PrevTab => self.switch_tab(self.active.prev()).await,
            Action::SelectUp => self.radio.move_selection(Direction::Up),
            Action::SelectDown => self.radio.move_selection(Direction::Down),
            Action::Select => {
                if let Some(cue) = self.radio.select() {
                    self.sfx.play(cue);
                }
            }
            Action::Quit => self.should_quit = true,
        }
    }

    async fn switch_tab(&mut self, tab: TabId) {
        if tab == self.active {
            return;
        }
        self.active = tab;
        self.radio.set_visible(tab == TabId::Radio).await;
    }

    fn draw(&mut self, frame: &mut Frame, ctx: &RenderContext) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(theme::C_BG)), area);

        let outer = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        self.draw_header(frame, outer[0]);
        if let Some(tab) = self.tabs.get_mut(&self.active) {
            tab.draw(frame, outer[1], ctx);
        }
        self.draw_footer(frame, outer[2]);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for id in TabId::ALL {
            let style = if id == self.active {
                theme::style_tab_active()
            } else {
                theme::style_secondary()
            };
            spans.push(Span::styled(format!(" {} ", id.label()), style));
            spans.push(Span::raw(" "));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let hint = match self.active {
            TabId::Radio => "←/→ tabs  ↑/↓ station  enter tune  q quit",
            _ => "←/→ or 1-5 tabs  q quit",
        };
        frame.render_widget(Paragraph::new(Line::styled(hint, theme::style_muted())), area);
    }
}
