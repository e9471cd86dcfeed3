//! Which station is highlighted, which one is bound to the audio engine, and
//! whether it is on.
//!
//! Only the UI path mutates this.  It lives in a `watch` channel so the
//! scheduler and visualizer loops always read a consistent copy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    /// UI cursor.
    pub selected_index: usize,
    /// Station bound to the music channel, if any.
    pub active_index: Option<usize>,
    pub playing: bool,
}

/// Sound to play in response to a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Radio switched off.
    Off,
    /// Tuning static while switching on or changing station.
    Tuning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl SelectionState {
    /// Selecting the active station toggles it; selecting any other station
    /// switches to it and turns the radio on.
    pub fn select(&mut self, index: usize) -> Cue {
        self.selected_index = index;
        if self.active_index == Some(index) {
            self.playing = !self.playing;
        } else {
            self.active_index = Some(index);
            self.playing = true;
        }
        if self.playing {
            Cue::Tuning
        } else {
            Cue::Off
        }
    }

    /// Move the cursor one row, clamped to `0..station_count`.  Never affects
    /// playback.
    pub fn move_selection(&mut self, direction: Direction, station_count: usize) {
        if station_count == 0 {
            self.selected_index = 0;
            return;
        }
        let last = station_count - 1;
        self.selected_index = match direction {
            Direction::Up => self.selected_index.saturating_sub(1),
            Direction::Down => (self.selected_index + 1).min(last),
        }
        .min(last);
    }

    /// Active station index, but only while the radio is on.
    pub fn playing_index(&self) -> Option<usize> {
        self.active_index.filter(|_| self.playing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_toggle_and_switch() {
        let mut s = SelectionState::default();

        assert_eq!(s.select(0), Cue::Tuning);
        assert!(s.playing);
        assert_eq!(s.active_index, Some(0));

        assert_eq!(s.select(0), Cue::Off);
        assert!(!s.playing);
        assert_eq!(s.active_index, Some(0));

        assert_eq!(s.select(1), Cue::Tuning);
        assert!(s.playing);
        assert_eq!(s.active_index, Some(1));
        assert_eq!(s.selected_index, 1);
    }

    #[test]
    fn test_select_turns_active_station_back_on() {
        let mut s = SelectionState::default();
        s.select(2);
        s.select(2);
        assert_eq!(s.select(2), Cue::Tuning);
        assert!(s.playing);
        assert_eq!(s.playing_index(), Some(2));
    }

    #[test]
    fn test_move_selection_is_clamped_and_leaves_playback_alone() {
        let mut s = SelectionState::default();
        s.select(1);
        let before = (s.active_index, s.playing);

        s.move_selection(Direction::Up, 3);
        s.move_selection(Direction::Up, 3);
        assert_eq!(s.selected_index, 0);

        for _ in 0..5 {
            s.move_selection(Direction::Down, 3);
        }
        assert_eq!(s.selected_index, 2);
        assert_eq!((s.active_index, s.playing), before);
    }

    #[test]
    fn test_move_selection_with_no_stations() {
        let mut s = SelectionState {
            selected_index: 4,
            ..Default::default()
        };
        s.move_selection(Direction::Down, 0);
        assert_eq!(s.selected_index, 0);
    }
}
