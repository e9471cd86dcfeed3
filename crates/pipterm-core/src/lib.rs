//! Radio subsystem of the pipterm terminal: station and intermission
//! catalogs, playlist weaving, the wall-clock playback scheduler and the
//! oscilloscope visualizer.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod platform;
pub mod playlist;
pub mod radio;
pub mod scheduler;
pub mod selection;
pub mod task;
pub mod visualizer;

pub use radio::{Radio, RadioSnapshot};
pub use selection::{Cue, Direction, SelectionState};
