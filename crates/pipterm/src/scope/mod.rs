//! Oscilloscope rendering for the radio tab's waveform.

pub mod oscilloscope;

use ratatui::{
    style::{Color, Style},
    symbols::Marker,
    widgets::{Dataset, GraphType},
};

#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Vertical half-range; the visualizer produces samples in ±1.
    pub scale: f64,
    /// Draw a zero line under the trace.
    pub references: bool,
    pub marker_type: Marker,
    pub trace_color: Color,
    pub axis_color: Color,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            references: true,
            marker_type: Marker::Braille,
            trace_color: Color::Green,
            axis_color: Color::DarkGray,
        }
    }
}

pub enum Dimension {
    X,
    Y,
}

pub struct DataSet {
    pub data: Vec<(f64, f64)>,
    pub marker_type: Marker,
    pub graph_type: GraphType,
    pub color: Color,
}

impl<'a> From<&'a DataSet> for Dataset<'a> {
    fn from(ds: &'a DataSet) -> Dataset<'a> {
        Dataset::default()
            .marker(ds.marker_type)
            .graph_type(ds.graph_type)
            .style(Style::default().fg(ds.color))
            .data(&ds.data)
    }
}
