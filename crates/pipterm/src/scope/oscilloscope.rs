// Waveform trace over a fixed sample window, rendered with ratatui's Chart.

use ratatui::{
    style::Style,
    widgets::{Axis, GraphType},
};

use super::{DataSet, Dimension, GraphConfig};

pub struct Oscilloscope {
    /// Width of the x axis in samples.
    pub window: usize,
}

impl Oscilloscope {
    pub fn new(window: usize) -> Self {
        Self { window: window.max(2) }
    }

    pub fn axis(&self, cfg: &GraphConfig, dimension: Dimension) -> Axis<'static> {
        let bounds = match dimension {
            Dimension::X => [0.0, (self.window - 1) as f64],
            Dimension::Y => [-cfg.scale, cfg.scale],
        };
        Axis::default()
            .style(Style::default().fg(cfg.axis_color))
            .bounds(bounds)
    }

    pub fn references(&self, cfg: &GraphConfig) -> Vec<DataSet> {
        if !cfg.references {
            return Vec::new();
        }
        vec![DataSet {
            data: vec![(0.0, 0.0), ((self.window - 1) as f64, 0.0)],
            marker_type: cfg.marker_type,
            graph_type: GraphType::Line,
            color: cfg.axis_color,
        }]
    }

    /// Right-align `samples` in the window so the newest sample sits at the
    /// right edge; missing history reads as silence.
    pub fn process(&self, cfg: &GraphConfig, samples: &[f32]) -> DataSet {
        let take = samples.len().min(self.window);
        let offset = self.window - take;
        let mut pts: Vec<(f64, f64)> = (0..offset).map(|i| (i as f64, 0.0)).collect();
        pts.extend(
            samples[samples.len() - take..]
                .iter()
                .enumerate()
                .map(|(i, &s)| ((offset + i) as f64, (s as f64).clamp(-cfg.scale, cfg.scale))),
        );
        DataSet {
            data: pts,
            marker_type: cfg.marker_type,
            graph_type: GraphType::Line,
            color: cfg.trace_color,
        }
    }
}
