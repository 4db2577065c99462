use serde::Serialize;

use crate::models::{ResultGroup, ScaledPoint};

pub const GRID_STEPS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub x: f64,
    pub height: f64,
    pub year: i32,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridLine {
    pub value: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartGeometry {
    pub bars: Vec<Bar>,
    pub line: Vec<Vertex>,
    pub grid_y: Vec<GridLine>,
}

pub fn map(points: &[ScaledPoint], max_scale: f64) -> ChartGeometry {
    let count = points.len();
    let bars: Vec<Bar> = points
        .iter()
        .enumerate()
        .map(|(index, point)| Bar {
            x: center_x(index, count),
            height: percent_of(point.scaled_value, max_scale),
            year: point.year,
            label: format!("{:.2}", point.scaled_value),
        })
        .collect();

    let line = if count < 2 {
        Vec::new()
    } else {
        bars.iter()
            .map(|bar| Vertex {
                x: bar.x,
                y: 100.0 - bar.height,
            })
            .collect()
    };

    ChartGeometry {
        bars,
        line,
        grid_y: gridlines(max_scale),
    }
}

pub fn map_group(group: &ResultGroup) -> ChartGeometry {
    map(&group.points, group.max_scale)
}

/// Evenly spaced reference values from `max_scale` down to zero.
pub fn gridlines(max_scale: f64) -> Vec<GridLine> {
    (0..=GRID_STEPS)
        .map(|step| {
            let value = max_scale * (GRID_STEPS - step) as f64 / GRID_STEPS as f64;
            GridLine {
                value,
                y: 100.0 - percent_of(value, max_scale),
            }
        })
        .collect()
}

fn center_x(index: usize, count: usize) -> f64 {
    (index as f64 + 0.5) / count as f64 * 100.0
}

fn percent_of(value: f64, max_scale: f64) -> f64 {
    if max_scale.is_nan() || max_scale <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value / max_scale * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(year: i32, scaled_value: f64, max_scale: f64) -> ScaledPoint {
        ScaledPoint {
            year,
            raw_value: scaled_value,
            scaled_value,
            max_scale,
        }
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{a} != {e}");
        }
    }

    #[test]
    fn three_points_map_to_expected_heights_and_line() {
        let points = vec![point(2019, 0.0, 10.0), point(2021, 5.0, 10.0), point(2023, 10.0, 10.0)];
        let geometry = map(&points, 10.0);

        let heights: Vec<f64> = geometry.bars.iter().map(|b| b.height).collect();
        assert_close(&heights, &[0.0, 50.0, 100.0]);

        let ys: Vec<f64> = geometry.line.iter().map(|v| v.y).collect();
        assert_close(&ys, &[100.0, 50.0, 0.0]);

        let xs: Vec<f64> = geometry.bars.iter().map(|b| b.x).collect();
        assert_close(&xs, &[100.0 / 6.0, 50.0, 500.0 / 6.0]);
        assert_eq!(geometry.bars[1].label, "5.00");
        assert_eq!(geometry.bars[2].year, 2023);
    }

    #[test]
    fn single_point_is_centered_without_a_line() {
        let geometry = map(&[point(2023, 6.8, 10.0)], 10.0);
        assert_eq!(geometry.bars.len(), 1);
        assert_close(&[geometry.bars[0].x, geometry.bars[0].height], &[50.0, 68.0]);
        assert!(geometry.line.is_empty());
    }

    #[test]
    fn gridlines_cover_the_axis_top_to_bottom() {
        let grid = gridlines(10.0);
        let values: Vec<f64> = grid.iter().map(|g| g.value).collect();
        assert_close(&values, &[10.0, 8.0, 6.0, 4.0, 2.0, 0.0]);
        let ys: Vec<f64> = grid.iter().map(|g| g.y).collect();
        assert_close(&ys, &[0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);

        let values: Vec<f64> = gridlines(500.0).iter().map(|g| g.value).collect();
        assert_close(&values, &[500.0, 400.0, 300.0, 200.0, 100.0, 0.0]);
    }

    #[test]
    fn heights_are_clamped_and_degenerate_axes_are_flat() {
        let geometry = map(&[point(2020, 12.0, 10.0), point(2021, -1.0, 10.0)], 10.0);
        let heights: Vec<f64> = geometry.bars.iter().map(|b| b.height).collect();
        assert_close(&heights, &[100.0, 0.0]);

        let flat = map(&[point(2020, 4.0, 0.0)], 0.0);
        assert_eq!(flat.bars[0].height, 0.0);
    }

    #[test]
    fn empty_series_has_no_bars() {
        let geometry = map(&[], 10.0);
        assert!(geometry.bars.is_empty());
        assert!(geometry.line.is_empty());
    }
}
