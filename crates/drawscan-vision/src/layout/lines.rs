// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Straight line segments — Canny edges, Hough voting for candidate lines,
// then a walk along each candidate that splits it into finite segments
// bounded by `max_line_gap` and filtered by `min_line_length`. The two
// edges Canny finds on either side of one stroke are folded back into a
// single segment before classification.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use serde::Serialize;
use tracing::debug;

use drawscan_core::config::LayoutConfig;

/// A finite line segment in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineSegment {
    pub start: (f32, f32),
    pub end: (f32, f32),
}

impl LineSegment {
    pub fn length(&self) -> f32 {
        let dx = self.end.0 - self.start.0;
        let dy = self.end.1 - self.start.1;
        (dx * dx + dy * dy).sqrt()
    }

    /// Absolute direction angle in degrees, in [0, 180].
    pub fn angle_degrees(&self) -> f32 {
        let dx = self.end.0 - self.start.0;
        let dy = self.end.1 - self.start.1;
        dy.atan2(dx).to_degrees().abs()
    }

    pub fn midpoint(&self) -> (f32, f32) {
        (
            (self.start.0 + self.end.0) / 2.0,
            (self.start.1 + self.end.1) / 2.0,
        )
    }

    pub fn class(&self) -> LineClass {
        LineClass::from_angle(self.angle_degrees())
    }

    /// Fold `other` into this segment when both lie on the same line.
    ///
    /// `other` must run parallel to `self` within a few degrees, both of
    /// its endpoints must sit within `max_offset` pixels across the line,
    /// and along the line it must overlap or come within `max_gap`. The
    /// result spans both segments and sits halfway between them.
    pub fn join(
        &self,
        other: &LineSegment,
        max_offset: f32,
        max_gap: f32,
    ) -> Option<LineSegment> {
        let length = self.length();
        let other_length = other.length();
        if length == 0.0 || other_length == 0.0 {
            return None;
        }
        let (ux, uy) = (
            (self.end.0 - self.start.0) / length,
            (self.end.1 - self.start.1) / length,
        );
        let (vx, vy) = (
            (other.end.0 - other.start.0) / other_length,
            (other.end.1 - other.start.1) / other_length,
        );
        if (ux * vx + uy * vy).abs() < PARALLEL_COS {
            return None;
        }

        // (along, across) coordinates relative to self.start.
        let project = |(x, y): (f32, f32)| {
            let (dx, dy) = (x - self.start.0, y - self.start.1);
            (dx * ux + dy * uy, dy * ux - dx * uy)
        };
        let (t0, n0) = project(other.start);
        let (t1, n1) = project(other.end);
        if n0.abs() > max_offset || n1.abs() > max_offset {
            return None;
        }
        let (lo, hi) = (t0.min(t1), t0.max(t1));
        if lo > length + max_gap || hi < -max_gap {
            return None;
        }

        // Self contributes offset 0 at both ends.
        let offset = (n0 + n1) / 4.0;
        let point = |t: f32| {
            (
                self.start.0 + t * ux - offset * uy,
                self.start.1 + t * uy + offset * ux,
            )
        };
        Some(LineSegment {
            start: point(lo.min(0.0)),
            end: point(hi.max(length)),
        })
    }
}

/// cos 3°: segments whose directions differ by more are never joined.
const PARALLEL_COS: f32 = 0.998_6;

/// Merge segments that trace the same stroke.
///
/// Longest segments are kept first and absorb shorter ones that
/// [`LineSegment::join`] accepts.
pub fn merge_collinear(
    mut segments: Vec<LineSegment>,
    max_offset: f32,
    max_gap: f32,
) -> Vec<LineSegment> {
    segments.sort_by(|a, b| b.length().total_cmp(&a.length()));

    let mut merged: Vec<LineSegment> = Vec::with_capacity(segments.len());
    'next: for segment in segments {
        for kept in merged.iter_mut() {
            if let Some(joined) = kept.join(&segment, max_offset, max_gap) {
                *kept = joined;
                continue 'next;
            }
        }
        merged.push(segment);
    }
    merged
}

/// Orientation bucket of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineClass {
    Horizontal,
    Vertical,
    Diagonal,
}

impl LineClass {
    /// Horizontal below 10° or above 170°, vertical within [80°, 100°],
    /// anything else diagonal.
    pub fn from_angle(angle: f32) -> Self {
        if !(10.0..=170.0).contains(&angle) {
            LineClass::Horizontal
        } else if (80.0..=100.0).contains(&angle) {
            LineClass::Vertical
        } else {
            LineClass::Diagonal
        }
    }
}

/// Segments grouped by orientation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassifiedLines {
    pub horizontal: Vec<LineSegment>,
    pub vertical: Vec<LineSegment>,
    pub diagonal: Vec<LineSegment>,
}

impl ClassifiedLines {
    pub fn from_segments(segments: impl IntoIterator<Item = LineSegment>) -> Self {
        let mut lines = Self::default();
        for segment in segments {
            match segment.class() {
                LineClass::Horizontal => lines.horizontal.push(segment),
                LineClass::Vertical => lines.vertical.push(segment),
                LineClass::Diagonal => lines.diagonal.push(segment),
            }
        }
        lines
    }

    pub fn total(&self) -> usize {
        self.horizontal.len() + self.vertical.len() + self.diagonal.len()
    }
}

/// Detect line segments on a grayscale drawing.
pub fn detect_segments(gray: &GrayImage, config: &LayoutConfig) -> Vec<LineSegment> {
    let edges = canny(gray, config.canny_low, config.canny_high);
    let options = LineDetectionOptions {
        vote_threshold: config.hough_vote_threshold,
        suppression_radius: config.hough_suppression_radius,
    };
    let polar_lines = detect_lines(&edges, options);

    let traced: Vec<LineSegment> = polar_lines
        .iter()
        .flat_map(|line| {
            trace_segments(&edges, line, config.min_line_length, config.max_line_gap)
        })
        .collect();
    let traced_count = traced.len();
    let segments = merge_collinear(
        traced,
        config.line_merge_distance,
        config.max_line_gap as f32,
    );

    debug!(
        candidates = polar_lines.len(),
        traced = traced_count,
        segments = segments.len(),
        "Line segments traced"
    );
    segments
}

/// Walk a polar line across the edge map and cut it into segments.
///
/// The line satisfies `x·cos θ + y·sin θ = r`. Each step along the line
/// checks the edge map within one pixel either side of the line, which
/// absorbs the integer rounding of the Hough accumulator.
fn trace_segments(
    edges: &GrayImage,
    line: &PolarLine,
    min_length: u32,
    max_gap: u32,
) -> Vec<LineSegment> {
    let (width, height) = edges.dimensions();
    let (sin, cos) = (line.angle_in_degrees as f32).to_radians().sin_cos();
    let (x0, y0) = (line.r * cos, line.r * sin);
    let (dx, dy) = (-sin, cos);
    let reach = ((width as f32).hypot(height as f32)).ceil() as i32;

    let mut segments = Vec::new();
    let mut run: Option<((f32, f32), (f32, f32))> = None;
    let mut gap = 0u32;

    for t in -reach..=reach {
        let x = x0 + t as f32 * dx;
        let y = y0 + t as f32 * dy;

        if edge_near(edges, x, y, cos, sin) {
            run = Some(match run {
                Some((first, _)) => (first, (x, y)),
                None => ((x, y), (x, y)),
            });
            gap = 0;
        } else if run.is_some() {
            gap += 1;
            if gap > max_gap {
                push_run(&mut segments, run.take(), min_length);
                gap = 0;
            }
        }
    }
    push_run(&mut segments, run, min_length);
    segments
}

fn push_run(
    segments: &mut Vec<LineSegment>,
    run: Option<((f32, f32), (f32, f32))>,
    min_length: u32,
) {
    if let Some((start, end)) = run {
        let segment = LineSegment { start, end };
        if segment.length() >= min_length as f32 {
            segments.push(segment);
        }
    }
}

fn edge_near(edges: &GrayImage, x: f32, y: f32, nx: f32, ny: f32) -> bool {
    (-1..=1).any(|k| {
        let px = (x + k as f32 * nx).round();
        let py = (y + k as f32 * ny).round();
        px >= 0.0
            && py >= 0.0
            && (px as u32) < edges.width()
            && (py as u32) < edges.height()
            && edges.get_pixel(px as u32, py as u32).0[0] > 0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn segment(start: (f32, f32), end: (f32, f32)) -> LineSegment {
        LineSegment { start, end }
    }

    #[test]
    fn angle_buckets() {
        assert_eq!(LineClass::from_angle(0.0), LineClass::Horizontal);
        assert_eq!(LineClass::from_angle(9.9), LineClass::Horizontal);
        assert_eq!(LineClass::from_angle(175.0), LineClass::Horizontal);
        assert_eq!(LineClass::from_angle(80.0), LineClass::Vertical);
        assert_eq!(LineClass::from_angle(100.0), LineClass::Vertical);
        assert_eq!(LineClass::from_angle(45.0), LineClass::Diagonal);
        assert_eq!(LineClass::from_angle(135.0), LineClass::Diagonal);
    }

    #[test]
    fn segment_direction_is_sign_independent() {
        assert_eq!(segment((300.0, 5.0), (10.0, 5.0)).class(), LineClass::Horizontal);
        assert_eq!(segment((5.0, 300.0), (5.0, 10.0)).class(), LineClass::Vertical);
        assert_eq!(segment((0.0, 0.0), (100.0, 100.0)).class(), LineClass::Diagonal);
    }

    #[test]
    fn classification_keeps_segments() {
        let lines = ClassifiedLines::from_segments([
            segment((0.0, 0.0), (200.0, 0.0)),
            segment((0.0, 0.0), (0.0, 200.0)),
            segment((0.0, 0.0), (150.0, 150.0)),
            segment((0.0, 50.0), (120.0, 52.0)),
        ]);
        assert_eq!(lines.horizontal.len(), 2);
        assert_eq!(lines.vertical.len(), 1);
        assert_eq!(lines.diagonal.len(), 1);
        assert_eq!(lines.total(), 4);
        assert!((lines.vertical[0].length() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn both_edges_of_a_stroke_merge() {
        let merged = merge_collinear(
            vec![
                segment((99.0, 50.0), (99.0, 350.0)),
                segment((102.0, 52.0), (102.0, 348.0)),
            ],
            6.0,
            10.0,
        );
        assert_eq!(merged.len(), 1);
        let (x, _) = merged[0].midpoint();
        assert!((x - 100.5).abs() < 0.6, "merged x = {x}");
        assert!(merged[0].length() >= 300.0 - 1e-3);
    }

    #[test]
    fn distant_or_crossing_segments_stay_apart() {
        let merged = merge_collinear(
            vec![
                segment((99.0, 50.0), (99.0, 350.0)),
                segment((150.0, 50.0), (150.0, 350.0)),
                segment((20.0, 200.0), (380.0, 200.0)),
            ],
            6.0,
            10.0,
        );
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn collinear_pieces_merge_only_across_small_gaps() {
        let left = segment((0.0, 10.0), (100.0, 10.0));
        let near = segment((105.0, 10.0), (200.0, 10.0));
        let far = segment((130.0, 10.0), (200.0, 10.0));

        let joined = left.join(&near, 6.0, 10.0).expect("gap of 5 joins");
        assert!((joined.length() - 200.0).abs() < 1e-3);
        assert!(left.join(&far, 6.0, 10.0).is_none());
        assert_eq!(merge_collinear(vec![left, far], 6.0, 10.0).len(), 2);
    }

    #[test]
    fn trace_splits_on_gaps() {
        // Two runs on row 20 separated by a 30-pixel hole.
        let mut edges = GrayImage::new(300, 40);
        for x in (10..110).chain(140..260) {
            edges.put_pixel(x, 20, Luma([255]));
        }
        let line = PolarLine {
            r: 20.0,
            angle_in_degrees: 90,
        };

        let split = trace_segments(&edges, &line, 50, 10);
        assert_eq!(split.len(), 2);
        assert!(split.iter().all(|s| s.class() == LineClass::Horizontal));

        let bridged = trace_segments(&edges, &line, 50, 40);
        assert_eq!(bridged.len(), 1);
        assert!(bridged[0].length() > 240.0);
    }

    #[test]
    fn short_runs_are_dropped() {
        let mut edges = GrayImage::new(100, 100);
        for y in 10..40 {
            edges.put_pixel(50, y, Luma([255]));
        }
        let line = PolarLine {
            r: 50.0,
            angle_in_degrees: 0,
        };
        assert!(trace_segments(&edges, &line, 100, 10).is_empty());
        assert_eq!(trace_segments(&edges, &line, 20, 10).len(), 1);
    }
}
