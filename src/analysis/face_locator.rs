//! Heuristic face location
//!
//! Classifies pixels as skin-tone by RGB channel relationships, buckets them
//! into an N×N grid and accepts a candidate only when the skin-tone pixels
//! are both plentiful and concentrated in the central cells the way a face
//! in front of the camera is. This is not a trained detector; anything that
//! implements [`FaceLocator`] can replace it.

use crate::capture::FrameSample;
use serde::{Deserialize, Serialize};

/// A point in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned box in frame space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> f64 {
        self.bottom_right.y - self.top_left.y
    }
}

/// The single best face-like region found in a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceCandidate {
    pub bounding_box: BoundingBox,
    pub centroid: Point,
    /// In [0, 1]
    pub confidence: f64,
}

/// Capability interface for face location.
pub trait FaceLocator: Send + Sync {
    /// Zero or one candidate. `None` is a normal outcome, not an error.
    fn locate(&self, frame: &FrameSample) -> Option<FaceCandidate>;
}

/// Tuning for [`SkinToneLocator`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkinToneConfig {
    /// Cells per axis
    pub grid_size: u32,
    /// Skin pixels / total pixels must exceed this
    pub min_skin_ratio: f64,
    /// Centre density / global density must exceed this
    pub min_center_concentration: f64,
    /// Candidate box side as a fraction of the shorter frame side
    pub box_fraction: f64,
}

impl Default for SkinToneConfig {
    fn default() -> Self {
        Self {
            grid_size: 16,
            min_skin_ratio: 0.05,
            min_center_concentration: 1.5,
            box_fraction: 0.35,
        }
    }
}

/// RGB skin-tone test: red dominant over green and blue by a margin, green
/// and blue not too dark, red not saturated.
pub fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as i16, g as i16, b as i16);
    (96..=250).contains(&r) && g > 40 && b > 20 && r - g > 15 && r - b > 15
}

/// Per-frame skin-tone statistics
#[derive(Debug, Clone, PartialEq)]
pub struct SkinToneAnalysis {
    pub skin_pixels: u64,
    pub total_pixels: u64,
    /// Skin-tone pixel count per grid cell, row-major
    pub cell_counts: Vec<u32>,
    pub skin_ratio: f64,
    pub center_concentration: f64,
    /// Mean pixel-centre coordinate of skin pixels
    pub centroid: Option<Point>,
}

/// Cells `[n/4, 3n/4)` on each axis form the central region
fn central_range(grid: u32) -> std::ops::Range<u32> {
    (grid / 4)..(grid * 3 / 4)
}

/// Compute skin-tone statistics over an `grid`×`grid` partition of `frame`
pub fn analyze(frame: &FrameSample, grid: u32) -> SkinToneAnalysis {
    let grid = grid.max(1);
    let (width, height) = (frame.width, frame.height);
    let cell_of = |v: u32, extent: u32| (v as u64 * grid as u64 / extent as u64) as u32;

    let mut cell_counts = vec![0u32; (grid * grid) as usize];
    let mut col_pixels = vec![0u64; grid as usize];
    let mut row_pixels = vec![0u64; grid as usize];
    for x in 0..width {
        col_pixels[cell_of(x, width) as usize] += 1;
    }
    for y in 0..height {
        row_pixels[cell_of(y, height) as usize] += 1;
    }

    let mut skin_pixels = 0u64;
    let (mut sum_x, mut sum_y) = (0u64, 0u64);
    for (i, px) in frame.pixels.chunks_exact(4).take(frame.pixel_count()).enumerate() {
        if !is_skin_tone(px[0], px[1], px[2]) {
            continue;
        }
        let x = (i % width as usize) as u32;
        let y = (i / width as usize) as u32;
        skin_pixels += 1;
        sum_x += x as u64;
        sum_y += y as u64;
        let cell = cell_of(y, height) * grid + cell_of(x, width);
        cell_counts[cell as usize] += 1;
    }

    let total_pixels = frame.pixel_count() as u64;
    let skin_ratio = skin_pixels as f64 / total_pixels as f64;

    let center = central_range(grid);
    let center_pixels: u64 = center.clone().map(|c| col_pixels[c as usize]).sum::<u64>()
        * center.clone().map(|r| row_pixels[r as usize]).sum::<u64>();
    let center_skin: u64 = center
        .clone()
        .flat_map(|row| center.clone().map(move |col| (row * grid + col) as usize))
        .map(|cell| cell_counts[cell] as u64)
        .sum();

    let center_concentration = if skin_pixels == 0 || center_pixels == 0 {
        0.0
    } else {
        (center_skin as f64 / center_pixels as f64) / skin_ratio
    };

    let centroid = (skin_pixels > 0).then(|| Point {
        x: sum_x as f64 / skin_pixels as f64 + 0.5,
        y: sum_y as f64 / skin_pixels as f64 + 0.5,
    });

    SkinToneAnalysis {
        skin_pixels,
        total_pixels,
        cell_counts,
        skin_ratio,
        center_concentration,
        centroid,
    }
}

/// Skin-tone grid heuristic
#[derive(Debug, Clone, Default)]
pub struct SkinToneLocator {
    config: SkinToneConfig,
}

impl SkinToneLocator {
    pub fn new(config: SkinToneConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SkinToneConfig {
        &self.config
    }

    fn bounding_box(&self, frame: &FrameSample, centroid: Point) -> BoundingBox {
        let half = frame.shorter_side() as f64 * self.config.box_fraction / 2.0;
        let (w, h) = (frame.width as f64, frame.height as f64);
        BoundingBox {
            top_left: Point {
                x: (centroid.x - half).max(0.0),
                y: (centroid.y - half).max(0.0),
            },
            bottom_right: Point {
                x: (centroid.x + half).min(w),
                y: (centroid.y + half).min(h),
            },
        }
    }
}

impl FaceLocator for SkinToneLocator {
    fn locate(&self, frame: &FrameSample) -> Option<FaceCandidate> {
        let analysis = analyze(frame, self.config.grid_size);

        if analysis.skin_ratio <= self.config.min_skin_ratio
            || analysis.center_concentration <= self.config.min_center_concentration
        {
            tracing::trace!(
                "No face: skin ratio {:.3}, concentration {:.2}",
                analysis.skin_ratio,
                analysis.center_concentration
            );
            return None;
        }

        let centroid = analysis.centroid?;
        Some(FaceCandidate {
            bounding_box: self.bounding_box(frame, centroid),
            centroid,
            confidence: analysis.skin_ratio.clamp(0.0, 1.0),
        })
    }
}
