//! Bar fill estimation from a captured pixel region.
//!
//! A capture is converted to HSV, thresholded against the bar's color band,
//! cleaned with a 3x3 opening followed by a closing, and then read according
//! to the bar's orientation: tall regions fill bottom-to-top, everything else
//! fills left-to-right.

use tracing::{debug, warn};

use crate::error::SensingError;
use crate::types::{Capture, Hsv, HsvRange, ResourceKind};

/// Percent reported when a region can't be read. Full, so an unreadable bar
/// never makes the controller burn a potion.
pub const FAIL_SAFE_PERCENT: f64 = 100.0;

/// Height/width ratio above which a bar is read vertically.
const VERTICAL_RATIO: f64 = 1.5;

/// Convert one BGR pixel to HSV on the OpenCV 8-bit scale.
pub fn bgr_to_hsv(b: u8, g: u8, r: u8) -> Hsv {
    let (bf, gf, rf) = (b as f32, g as f32, r as f32);
    let v = bf.max(gf).max(rf);
    let min = bf.min(gf).min(rf);
    let diff = v - min;

    let s = if v == 0.0 { 0.0 } else { 255.0 * diff / v };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        h: (h / 2.0).round().min(180.0) as u8,
        s: s.round() as u8,
        v: v as u8,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

impl Orientation {
    pub fn classify(width: u32, height: u32) -> Self {
        if height as f64 > width as f64 * VERTICAL_RATIO {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }
}

/// Binary image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, bits: vec![false; (width * height) as usize] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        let idx = (y * self.width + x) as usize;
        self.bits[idx] = on;
    }

    /// Set every pixel of rows `rows` (used heavily by tests).
    pub fn fill_rows(&mut self, rows: std::ops::Range<u32>) {
        for y in rows {
            for x in 0..self.width {
                self.set(x, y, true);
            }
        }
    }

    pub fn fill_cols(&mut self, cols: std::ops::Range<u32>) {
        for x in cols {
            for y in 0..self.height {
                self.set(x, y, true);
            }
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Threshold a capture against `range`.
    pub fn from_capture(capture: &Capture, range: &HsvRange) -> Result<Self, SensingError> {
        validate(capture)?;
        let mut mask = Mask::new(capture.width, capture.height);
        for y in 0..capture.height {
            let row = (y * capture.bytes_per_row) as usize;
            for x in 0..capture.width {
                let idx = row + (x * 4) as usize;
                let px = bgr_to_hsv(capture.data[idx], capture.data[idx + 1], capture.data[idx + 2]);
                if range.contains(px) {
                    mask.set(x, y, true);
                }
            }
        }
        Ok(mask)
    }

    /// 3x3 erosion; neighbors outside the image don't count against a pixel.
    pub fn erode(&self) -> Self {
        self.morph(true)
    }

    /// 3x3 dilation; neighbors outside the image are ignored.
    pub fn dilate(&self) -> Self {
        self.morph(false)
    }

    pub fn open(&self) -> Self {
        self.erode().dilate()
    }

    pub fn close(&self) -> Self {
        self.dilate().erode()
    }

    fn morph(&self, erode: bool) -> Self {
        let mut out = Mask::new(self.width, self.height);
        let (w, h) = (self.width as i64, self.height as i64);
        for y in 0..h {
            for x in 0..w {
                let mut hit = erode;
                'kernel: for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        let on = self.get(nx as u32, ny as u32);
                        if erode && !on {
                            hit = false;
                            break 'kernel;
                        }
                        if !erode && on {
                            hit = true;
                            break 'kernel;
                        }
                    }
                }
                out.set(x as u32, y as u32, hit);
            }
        }
        out
    }

    /// Smallest row index holding any set pixel.
    fn top_row(&self) -> Option<u32> {
        (0..self.height).find(|&y| (0..self.width).any(|x| self.get(x, y)))
    }

    /// Largest column index holding any set pixel.
    fn right_col(&self) -> Option<u32> {
        (0..self.width).rev().find(|&x| (0..self.height).any(|y| self.get(x, y)))
    }
}

fn validate(capture: &Capture) -> Result<(), SensingError> {
    if capture.width == 0 || capture.height == 0 {
        return Err(SensingError::EmptyRegion { width: capture.width, height: capture.height });
    }
    if capture.bytes_per_row < capture.width * 4 {
        return Err(SensingError::BadStride {
            width: capture.width,
            bytes_per_row: capture.bytes_per_row,
        });
    }
    let expected = capture.bytes_per_row as usize * capture.height as usize;
    if capture.data.len() < expected {
        return Err(SensingError::Truncated { expected, actual: capture.data.len() });
    }
    Ok(())
}

/// Read a fill percentage from an already cleaned mask.
pub fn percent_from_mask(mask: &Mask) -> f64 {
    if mask.width == 0 || mask.height == 0 {
        return 0.0;
    }
    match Orientation::classify(mask.width, mask.height) {
        Orientation::Vertical => match mask.top_row() {
            Some(top) => 100.0 * (mask.height - top) as f64 / mask.height as f64,
            None => 0.0,
        },
        Orientation::Horizontal => match mask.right_col() {
            Some(right) => 100.0 * right as f64 / mask.width as f64,
            None => 0.0,
        },
    }
}

/// Threshold and clean a capture, returning the mask the percent is read from.
pub fn clean_mask(capture: &Capture, range: &HsvRange) -> Result<Mask, SensingError> {
    Ok(Mask::from_capture(capture, range)?.open().close())
}

pub fn try_measure(capture: &Capture, range: &HsvRange) -> Result<f64, SensingError> {
    let mask = clean_mask(capture, range)?;
    Ok(percent_from_mask(&mask).clamp(0.0, 100.0))
}

/// Fill percentage in [0, 100]. Never fails: unreadable input reads as full.
pub fn measure(capture: &Capture, range: &HsvRange) -> f64 {
    match try_measure(capture, range) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "unreadable bar region, assuming full");
            FAIL_SAFE_PERCENT
        }
    }
}

/// Per-resource sensing instance: a color band plus the resource it reads.
#[derive(Debug, Clone)]
pub struct SensingEngine {
    kind: ResourceKind,
    range: HsvRange,
}

impl SensingEngine {
    pub fn new(kind: ResourceKind, range: HsvRange) -> Self {
        Self { kind, range }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn range(&self) -> &HsvRange {
        &self.range
    }

    pub fn set_range(&mut self, range: HsvRange) {
        self.range = range;
    }

    pub fn measure(&self, capture: &Capture) -> f64 {
        let percent = measure(capture, &self.range);
        debug!(resource = %self.kind, percent, "bar measured");
        percent
    }
}

/// Write a mask as a black/white PNG for calibration.
#[cfg(feature = "debug-capture")]
pub fn save_mask(mask: &Mask, path: &std::path::Path) -> image::ImageResult<()> {
    let img = image::GrayImage::from_fn(mask.width, mask.height, |x, y| {
        image::Luma([if mask.get(x, y) { 255 } else { 0 }])
    });
    img.save(path)
}
