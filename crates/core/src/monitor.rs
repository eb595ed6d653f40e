use std::time::Instant;

use tracing::{debug, warn};

use crate::platform::RegionSampler;
use crate::sensing::{SensingEngine, FAIL_SAFE_PERCENT};
use crate::types::{HsvRange, ResourceBar, ResourceKind};

/// Minimum change, in percentage points, before a new value is reported.
pub const CHANGE_THRESHOLD: f64 = 0.5;

/// A fresh measurement of one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensingReading {
    pub percent: f64,
    pub timestamp: Instant,
}

/// Keeps the last reported value and only moves it on a real change.
#[derive(Debug, Clone, Copy)]
pub struct Hysteresis {
    stable: f64,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self { stable: 100.0 }
    }
}

impl Hysteresis {
    pub fn stable(&self) -> f64 {
        self.stable
    }

    /// Returns the value to report and whether it moved.
    pub fn update(&mut self, reading: SensingReading) -> (f64, bool) {
        if (reading.percent - self.stable).abs() >= CHANGE_THRESHOLD {
            self.stable = reading.percent;
            (self.stable, true)
        } else {
            (self.stable, false)
        }
    }
}

/// Result of sampling one bar during a tick.
#[derive(Debug, Clone, Copy)]
pub struct BarSample {
    pub kind: ResourceKind,
    /// Raw measurement, used for threshold decisions.
    pub raw: f64,
    /// Hysteresis-filtered value, used for reporting.
    pub reported: f64,
    pub changed: bool,
}

/// One sensing engine and hysteresis state per tracked resource.
pub struct ResourceMonitor {
    engines: [SensingEngine; 3],
    hysteresis: [Hysteresis; 3],
    #[cfg(feature = "debug-capture")]
    debug_dir: Option<std::path::PathBuf>,
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceMonitor {
    pub fn new() -> Self {
        Self {
            engines: ResourceKind::ALL.map(|k| SensingEngine::new(k, HsvRange::for_resource(k))),
            hysteresis: [Hysteresis::default(); 3],
            #[cfg(feature = "debug-capture")]
            debug_dir: None,
        }
    }

    /// Dump every cleaned mask into `dir` while set.
    #[cfg(feature = "debug-capture")]
    pub fn set_debug_dir(&mut self, dir: Option<std::path::PathBuf>) {
        self.debug_dir = dir;
    }

    /// Take a fresh reading of `bar`. Unconfigured bars and failed captures read as full.
    pub fn read(&mut self, bar: &ResourceBar, sampler: &dyn RegionSampler) -> SensingReading {
        let idx = bar.kind.index();
        if self.engines[idx].range() != &bar.color_range {
            self.engines[idx].set_range(bar.color_range);
        }

        let percent = match bar.region {
            None => FAIL_SAFE_PERCENT,
            Some(rect) => match sampler.capture(rect) {
                Ok(capture) => {
                    #[cfg(feature = "debug-capture")]
                    self.dump_mask(bar, &capture);
                    self.engines[idx].measure(&capture)
                }
                Err(e) => {
                    warn!(resource = %bar.kind, error = %e, "capture failed, assuming full");
                    FAIL_SAFE_PERCENT
                }
            },
        };

        SensingReading { percent, timestamp: Instant::now() }
    }

    /// Feed a reading through the resource's hysteresis.
    pub fn update(&mut self, kind: ResourceKind, reading: SensingReading) -> (f64, bool) {
        self.hysteresis[kind.index()].update(reading)
    }

    /// Read and update in one step.
    pub fn sample(&mut self, bar: &ResourceBar, sampler: &dyn RegionSampler) -> BarSample {
        let reading = self.read(bar, sampler);
        let (reported, changed) = self.update(bar.kind, reading);
        if changed {
            debug!(resource = %bar.kind, percent = reported, "bar changed");
        }
        BarSample { kind: bar.kind, raw: reading.percent, reported, changed }
    }

    pub fn reported(&self, kind: ResourceKind) -> f64 {
        self.hysteresis[kind.index()].stable()
    }

    #[cfg(feature = "debug-capture")]
    fn dump_mask(&self, bar: &ResourceBar, capture: &crate::types::Capture) {
        let Some(dir) = &self.debug_dir else { return };
        let Ok(mask) = crate::sensing::clean_mask(capture, &bar.color_range) else { return };
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(error = %e, "cannot create debug image dir");
            return;
        }
        let path = dir.join(format!("{}_mask.png", bar.kind.name().to_lowercase()));
        if let Err(e) = crate::sensing::save_mask(&mask, &path) {
            warn!(error = %e, path = %path.display(), "failed to write mask");
        }
    }
}
