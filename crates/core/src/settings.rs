use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::targeting::{generate_zone_points, RingConfig, ZoneSpec};
use crate::types::*;

/// Settings shared between the UI thread and the controller worker.
pub type SharedSettings = Arc<Mutex<Settings>>;

/// Thresholds outside this range would either never fire or always fire.
const THRESHOLD_RANGE: (f64, f64) = (1.0, 99.0);
const MIN_SCAN_INTERVAL: f64 = 0.05;
const MAX_SCAN_INTERVAL: f64 = 3600.0;

/// A user-selected screen area. `configured` stays false until selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Area {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub configured: bool,
}

impl Area {
    pub fn rect(&self) -> Option<Rect> {
        let rect = Rect::new(self.x1, self.y1, self.x2, self.y2);
        (self.configured && !rect.is_empty()).then_some(rect)
    }

    pub fn set(&mut self, rect: Rect) {
        let r = rect.normalized();
        *self = Area { x1: r.x1, y1: r.y1, x2: r.x2, y2: r.y2, configured: true };
    }

    fn normalize(&mut self) {
        let r = Rect::new(self.x1, self.y1, self.x2, self.y2);
        (self.x1, self.y1, self.x2, self.y2) = (r.x1, r.y1, r.x2, r.y2);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarAreas {
    pub health: Area,
    pub mana: Area,
    pub stamina: Area,
    pub game_window: Area,
}

impl BarAreas {
    pub fn get(&self, kind: ResourceKind) -> &Area {
        match kind {
            ResourceKind::Health => &self.health,
            ResourceKind::Mana => &self.mana,
            ResourceKind::Stamina => &self.stamina,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut Area {
        match kind {
            ResourceKind::Health => &mut self.health,
            ResourceKind::Mana => &mut self.mana,
            ResourceKind::Stamina => &mut self.stamina,
        }
    }
}

macro_rules! per_resource {
    ($name:ident, $ty:ty, $health:expr, $mana:expr, $stamina:expr) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            pub health: $ty,
            pub mana: $ty,
            pub stamina: $ty,
        }

        impl Default for $name {
            fn default() -> Self {
                Self { health: $health, mana: $mana, stamina: $stamina }
            }
        }

        impl $name {
            pub fn get(&self, kind: ResourceKind) -> &$ty {
                match kind {
                    ResourceKind::Health => &self.health,
                    ResourceKind::Mana => &self.mana,
                    ResourceKind::Stamina => &self.stamina,
                }
            }

            pub fn get_mut(&mut self, kind: ResourceKind) -> &mut $ty {
                match kind {
                    ResourceKind::Health => &mut self.health,
                    ResourceKind::Mana => &mut self.mana,
                    ResourceKind::Stamina => &mut self.stamina,
                }
            }
        }
    };
}

per_resource!(PotionKeys, String, "1".into(), "3".into(), "2".into());
per_resource!(Thresholds, f64, 50.0, 30.0, 40.0);
per_resource!(PotionCooldowns, f64, 3.0, 3.0, 3.0);
per_resource!(ColorRanges, HsvRange, HsvRange::HEALTH, HsvRange::MANA, HsvRange::STAMINA);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetZoneSettings {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub configured: bool,
    pub points: Vec<Point>,
    pub points_count: usize,
}

impl Default for TargetZoneSettings {
    fn default() -> Self {
        Self { x1: 0, y1: 0, x2: 0, y2: 0, configured: false, points: Vec::new(), points_count: 8 }
    }
}

impl TargetZoneSettings {
    pub fn rect(&self) -> Option<Rect> {
        let rect = Rect::new(self.x1, self.y1, self.x2, self.y2);
        (self.configured && !rect.is_empty()).then_some(rect)
    }

    /// Select a new zone and generate a fresh point set for it.
    pub fn set_rect<R: Rng + ?Sized>(&mut self, rng: &mut R, rect: Rect) {
        let r = rect.normalized();
        (self.x1, self.y1, self.x2, self.y2) = (r.x1, r.y1, r.x2, r.y2);
        self.configured = true;
        self.points = generate_zone_points(rng, r, self.points_count);
    }

    /// Change the number of aim points; the set is regenerated when it differs.
    pub fn set_points_count<R: Rng + ?Sized>(&mut self, rng: &mut R, count: usize) {
        let count = count.max(1);
        if count == self.points_count && self.points.len() == count {
            return;
        }
        self.points_count = count;
        if let Some(rect) = self.rect() {
            self.points = generate_zone_points(rng, rect, count);
        }
    }

    fn is_consistent(&self, rect: Rect) -> bool {
        self.points.len() == self.points_count && self.points.iter().all(|p| rect.contains(*p))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellSettings {
    pub enabled: bool,
    pub spell_key: String,
    pub spell_interval: f64,
    pub random_targeting: bool,
    pub target_radius: f64,
    pub target_change_interval: u32,
    pub target_zone: TargetZoneSettings,
}

impl Default for SpellSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            spell_key: "F5".into(),
            spell_interval: 3.0,
            random_targeting: false,
            target_radius: 100.0,
            target_change_interval: 1,
            target_zone: TargetZoneSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bars: BarAreas,
    pub potion_keys: PotionKeys,
    pub thresholds: Thresholds,
    pub potion_cooldowns: PotionCooldowns,
    pub color_ranges: ColorRanges,
    pub scan_interval: f64,
    pub spellcasting: SpellSettings,
    pub window_title: String,
    pub debug_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bars: BarAreas::default(),
            potion_keys: PotionKeys::default(),
            thresholds: Thresholds::default(),
            potion_cooldowns: PotionCooldowns::default(),
            color_ranges: ColorRanges::default(),
            scan_interval: 0.5,
            spellcasting: SpellSettings::default(),
            window_title: "Priston Tale".into(),
            debug_enabled: false,
        }
    }
}

impl Settings {
    /// Load from `path`. A missing or unreadable file yields defaults.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no settings at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("failed to read {}: {}, using defaults", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str::<Settings>(&text) {
            Ok(mut settings) => {
                settings.normalize(&mut rand::thread_rng());
                info!("loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("invalid settings in {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        info!("settings saved to {}", path.display());
        Ok(())
    }

    pub fn shared(self) -> SharedSettings {
        Arc::new(Mutex::new(self))
    }

    /// Fix up a document edited by hand or written by an older version.
    pub fn normalize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for kind in ResourceKind::ALL {
            self.bars.get_mut(kind).normalize();
            let t = self.thresholds.get_mut(kind);
            *t = if t.is_finite() { t.clamp(THRESHOLD_RANGE.0, THRESHOLD_RANGE.1) } else { THRESHOLD_RANGE.0 };
        }
        self.bars.game_window.normalize();

        let zone = &mut self.spellcasting.target_zone;
        zone.points_count = zone.points_count.max(1);
        if let Some(rect) = zone.rect() {
            (zone.x1, zone.y1, zone.x2, zone.y2) = (rect.x1, rect.y1, rect.x2, rect.y2);
            if !zone.is_consistent(rect) {
                warn!(zone = %rect, "saved target points don't fit the zone, regenerating");
                zone.points = generate_zone_points(rng, rect, zone.points_count);
            }
        }
    }

    /// The bar for `kind` as the controller sees it this tick.
    pub fn resource_bar(&self, kind: ResourceKind) -> ResourceBar {
        ResourceBar {
            kind,
            region: self.bars.get(kind).rect(),
            color_range: *self.color_ranges.get(kind),
            threshold: *self.thresholds.get(kind),
            potion_key: self.potion_keys.get(kind).clone(),
            cooldown_secs: *self.potion_cooldowns.get(kind),
        }
    }

    pub fn set_bar_region(&mut self, kind: ResourceKind, rect: Rect) {
        self.bars.get_mut(kind).set(rect);
    }

    /// Nudge a threshold, keeping it in the valid range.
    pub fn adjust_threshold(&mut self, kind: ResourceKind, delta: f64) -> f64 {
        let t = self.thresholds.get_mut(kind);
        *t = (*t + delta).clamp(THRESHOLD_RANGE.0, THRESHOLD_RANGE.1);
        *t
    }

    pub fn game_window(&self) -> Option<GameWindowFrame> {
        self.bars.game_window.rect().map(GameWindowFrame::new)
    }

    /// Ring targeting parameters, when random targeting is on.
    pub fn ring_config(&self) -> Option<RingConfig> {
        let spell = &self.spellcasting;
        spell.random_targeting.then_some(RingConfig {
            radius: spell.target_radius,
            change_every: spell.target_change_interval,
        })
    }

    pub fn zone_spec(&self) -> Option<ZoneSpec<'_>> {
        let zone = &self.spellcasting.target_zone;
        zone.rect().map(|rect| ZoneSpec { rect, saved: &zone.points, count: zone.points_count })
    }

    pub fn scan_interval(&self) -> Duration {
        let secs = if self.scan_interval.is_finite() { self.scan_interval } else { 0.5 };
        Duration::from_secs_f64(secs.clamp(MIN_SCAN_INTERVAL, MAX_SCAN_INTERVAL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.potion_keys.get(ResourceKind::Health), "1");
        assert_eq!(s.potion_keys.get(ResourceKind::Mana), "3");
        assert_eq!(s.potion_keys.get(ResourceKind::Stamina), "2");
        assert_eq!(*s.thresholds.get(ResourceKind::Mana), 30.0);
        assert_eq!(s.spellcasting.spell_key, "F5");
        assert_eq!(s.spellcasting.target_zone.points_count, 8);
        assert!(s.resource_bar(ResourceKind::Health).region.is_none());
        assert!(s.game_window().is_none());
        assert!(s.ring_config().is_none());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let json = r#"{
            "bars": {"health": {"x1": 50, "y1": 20, "x2": 10, "y2": 10, "configured": true}},
            "thresholds": {"health": 65},
            "spellcasting": {"enabled": true}
        }"#;
        let mut s: Settings = serde_json::from_str(json).expect("parse");
        s.normalize(&mut StdRng::seed_from_u64(1));

        let bar = s.resource_bar(ResourceKind::Health);
        assert_eq!(bar.region, Some(Rect::new(10, 10, 50, 20)));
        assert_eq!(bar.threshold, 65.0);
        assert_eq!(*s.thresholds.get(ResourceKind::Mana), 30.0);
        assert!(s.spellcasting.enabled);
        assert_eq!(s.spellcasting.spell_interval, 3.0);
        assert_eq!(s.window_title, "Priston Tale");
    }

    #[test]
    fn test_thresholds_clamped() {
        let mut s = Settings::default();
        *s.thresholds.get_mut(ResourceKind::Health) = 0.0;
        *s.thresholds.get_mut(ResourceKind::Mana) = 150.0;
        s.normalize(&mut StdRng::seed_from_u64(1));
        assert_eq!(*s.thresholds.get(ResourceKind::Health), 1.0);
        assert_eq!(*s.thresholds.get(ResourceKind::Mana), 99.0);
        assert_eq!(s.adjust_threshold(ResourceKind::Mana, 5.0), 99.0);
        assert_eq!(s.adjust_threshold(ResourceKind::Stamina, -1.0), 39.0);
    }

    #[test]
    fn test_inconsistent_zone_points_regenerated() {
        let mut s = Settings::default();
        let zone = &mut s.spellcasting.target_zone;
        (zone.x1, zone.y1, zone.x2, zone.y2, zone.configured) = (100, 100, 300, 200, true);
        zone.points = vec![Point::new(5, 5)];
        s.normalize(&mut StdRng::seed_from_u64(3));

        let zone = &s.spellcasting.target_zone;
        let rect = zone.rect().expect("configured");
        assert_eq!(zone.points.len(), 8);
        assert!(zone.points.iter().all(|p| rect.contains(*p)));
    }

    #[test]
    fn test_points_count_change_regenerates() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut zone = TargetZoneSettings::default();
        zone.set_rect(&mut rng, Rect::new(0, 0, 400, 300));
        assert_eq!(zone.points.len(), 8);

        zone.set_points_count(&mut rng, 12);
        assert_eq!(zone.points.len(), 12);
        assert_eq!(zone.points_count, 12);
    }

    #[test]
    fn test_points_serialize_as_pairs() {
        let mut s = Settings::default();
        s.spellcasting.target_zone.points = vec![Point::new(3, 4)];
        let json = serde_json::to_value(&s).expect("serialize");
        assert_eq!(json["spellcasting"]["target_zone"]["points"][0], serde_json::json!([3, 4]));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");

        let mut s = Settings::default();
        s.set_bar_region(ResourceKind::Mana, Rect::new(10, 40, 210, 52));
        s.spellcasting.random_targeting = true;
        s.save(&path).expect("save");

        let loaded = Settings::load(&path);
        assert_eq!(loaded, s);
        assert_eq!(
            loaded.ring_config(),
            Some(RingConfig { radius: 100.0, change_every: 1 })
        );
    }

    #[test]
    fn test_load_missing_or_invalid_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(Settings::load(&dir.path().join("nope.json")), Settings::default());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").expect("write");
        assert_eq!(Settings::load(&bad), Settings::default());
    }

    #[test]
    fn test_scan_interval_floor() {
        let mut s = Settings::default();
        s.scan_interval = 0.0;
        assert_eq!(s.scan_interval(), Duration::from_secs_f64(0.05));
        s.scan_interval = f64::NAN;
        assert_eq!(s.scan_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_scan_interval_ceiling() {
        let mut s = Settings::default();
        s.scan_interval = 1e20;
        assert_eq!(s.scan_interval(), Duration::from_secs(3600));
        s.scan_interval = f64::MAX;
        assert_eq!(s.scan_interval(), Duration::from_secs(3600));
    }
}
