//! Spell target selection.
//!
//! Two strategies, tried in order:
//! - **Zone**: a fixed set of aim points generated inside a user rectangle,
//!   biased towards the lower half around the zone's center. Each cast picks
//!   one of them at random.
//! - **Ring**: a random offset inside a disk around the game window's center,
//!   redrawn every N casts and clamped to the window.
//!
//! With neither available the cast is key-only.

use std::f64::consts::TAU;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::types::{GameWindowFrame, Point, Rect};

/// Zone points sit on an arc spanning -135..135 degrees around the center.
const ZONE_ARC_DEG: f64 = 135.0;
/// Arc radius as a fraction of the zone's smaller side.
const ZONE_RADIUS_FACTOR: f64 = 0.4;
const ZONE_RADIUS_JITTER: (f64, f64) = (0.7, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetingMode {
    None,
    Ring,
    Zone,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingConfig {
    pub radius: f64,
    /// Redraw the offset every this many casts; 0 and 1 both mean every cast.
    pub change_every: u32,
}

/// Uniform sample over a disk of `radius`: `sqrt` on the radial draw keeps
/// density even across the area instead of piling up at the center.
pub fn sample_ring_offset<R: Rng + ?Sized>(rng: &mut R, radius: f64) -> (f64, f64) {
    let angle = rng.gen_range(0.0..TAU);
    let distance = radius.max(0.0) * rng.gen::<f64>().sqrt();
    (distance * angle.cos(), distance * angle.sin())
}

/// Window center plus `offset`, clamped to the window on each axis.
pub fn ring_target(frame: &GameWindowFrame, offset: (f64, f64)) -> Point {
    let (cx, cy) = frame.rect.center();
    let raw = Point::new((cx + offset.0).round() as i32, (cy + offset.1).round() as i32);
    frame.rect.clamp(raw)
}

/// Ring offset plus the cast counter deciding when to redraw it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RingState {
    pub casts_since_change: u32,
    pub offset: Option<(f64, f64)>,
}

impl RingState {
    /// Offset to use for the upcoming cast, redrawn on a change boundary.
    pub fn offset_for_cast<R: Rng + ?Sized>(&mut self, rng: &mut R, config: RingConfig) -> (f64, f64) {
        let every = config.change_every.max(1);
        match self.offset {
            Some(offset) if self.casts_since_change < every => offset,
            _ => {
                let offset = sample_ring_offset(rng, config.radius);
                debug!(dx = offset.0, dy = offset.1, "new ring offset");
                self.offset = Some(offset);
                self.casts_since_change = 0;
                offset
            }
        }
    }

    pub fn record_cast(&mut self) {
        self.casts_since_change = self.casts_since_change.saturating_add(1);
    }
}

fn zone_center(rect: &Rect) -> (i32, i32) {
    ((rect.x1 + rect.x2).div_euclid(2), (rect.y1 + rect.y2).div_euclid(2))
}

/// Generate `count` aim points inside `rect`.
pub fn generate_zone_points<R: Rng + ?Sized>(rng: &mut R, rect: Rect, count: usize) -> Vec<Point> {
    let rect = rect.normalized();
    let (cx, cy) = zone_center(&rect);
    let radius = rect.width().min(rect.height()) as f64 * ZONE_RADIUS_FACTOR;

    (0..count)
        .map(|_| {
            let angle = rng.gen_range(-ZONE_ARC_DEG..=ZONE_ARC_DEG).to_radians();
            let r = radius * rng.gen_range(ZONE_RADIUS_JITTER.0..=ZONE_RADIUS_JITTER.1);
            let p = Point::new(cx + (r * angle.cos()) as i32, cy + (r * angle.sin()) as i32);
            rect.clamp(p)
        })
        .collect()
}

/// A target rectangle and its pre-generated aim points.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetZone {
    rect: Rect,
    points: Vec<Point>,
}

impl TargetZone {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, rect: Rect, count: usize) -> Self {
        let rect = rect.normalized();
        Self { rect, points: generate_zone_points(rng, rect, count) }
    }

    /// Reuse saved points when they still fit the zone, otherwise regenerate.
    pub fn from_saved<R: Rng + ?Sized>(rng: &mut R, rect: Rect, points: Vec<Point>, count: usize) -> Self {
        let rect = rect.normalized();
        let zone = Self { rect, points };
        if zone.is_consistent(count) {
            zone
        } else {
            Self::generate(rng, rect, count)
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Right number of points and all of them inside the rectangle.
    pub fn is_consistent(&self, count: usize) -> bool {
        self.points.len() == count && self.points.iter().all(|p| self.rect.contains(*p))
    }

    /// Regenerates the point set when `count` differs from the current one.
    pub fn set_point_count<R: Rng + ?Sized>(&mut self, rng: &mut R, count: usize) {
        if count != self.points.len() {
            self.points = generate_zone_points(rng, self.rect, count);
        }
    }

    /// One of the fixed points, chosen uniformly.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Point> {
        self.points.choose(rng).copied()
    }
}

/// Zone as it comes out of settings: rectangle, saved points and wanted count.
#[derive(Debug, Clone, Copy)]
pub struct ZoneSpec<'a> {
    pub rect: Rect,
    pub saved: &'a [Point],
    pub count: usize,
}

/// Resolves the aim point for a cast from whatever is configured.
#[derive(Debug)]
pub struct TargetGeometry<R> {
    rng: R,
    zone: Option<TargetZone>,
}

impl<R: Rng> TargetGeometry<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, zone: None }
    }

    pub fn zone(&self) -> Option<&TargetZone> {
        self.zone.as_ref()
    }

    pub fn mode(
        zone: Option<&TargetZone>,
        ring: Option<RingConfig>,
        frame: Option<&GameWindowFrame>,
    ) -> TargetingMode {
        match (zone, ring, frame) {
            (Some(z), _, _) if !z.points().is_empty() => TargetingMode::Zone,
            (_, Some(_), Some(_)) => TargetingMode::Ring,
            _ => TargetingMode::None,
        }
    }

    /// Aim point for the next cast, or `None` for a key-only cast.
    pub fn resolve(
        &mut self,
        zone: Option<ZoneSpec<'_>>,
        ring: Option<RingConfig>,
        frame: Option<&GameWindowFrame>,
        state: &mut RingState,
    ) -> Option<Point> {
        match zone {
            Some(spec) => self.refresh_zone(spec),
            None => self.zone = None,
        }

        match Self::mode(self.zone.as_ref(), ring, frame) {
            TargetingMode::Zone => self.zone.as_ref().and_then(|z| z.pick(&mut self.rng)),
            TargetingMode::Ring => {
                let (config, frame) = (ring?, frame?);
                let offset = state.offset_for_cast(&mut self.rng, config);
                Some(ring_target(frame, offset))
            }
            TargetingMode::None => None,
        }
    }

    /// Saved points win when they fit; otherwise the cached set is kept until
    /// the rectangle or count changes.
    fn refresh_zone(&mut self, spec: ZoneSpec<'_>) {
        let rect = spec.rect.normalized();
        let saved_fits = spec.saved.len() == spec.count && spec.saved.iter().all(|p| rect.contains(*p));
        let keep = match &self.zone {
            Some(z) => {
                z.rect() == rect && z.is_consistent(spec.count) && (!saved_fits || z.points() == spec.saved)
            }
            None => false,
        };
        if !keep {
            let zone = TargetZone::from_saved(&mut self.rng, rect, spec.saved.to_vec(), spec.count);
            debug!(zone = %rect, points = zone.points().len(), "target zone loaded");
            self.zone = Some(zone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_ring_offsets_stay_inside_radius() {
        let mut rng = rng();
        for _ in 0..10_000 {
            let (dx, dy) = sample_ring_offset(&mut rng, 100.0);
            assert!((dx * dx + dy * dy).sqrt() <= 100.0 + 1e-9);
        }
    }

    #[test]
    fn test_ring_mean_distance_is_two_thirds_radius() {
        let mut rng = rng();
        let n = 20_000;
        let radius = 150.0;
        let total: f64 = (0..n)
            .map(|_| {
                let (dx, dy) = sample_ring_offset(&mut rng, radius);
                (dx * dx + dy * dy).sqrt()
            })
            .sum();
        let mean = total / n as f64;
        let expected = radius * 2.0 / 3.0;
        assert!((mean - expected).abs() / expected < 0.05, "mean {}", mean);
    }

    #[test]
    fn test_ring_target_clamped_to_window() {
        let frame = GameWindowFrame::new(Rect::new(0, 0, 800, 600));
        assert_eq!(ring_target(&frame, (0.0, 0.0)), Point::new(400, 300));
        assert_eq!(ring_target(&frame, (1000.0, -1000.0)), Point::new(800, 0));
    }

    #[test]
    fn test_ring_state_redraws_every_n_casts() {
        let mut rng = rng();
        let cfg = RingConfig { radius: 100.0, change_every: 3 };
        let mut state = RingState::default();

        let first = state.offset_for_cast(&mut rng, cfg);
        state.record_cast();
        assert_eq!(state.offset_for_cast(&mut rng, cfg), first);
        state.record_cast();
        assert_eq!(state.offset_for_cast(&mut rng, cfg), first);
        state.record_cast();
        let fourth = state.offset_for_cast(&mut rng, cfg);
        assert_ne!(fourth, first);
        assert_eq!(state.casts_since_change, 0);
    }

    #[test]
    fn test_ring_state_every_cast() {
        let mut rng = rng();
        let cfg = RingConfig { radius: 100.0, change_every: 1 };
        let mut state = RingState::default();
        let a = state.offset_for_cast(&mut rng, cfg);
        state.record_cast();
        let b = state.offset_for_cast(&mut rng, cfg);
        assert_ne!(a, b);
    }

    #[test]
    fn test_zone_points_inside_rect() {
        let mut rng = rng();
        let rects = [
            Rect::new(100, 100, 500, 400),
            Rect::new(0, 0, 3, 200),
            Rect::new(-300, -50, -100, 50),
            Rect::new(10, 10, 11, 11),
        ];
        for rect in rects {
            for count in [1, 8, 50] {
                let points = generate_zone_points(&mut rng, rect, count);
                assert_eq!(points.len(), count);
                assert!(points.iter().all(|p| rect.contains(*p)), "{} {:?}", rect, points);
            }
        }
    }

    #[test]
    fn test_zone_points_sit_on_arc() {
        let mut rng = rng();
        let rect = Rect::new(0, 0, 1000, 1000);
        for p in generate_zone_points(&mut rng, rect, 200) {
            let d = (((p.x - 500).pow(2) + (p.y - 500).pow(2)) as f64).sqrt();
            assert!(d >= 0.7 * 400.0 - 2.0 && d <= 400.0 + 2.0, "distance {}", d);
        }
    }

    #[test]
    fn test_zone_regenerates_on_count_change() {
        let mut rng = rng();
        let mut zone = TargetZone::generate(&mut rng, Rect::new(0, 0, 400, 300), 8);
        zone.set_point_count(&mut rng, 12);
        assert_eq!(zone.points().len(), 12);
        assert!(zone.is_consistent(12));
    }

    #[test]
    fn test_saved_points_outside_rect_are_replaced() {
        let mut rng = rng();
        let rect = Rect::new(0, 0, 100, 100);
        let zone = TargetZone::from_saved(&mut rng, rect, vec![Point::new(500, 500)], 1);
        assert!(zone.is_consistent(1));
        assert_ne!(zone.points()[0], Point::new(500, 500));
    }

    #[test]
    fn test_pick_draws_from_fixed_set() {
        let mut rng = rng();
        let zone = TargetZone::generate(&mut rng, Rect::new(0, 0, 400, 300), 5);
        for _ in 0..100 {
            let p = zone.pick(&mut rng).expect("zone has points");
            assert!(zone.points().contains(&p));
        }
    }

    #[test]
    fn test_mode_priority() {
        let mut rng = rng();
        let zone = TargetZone::generate(&mut rng, Rect::new(0, 0, 400, 300), 4);
        let ring = Some(RingConfig { radius: 50.0, change_every: 1 });
        let frame = GameWindowFrame::new(Rect::new(0, 0, 800, 600));

        type G = TargetGeometry<StdRng>;
        assert_eq!(G::mode(Some(&zone), ring, Some(&frame)), TargetingMode::Zone);
        assert_eq!(G::mode(None, ring, Some(&frame)), TargetingMode::Ring);
        assert_eq!(G::mode(None, ring, None), TargetingMode::None);
        assert_eq!(G::mode(None, None, Some(&frame)), TargetingMode::None);
    }

    #[test]
    fn test_resolve_without_zone_or_frame_is_key_only() {
        let mut geometry = TargetGeometry::new(rng());
        let mut state = RingState::default();
        let ring = Some(RingConfig { radius: 50.0, change_every: 1 });
        assert_eq!(geometry.resolve(None, ring, None, &mut state), None);
    }

    #[test]
    fn test_resolve_zone_keeps_generated_points_between_casts() {
        let mut geometry = TargetGeometry::new(rng());
        let mut state = RingState::default();
        let spec = ZoneSpec { rect: Rect::new(100, 100, 500, 400), saved: &[], count: 6 };

        let first = geometry.resolve(Some(spec), None, None, &mut state).expect("zone point");
        let points = geometry.zone().expect("zone cached").points().to_vec();
        assert_eq!(points.len(), 6);
        assert!(points.contains(&first));

        for _ in 0..20 {
            let p = geometry.resolve(Some(spec), None, None, &mut state).expect("zone point");
            assert!(points.contains(&p));
        }
        assert_eq!(geometry.zone().map(|z| z.points().to_vec()), Some(points));
    }

    #[test]
    fn test_resolve_zone_follows_moved_rect() {
        let mut geometry = TargetGeometry::new(rng());
        let mut state = RingState::default();
        let before = ZoneSpec { rect: Rect::new(100, 100, 500, 400), saved: &[], count: 6 };
        geometry.resolve(Some(before), None, None, &mut state).expect("zone point");
        let old_points = geometry.zone().expect("zone cached").points().to_vec();

        let moved = Rect::new(900, 600, 1200, 800);
        let after = ZoneSpec { rect: moved, saved: &old_points, count: 6 };
        let p = geometry.resolve(Some(after), None, None, &mut state).expect("zone point");
        assert!(moved.contains(p), "{} outside {}", p, moved);

        let zone = geometry.zone().expect("zone cached");
        assert_eq!(zone.rect(), moved);
        assert_eq!(zone.points().len(), 6);
        assert!(zone.points().iter().all(|p| moved.contains(*p) && !old_points.contains(p)));

        let recount = ZoneSpec { rect: moved, saved: &[], count: 3 };
        geometry.resolve(Some(recount), None, None, &mut state).expect("zone point");
        assert_eq!(geometry.zone().map(|z| z.points().len()), Some(3));
    }

    #[test]
    fn test_resolve_zone_uses_saved_points() {
        let mut geometry = TargetGeometry::new(rng());
        let mut state = RingState::default();
        let saved = [Point::new(120, 130)];
        let spec = ZoneSpec { rect: Rect::new(100, 100, 500, 400), saved: &saved, count: 1 };
        assert_eq!(geometry.resolve(Some(spec), None, None, &mut state), Some(Point::new(120, 130)));
    }
}
