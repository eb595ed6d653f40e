use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::cooldown::CooldownGate;
use crate::error::{ActuationError, TickError};
use crate::monitor::{BarSample, ResourceMonitor};
use crate::platform::{ActionExecutor, Platform, RegionSampler};
use crate::settings::{Settings, SharedSettings};
use crate::sleep;
use crate::targeting::{RingState, TargetGeometry};
use crate::types::*;

/// Wait after a failed tick before trying again.
pub const TICK_BACKOFF: Duration = Duration::from_secs(1);
/// How long `stop()` waits for the worker to exit.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(1);
/// Pause between the spell key and moving the cursor.
pub const CAST_SETTLE: Duration = Duration::from_millis(100);

/// Worker-owned run state, reset on every start.
#[derive(Debug, Clone, Default)]
pub struct ControllerRunState {
    pub running: bool,
    pub started_at: Option<Instant>,
    pub ring: RingState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PotionUse {
    pub kind: ResourceKind,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpellCast {
    pub target: Option<Point>,
    pub succeeded: bool,
}

/// What one tick observed and did.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub samples: [BarSample; 3],
    pub potions: Vec<PotionUse>,
    pub spell: Option<SpellCast>,
}

impl TickOutcome {
    pub fn any_changed(&self) -> bool {
        self.samples.iter().any(|s| s.changed)
    }
}

/// The per-tick decision logic: sensing, potion gates and spell casting.
/// Owned by a single worker; never shared.
pub struct ReactionEngine {
    monitor: ResourceMonitor,
    potion_gates: [CooldownGate; 3],
    spell_gate: CooldownGate,
    run: ControllerRunState,
    geometry: TargetGeometry<StdRng>,
    cast_settle: Duration,
}

impl ReactionEngine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            monitor: ResourceMonitor::new(),
            potion_gates: std::array::from_fn(|_| CooldownGate::from_secs(0.0)),
            spell_gate: CooldownGate::from_secs(0.0),
            run: ControllerRunState::default(),
            geometry: TargetGeometry::new(rng),
            cast_settle: CAST_SETTLE,
        }
    }

    pub fn with_cast_settle(mut self, settle: Duration) -> Self {
        self.cast_settle = settle;
        self
    }

    pub fn run_state(&self) -> &ControllerRunState {
        &self.run
    }

    pub fn mark_started(&mut self, now: Instant) {
        self.run = ControllerRunState { running: true, started_at: Some(now), ring: RingState::default() };
    }

    pub fn mark_stopped(&mut self) {
        self.run.running = false;
    }

    /// Run one tick against a settings snapshot. Health, mana, stamina and
    /// then the spell are evaluated in that order; every bar is sensed before
    /// any action is taken.
    pub fn tick_at(
        &mut self,
        settings: &Settings,
        frame: Option<&GameWindowFrame>,
        sampler: &dyn RegionSampler,
        executor: &dyn ActionExecutor,
        now: Instant,
    ) -> TickOutcome {
        #[cfg(feature = "debug-capture")]
        self.monitor.set_debug_dir(settings.debug_enabled.then(|| PathBuf::from("debug_images")));

        let bars: [ResourceBar; 3] = ResourceKind::ALL.map(|k| settings.resource_bar(k));
        let samples: [BarSample; 3] = std::array::from_fn(|i| self.monitor.sample(&bars[i], sampler));

        let mut outcome = TickOutcome { samples, potions: Vec::new(), spell: None };
        if outcome.any_changed() {
            info!(
                "Health: {:.1}% | Mana: {:.1}% | Stamina: {:.1}%",
                samples[0].reported, samples[1].reported, samples[2].reported
            );
        }

        for (bar, sample) in bars.iter().zip(samples.iter()) {
            let gate = &mut self.potion_gates[bar.kind.index()];
            gate.set_cooldown_secs(bar.cooldown_secs);
            if sample.raw >= bar.threshold || !gate.try_trigger(now) {
                continue;
            }
            let succeeded = match executor.press_key(&bar.potion_key) {
                Ok(()) => {
                    info!(resource = %bar.kind, percent = sample.raw, key = %bar.potion_key, "potion used");
                    true
                }
                Err(e) => {
                    warn!(resource = %bar.kind, error = %e, "potion key failed");
                    false
                }
            };
            outcome.potions.push(PotionUse { kind: bar.kind, succeeded });
        }

        let spell = &settings.spellcasting;
        if spell.enabled {
            self.spell_gate.set_cooldown_secs(spell.spell_interval);
            if self.spell_gate.try_trigger(now) {
                let target =
                    self.geometry.resolve(settings.zone_spec(), settings.ring_config(), frame, &mut self.run.ring);
                let succeeded = match self.cast(executor, &spell.spell_key, target) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(key = %spell.spell_key, error = %e, "spell cast failed");
                        false
                    }
                };
                self.run.ring.record_cast();
                outcome.spell = Some(SpellCast { target, succeeded });
            }
        }

        outcome
    }

    fn cast(&self, executor: &dyn ActionExecutor, key: &str, target: Option<Point>) -> Result<(), ActuationError> {
        executor.press_key(key)?;
        match target {
            Some(p) => {
                sleep::settle(self.cast_settle);
                executor.move_cursor(p.x, p.y)?;
                executor.right_click()?;
                info!(key, target = %p, "spell cast");
            }
            None => info!(key, "spell cast without target"),
        }
        Ok(())
    }

    /// Fold a tick's outcome into the shared status.
    pub fn record(&self, outcome: &TickOutcome, status: &mut ControllerStatus) {
        status.ticks += 1;
        for sample in &outcome.samples {
            status.percents[sample.kind.index()] = sample.reported;
        }
        for potion in outcome.potions.iter().filter(|p| p.succeeded) {
            status.potions_used[potion.kind.index()] += 1;
        }
        if let Some(cast) = outcome.spell {
            if cast.succeeded {
                status.spells_cast += 1;
            }
            status.last_target = cast.target;
        }
        status.casts_since_target_change = self.run.ring.casts_since_change;
        status.ring_offset = self.run.ring.offset;
    }
}

impl Default for ReactionEngine {
    fn default() -> Self {
        Self::new()
    }
}

struct Worker {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Wait up to `timeout` for the loop to exit. Hands the worker back if
    /// it is still busy.
    fn finish(self, timeout: Duration) -> Result<(), Worker> {
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    error!("controller thread panicked");
                }
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => Err(self),
        }
    }
}

/// Everything the worker thread needs, cloned out of the controller.
#[derive(Clone)]
struct WorkerContext {
    settings: SharedSettings,
    frame: Arc<Mutex<Option<GameWindowFrame>>>,
    sampler: Arc<dyn RegionSampler>,
    executor: Arc<dyn ActionExecutor>,
    status: Arc<Mutex<ControllerStatus>>,
}

/// Runs the reaction loop on a background thread with explicit start/stop.
pub struct ReactionController {
    ctx: WorkerContext,
    settings_path: Option<PathBuf>,
    cast_settle: Duration,
    worker: Option<Worker>,
    // Stopped but still mid-tick when `stop` gave up on it.
    detached: Option<Worker>,
}

impl ReactionController {
    pub fn new(settings: SharedSettings, sampler: Arc<dyn RegionSampler>, executor: Arc<dyn ActionExecutor>) -> Self {
        Self {
            ctx: WorkerContext {
                settings,
                frame: Arc::new(Mutex::new(None)),
                sampler,
                executor,
                status: Arc::new(Mutex::new(ControllerStatus::default())),
            },
            settings_path: None,
            cast_settle: CAST_SETTLE,
            worker: None,
            detached: None,
        }
    }

    pub fn from_platform(settings: SharedSettings, platform: &Platform) -> Self {
        Self::new(settings, platform.sampler.clone(), platform.executor.clone())
    }

    /// Persist settings to `path` whenever the controller stops.
    pub fn with_settings_path(mut self, path: PathBuf) -> Self {
        self.settings_path = Some(path);
        self
    }

    pub fn with_cast_settle(mut self, settle: Duration) -> Self {
        self.cast_settle = settle;
        self
    }

    /// Replace the reference frame. A running worker picks it up next tick.
    pub fn set_game_window(&self, frame: Option<GameWindowFrame>) {
        *self.ctx.frame.lock().unwrap_or_else(PoisonError::into_inner) = frame;
    }

    pub fn game_window(&self) -> Option<GameWindowFrame> {
        *self.ctx.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> SharedSettings {
        self.ctx.settings.clone()
    }

    pub fn status(&self) -> Arc<Mutex<ControllerStatus>> {
        self.ctx.status.clone()
    }

    pub fn status_snapshot(&self) -> ControllerStatus {
        self.ctx.status.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn start(&mut self) {
        if self.worker.is_some() {
            debug!("controller already running");
            return;
        }
        if let Some(old) = self.detached.take() {
            if let Err(old) = old.finish(STOP_TIMEOUT) {
                warn!("previous controller worker is still busy, not starting");
                self.detached = Some(old);
                return;
            }
        }

        if let Some(id) = self.game_window().and_then(|f| f.window_id) {
            if let Err(e) = self.ctx.executor.focus_window(id) {
                warn!("could not focus game window: {}", e);
            }
        }

        {
            let mut status = self.ctx.status.lock().unwrap_or_else(PoisonError::into_inner);
            *status = ControllerStatus { state: RunState::Running, ..ControllerStatus::default() };
        }

        let mut engine = ReactionEngine::new().with_cast_settle(self.cast_settle);
        engine.mark_started(Instant::now());

        let (stop_tx, stop_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let ctx = self.ctx.clone();
        let spawned = thread::Builder::new()
            .name("vigil-controller".into())
            .spawn(move || run_loop(ctx, engine, stop_rx, done_tx));

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker { stop_tx, done_rx, handle });
                info!("controller started");
            }
            Err(e) => {
                error!("failed to spawn controller thread: {}", e);
                self.ctx.status.lock().unwrap_or_else(PoisonError::into_inner).state = RunState::Idle;
            }
        }
    }

    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            debug!("controller already idle");
            return;
        };

        // Receiver gone means the worker already exited.
        let _ = worker.stop_tx.send(());
        if let Err(worker) = worker.finish(STOP_TIMEOUT) {
            warn!("controller worker did not exit within {:?}, detaching", STOP_TIMEOUT);
            self.detached = Some(worker);
        }

        self.ctx.status.lock().unwrap_or_else(PoisonError::into_inner).state = RunState::Idle;
        info!("controller stopped");

        if let Some(path) = &self.settings_path {
            let snapshot = self.ctx.settings.lock().unwrap_or_else(PoisonError::into_inner).clone();
            if let Err(e) = snapshot.save(path) {
                error!("failed to save settings: {}", e);
            }
        }
    }
}

impl Drop for ReactionController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(ctx: WorkerContext, mut engine: ReactionEngine, stop_rx: Receiver<()>, done_tx: Sender<()>) {
    loop {
        let result = panic::catch_unwind(AssertUnwindSafe(|| run_tick(&ctx, &mut engine)))
            .unwrap_or_else(|payload| Err(TickError::Panicked(panic_message(payload.as_ref()))));

        let wait = match result {
            Ok(interval) => interval,
            Err(e) => {
                error!("tick failed: {}", e);
                ctx.status.lock().unwrap_or_else(PoisonError::into_inner).last_error = Some(e.to_string());
                TICK_BACKOFF
            }
        };

        if sleep::wait_or_stop(&stop_rx, wait) {
            break;
        }
    }
    engine.mark_stopped();
    let _ = done_tx.send(());
}

/// Snapshot the configuration, run one tick, publish the result. Returns
/// the delay until the next tick.
fn run_tick(ctx: &WorkerContext, engine: &mut ReactionEngine) -> Result<Duration, TickError> {
    let settings = ctx.settings.lock().map_err(|_| TickError::SettingsPoisoned)?.clone();
    let frame = *ctx.frame.lock().unwrap_or_else(PoisonError::into_inner);

    let outcome = engine.tick_at(
        &settings,
        frame.as_ref(),
        ctx.sampler.as_ref(),
        ctx.executor.as_ref(),
        Instant::now(),
    );

    let mut status = ctx.status.lock().unwrap_or_else(PoisonError::into_inner);
    engine.record(&outcome, &mut status);
    Ok(settings.scan_interval())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::stub::StubPlatform;

    #[test]
    fn test_record_counts_only_successful_actions() {
        let engine = ReactionEngine::with_rng(StdRng::seed_from_u64(1));
        let sample = |kind| BarSample { kind, raw: 20.0, reported: 20.0, changed: true };
        let outcome = TickOutcome {
            samples: ResourceKind::ALL.map(sample),
            potions: vec![
                PotionUse { kind: ResourceKind::Health, succeeded: true },
                PotionUse { kind: ResourceKind::Mana, succeeded: false },
            ],
            spell: Some(SpellCast { target: Some(Point::new(4, 5)), succeeded: true }),
        };

        let mut status = ControllerStatus::default();
        engine.record(&outcome, &mut status);
        assert_eq!(status.ticks, 1);
        assert_eq!(status.percents, [20.0; 3]);
        assert_eq!(status.potions_used, [1, 0, 0]);
        assert_eq!(status.spells_cast, 1);
        assert_eq!(status.last_target, Some(Point::new(4, 5)));
    }

    #[test]
    fn test_unconfigured_bars_never_trigger() {
        let stub = StubPlatform::new();
        let mut engine = ReactionEngine::with_rng(StdRng::seed_from_u64(1)).with_cast_settle(Duration::ZERO);
        let outcome = engine.tick_at(&Settings::default(), None, &stub, &stub, Instant::now());
        assert!(outcome.potions.is_empty());
        assert!(outcome.spell.is_none());
        assert!(outcome.samples.iter().all(|s| s.raw == 100.0));
        assert!(!outcome.any_changed());
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 7");
    }

    #[test]
    fn test_mark_started_resets_ring() {
        let mut engine = ReactionEngine::with_rng(StdRng::seed_from_u64(1));
        engine.run.ring.casts_since_change = 5;
        engine.mark_started(Instant::now());
        assert!(engine.run_state().running);
        assert_eq!(engine.run_state().ring, RingState::default());
        engine.mark_stopped();
        assert!(!engine.run_state().running);
    }
}
