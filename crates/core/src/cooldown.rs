use std::time::{Duration, Instant};

/// Permits at most one trigger per cooldown window.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    cooldown: Duration,
    last_triggered: Option<Instant>,
}

impl CooldownGate {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown, last_triggered: None }
    }

    pub fn from_secs(secs: f64) -> Self {
        Self::new(secs_to_duration(secs))
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Picks up a reconfigured window without forgetting the last trigger.
    pub fn set_cooldown_secs(&mut self, secs: f64) {
        self.cooldown = secs_to_duration(secs);
    }

    pub fn last_triggered(&self) -> Option<Instant> {
        self.last_triggered
    }

    /// Whether a trigger at `now` would be permitted. Strictly more than
    /// `cooldown` must have elapsed since the last one.
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_triggered {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.cooldown,
        }
    }

    /// Record a trigger at `now` if permitted.
    pub fn try_trigger(&mut self, now: Instant) -> bool {
        if !self.ready(now) {
            return false;
        }
        self.last_triggered = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.last_triggered = None;
    }
}

/// Non-positive or NaN means no cooldown. Too large for `Duration` saturates.
fn secs_to_duration(secs: f64) -> Duration {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_first_trigger_always_allowed() {
        let mut gate = CooldownGate::from_secs(3.0);
        assert!(gate.try_trigger(Instant::now()));
    }

    #[test]
    fn test_cooldown_is_strict() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::from_secs(3.0);
        assert!(gate.try_trigger(t0));
        assert!(!gate.try_trigger(t0 + Duration::from_secs(1)));
        assert!(!gate.try_trigger(t0 + Duration::from_secs(3)));
        assert!(gate.try_trigger(t0 + Duration::from_millis(3001)));
    }

    #[test]
    fn test_refusal_does_not_move_window() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::from_secs(2.0);
        gate.try_trigger(t0);
        gate.try_trigger(t0 + Duration::from_secs(1));
        assert_eq!(gate.last_triggered(), Some(t0));
    }

    #[test]
    fn test_never_two_triggers_within_cooldown() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = Instant::now();
        let cooldown = Duration::from_millis(1500);
        let mut gate = CooldownGate::new(cooldown);

        let mut times: Vec<u64> = (0..2000).map(|_| rng.gen_range(0..60_000)).collect();
        times.sort_unstable();

        let mut fired: Vec<Instant> = Vec::new();
        for ms in times {
            let now = base + Duration::from_millis(ms);
            if gate.try_trigger(now) {
                fired.push(now);
            }
        }
        assert!(fired.len() > 1);
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] > cooldown);
        }
    }

    #[test]
    fn test_out_of_order_time_is_refused() {
        let t0 = Instant::now() + Duration::from_secs(10);
        let mut gate = CooldownGate::from_secs(1.0);
        assert!(gate.try_trigger(t0));
        assert!(!gate.try_trigger(t0 - Duration::from_secs(5)));
    }

    #[test]
    fn test_huge_cooldown_saturates() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::from_secs(1e20);
        assert_eq!(gate.cooldown(), Duration::MAX);
        assert!(gate.try_trigger(t0));
        assert!(!gate.try_trigger(t0 + Duration::from_secs(86_400)));

        gate.set_cooldown_secs(f64::INFINITY);
        assert_eq!(gate.cooldown(), Duration::MAX);
        gate.set_cooldown_secs(f64::NAN);
        assert_eq!(gate.cooldown(), Duration::ZERO);
        gate.set_cooldown_secs(-2.0);
        assert_eq!(gate.cooldown(), Duration::ZERO);
    }
}
