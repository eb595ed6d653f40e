use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Fixed settle delay between input events.
pub fn settle(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Sleep for `dur` unless a stop signal arrives first.
/// Returns true when the caller should stop (signal received or sender dropped).
pub fn wait_or_stop(stop: &Receiver<()>, dur: Duration) -> bool {
    match stop.recv_timeout(dur) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    #[test]
    fn test_wait_times_out() {
        let (_tx, rx) = mpsc::channel::<()>();
        let start = Instant::now();
        assert!(!wait_or_stop(&rx, Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_wakes_on_signal() {
        let (tx, rx) = mpsc::channel();
        tx.send(()).unwrap();
        let start = Instant::now();
        assert!(wait_or_stop(&rx, Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_stops_when_sender_dropped() {
        let (tx, rx) = mpsc::channel::<()>();
        drop(tx);
        assert!(wait_or_stop(&rx, Duration::from_secs(5)));
    }
}
