use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Work the background loops hand back to the UI thread. The loops never
/// touch tracker state themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Refresh,
    Milestone,
}

// How often a sleeping loop re-checks the running flag
const SLICE: Duration = Duration::from_millis(100);

/// Sends `tick` every `interval` until `running` is cleared or the receiver
/// goes away. With `immediate` the first tick is sent before the first sleep.
pub fn spawn_ticker(
    tick: Tick,
    interval: Duration,
    immediate: bool,
    running: Arc<AtomicBool>,
    tx: Sender<Tick>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        if immediate && tx.send(tick).is_err() {
            return;
        }
        while running.load(Ordering::Relaxed) {
            let deadline = Instant::now() + interval;
            while running.load(Ordering::Relaxed) && Instant::now() < deadline {
                thread::sleep(SLICE.min(deadline.saturating_duration_since(Instant::now())));
            }
            if !running.load(Ordering::Relaxed) {
                break;
            }
            if tx.send(tick).is_err() {
                break;
            }
        }
        debug!("{:?} loop stopped", tick);
    })
}

/// The refresh and milestone loops, stopped together.
pub struct Timers {
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Timers {
    pub fn start(refresh: Duration, milestone: Duration, tx: Sender<Tick>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let handles = vec![
            spawn_ticker(Tick::Refresh, refresh, false, running.clone(), tx.clone()),
            spawn_ticker(Tick::Milestone, milestone, true, running.clone(), tx),
        ];
        Self { running, handles }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_ticks_arrive_on_channel() {
        let (tx, rx) = mpsc::channel();
        let timers = Timers::start(Duration::from_millis(20), Duration::from_secs(60), tx);

        // Milestone fires immediately, refresh after its interval
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, Tick::Milestone);
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(second, Tick::Refresh);
        timers.stop();
    }

    #[test]
    fn test_stop_is_prompt() {
        let (tx, _rx) = mpsc::channel();
        let timers = Timers::start(Duration::from_secs(3600), Duration::from_secs(3600), tx);
        let started = Instant::now();
        timers.stop();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_loop_exits_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let running = Arc::new(AtomicBool::new(true));
        let handle = spawn_ticker(Tick::Refresh, Duration::from_millis(5), true, running, tx);
        handle.join().unwrap();
    }
}
