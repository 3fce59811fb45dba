use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::engine::clock::Clock;
use crate::engine::display::{Display, DisplayFrame};

/// Runs [`Display::tick`] at a fixed rate on its own thread and publishes
/// the latest [`DisplayFrame`] for whoever draws it.
pub struct DisplayTimer {
    running: Arc<AtomicBool>,
    frame: Arc<Mutex<DisplayFrame>>,
    handle: Option<JoinHandle<()>>,
}

impl DisplayTimer {
    pub fn start(mut display: Display, refresh_hz: f64, clock: Arc<Clock>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let frame = Arc::new(Mutex::new(display.frame()));
        let period = Duration::from_secs_f64(1.0 / refresh_hz.clamp(1.0, 240.0));

        let thread_running = running.clone();
        let thread_frame = frame.clone();
        let handle = thread::spawn(move || {
            info!(refresh_hz, "display timer started");
            let mut next = Instant::now();
            while thread_running.load(Ordering::Relaxed) {
                if clock.take_spectrum_reset() {
                    display.clear_spectrum();
                }

                if display.tick(clock.get_sample_rate() as f64) {
                    if let Ok(mut latest) = thread_frame.lock() {
                        *latest = display.frame();
                    }
                }

                next += period;
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                } else {
                    debug!(behind_ms = (now - next).as_secs_f64() * 1000.0, "display tick overran");
                    next = now;
                }
            }
            debug!("display timer stopped");
        });

        Self {
            running,
            frame,
            handle: Some(handle),
        }
    }

    /// Most recently published frame.
    pub fn latest(&self) -> DisplayFrame {
        self.frame.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("display thread panicked");
            }
        }
    }
}

impl Drop for DisplayTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_survives_a_panicked_display_thread() {
        let mut timer = DisplayTimer {
            running: Arc::new(AtomicBool::new(true)),
            frame: Arc::new(Mutex::new(DisplayFrame::default())),
            handle: Some(thread::spawn(|| panic!("display tick failed"))),
        };
        timer.stop();
        assert!(timer.handle.is_none());
        assert!(!timer.running.load(Ordering::Relaxed));
        assert_eq!(timer.latest(), DisplayFrame::default());
    }
}
