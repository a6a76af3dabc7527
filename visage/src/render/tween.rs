use std::fmt::{Display, Formatter};

use tokio::time::Instant;

use crate::animations::Easing;
use crate::pause;
use crate::render::TransitionHandle;
use crate::utils::task;

/// Drives a value from `from` to `to` over a duration, one frame at a time.
///
/// A ready-made transition engine for [`RenderTarget`](crate::render::RenderTarget) implementors:
/// [`run()`](Self::run) spawns the stepping task and returns the [`TransitionHandle`] to give back to
/// the core. The task honours pause (the time spent paused is not counted), resume and cancel.
///
/// # Example
/// ```
/// use visage::animations::Easing;
/// use visage::render::Tween;
///
/// #[visage::runtime]
/// async fn main() {
///     let handle = Tween::new(0.0, 0.8, 200)
///         .set_easing(Easing::QuadOut)
///         .run(|value| println!("AU12 = {}", value));
///     handle.finished().await;
/// }
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    from: f64,
    to: f64,
    /// Duration in milliseconds.
    duration: u64,
    /// Default: SineInOut.
    easing: Easing,
    /// Frames per second (default: 60).
    fps: u8,
}

impl Tween {
    pub fn new(from: f64, to: f64, duration: u64) -> Self {
        Self {
            from,
            to,
            duration,
            easing: Easing::default(),
            fps: 60,
        }
    }

    /// A tween that moves nothing: its handle completes after `duration` milliseconds.
    pub fn delay(duration: u64) -> TransitionHandle {
        Tween::new(0.0, 0.0, duration).run(|_| {})
    }

    pub fn set_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
    pub fn set_fps(mut self, fps: u8) -> Self {
        self.fps = fps.max(1);
        self
    }

    pub fn get_from(&self) -> f64 {
        self.from
    }
    pub fn get_to(&self) -> f64 {
        self.to
    }
    pub fn get_duration(&self) -> u64 {
        self.duration
    }
    pub fn get_easing(&self) -> Easing {
        self.easing
    }
    pub fn get_fps(&self) -> u8 {
        self.fps
    }

    /// The value at a given elapsed time (in milliseconds).
    pub fn value_at(&self, elapsed: u64) -> f64 {
        match self.duration {
            0 => self.to,
            duration => {
                let progress = elapsed as f64 / duration as f64;
                self.easing.interpolate(self.from, self.to, progress)
            }
        }
    }

    /// Runs the tween: `apply` receives every intermediate value, then `to` on completion.
    ///
    /// Outside a tokio runtime, the final value is applied at once and the returned handle is
    /// already completed.
    pub fn run<F>(self, mut apply: F) -> TransitionHandle
    where
        F: FnMut(f64) + Send + 'static,
    {
        let handle = TransitionHandle::new();

        if tokio::runtime::Handle::try_current().is_err() {
            log::debug!("{} applied at once: no runtime", self);
            apply(self.to);
            handle.complete();
            return handle;
        }

        let driver = handle.clone();
        let spawned = task::run(async move {
            let tick_ms = (1000 / self.fps.max(1) as u64).max(1);
            let mut started = Instant::now();
            loop {
                if driver.is_done() {
                    break;
                }
                if driver.is_paused() {
                    let paused_at = Instant::now();
                    driver.unpaused().await;
                    started += paused_at.elapsed();
                    continue;
                }

                let elapsed = started.elapsed().as_millis() as u64;
                if elapsed >= self.duration {
                    apply(self.to);
                    driver.complete();
                    break;
                }
                apply(self.value_at(elapsed));

                // Wait for the next tick.
                pause!(tick_ms.min(self.duration - elapsed));
            }
        });

        if let Err(error) = spawned {
            log::warn!("{} could not be spawned: {}", self, error);
            handle.cancel();
        }
        handle
    }
}

impl Display for Tween {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tween [{} to {} in {}ms, easing={:?}, fps={}]",
            self.from, self.to, self.duration, self.easing, self.fps
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::time::Duration;

    use super::*;

    #[test]
    fn test_tween_values() {
        let tween = Tween::new(0.2, 0.6, 100).set_easing(Easing::Linear);
        assert_eq!(tween.value_at(0), 0.2);
        assert!((tween.value_at(50) - 0.4).abs() < 1e-6);
        assert!((tween.value_at(100) - 0.6).abs() < 1e-6);
        assert!((tween.value_at(500) - 0.6).abs() < 1e-6);
        assert_eq!(Tween::new(0.0, 1.0, 0).value_at(0), 1.0);
        assert_eq!(
            tween.to_string(),
            "Tween [0.2 to 0.6 in 100ms, easing=Linear, fps=60]"
        );
    }

    #[test]
    fn test_tween_outside_runtime() {
        let values = Arc::new(Mutex::new(vec![]));
        let captured = values.clone();
        let handle = Tween::new(0.0, 0.5, 100).run(move |value| captured.lock().push(value));
        assert!(handle.is_done());
        assert_eq!(*values.lock(), vec![0.5]);
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_tween_runs_to_completion() {
        let values = Arc::new(Mutex::new(vec![]));
        let captured = values.clone();
        let handle = Tween::new(0.0, 1.0, 100)
            .set_fps(50)
            .run(move |value| captured.lock().push(value));

        pause!(50);
        assert!(!handle.is_done());
        handle.finished().await;
        assert!(!handle.is_cancelled());

        let values = values.lock();
        assert!(values.len() >= 3, "Intermediate values are applied");
        assert_eq!(values.last(), Some(&1.0));
        assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_tween_pause_and_cancel() {
        let values = Arc::new(Mutex::new(vec![]));
        let captured = values.clone();
        let handle = Tween::new(0.0, 1.0, 100).run(move |value| captured.lock().push(value));

        pause!(30);
        handle.pause();
        pause!(20);
        let frozen = values.lock().len();
        pause!(150);
        assert_eq!(values.lock().len(), frozen, "A paused tween does not step");
        assert!(!handle.is_done(), "Paused time is not counted");

        handle.cancel();
        handle.finished().await;
        pause!(30);
        assert_ne!(values.lock().last(), Some(&1.0), "A cancelled tween never lands");
    }

    #[serial_test::serial]
    #[visage_macros::test]
    async fn test_delay() {
        let start = Instant::now();
        Tween::delay(80).finished().await;
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
