//! Periodic frame sampling
//!
//! Pulls the latest frame from a source on a fixed interval and hands it to
//! a callback. Ticks are skipped while the stream has no frame yet, and late
//! ticks are dropped instead of bursting to catch up.

use crate::capture::{FrameSample, FrameSource};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct SamplerShared {
    armed: AtomicBool,
    /// Held for the duration of one callback
    busy: Mutex<()>,
    ticks: AtomicU64,
    processed: AtomicU64,
}

pub struct FrameSampler {
    interval: Duration,
    shared: Arc<SamplerShared>,
    task: Option<JoinHandle<()>>,
}

impl FrameSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            shared: Arc::new(SamplerShared::default()),
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Begin sampling `source`. A running sampler is stopped first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S, F>(&mut self, source: Arc<S>, mut on_frame: F)
    where
        S: FrameSource + ?Sized + 'static,
        F: FnMut(&FrameSample) + Send + 'static,
    {
        self.stop();

        // Fresh state so a callback from a previous run can never observe
        // the new run as armed
        let shared = Arc::new(SamplerShared::default());
        shared.armed.store(true, Ordering::SeqCst);
        self.shared = shared.clone();

        let period = self.interval;
        tracing::debug!("Frame sampler started ({}ms interval)", period.as_millis());

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let _busy = shared.busy.lock();
                if !shared.armed.load(Ordering::SeqCst) {
                    break;
                }
                shared.ticks.fetch_add(1, Ordering::Relaxed);

                // No frame yet while the camera warms up
                let Some(frame) = source.current_frame() else {
                    continue;
                };

                on_frame(&frame);
                shared.processed.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }

    /// Stop sampling. Once this returns the callback will not run again.
    ///
    /// Do not call from inside the callback itself.
    pub fn stop(&mut self) {
        self.shared.armed.store(false, Ordering::SeqCst);
        // Wait out an in-flight callback
        drop(self.shared.busy.lock());

        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(
                "Frame sampler stopped after {} frames",
                self.shared.processed.load(Ordering::Relaxed)
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some() && self.shared.armed.load(Ordering::SeqCst)
    }

    /// Frames handed to the callback in the current or last run
    pub fn processed_frames(&self) -> u64 {
        self.shared.processed.load(Ordering::Relaxed)
    }

    /// Ticks seen in the current or last run, including warm-up ticks
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLING_INTERVAL)
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic::render_face_frame;

    #[derive(Default)]
    struct StubSource {
        frame: Mutex<Option<FrameSample>>,
    }

    impl FrameSource for StubSource {
        fn current_frame(&self) -> Option<FrameSample> {
            self.frame.lock().clone()
        }
    }

    const TICK: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn test_warmup_ticks_do_nothing() {
        let source = Arc::new(StubSource::default());
        let calls = Arc::new(AtomicU64::new(0));

        let mut sampler = FrameSampler::new(TICK);
        let counter = calls.clone();
        sampler.start(source.clone(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(sampler.ticks() > 0);
        assert_eq!(sampler.processed_frames(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // Frames arrive once the camera is ready
        *source.frame.lock() = Some(render_face_frame(32, 24, Some((0.0, 0.0))));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(calls.load(Ordering::SeqCst) > 0);

        sampler.stop();
    }

    #[tokio::test]
    async fn test_no_callback_after_stop() {
        let source = Arc::new(StubSource::default());
        *source.frame.lock() = Some(render_face_frame(32, 24, Some((0.0, 0.0))));
        let calls = Arc::new(AtomicU64::new(0));

        let mut sampler = FrameSampler::new(TICK);
        let counter = calls.clone();
        sampler.start(source, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(sampler.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        sampler.stop();
        assert!(!sampler.is_running());

        let after_stop = calls.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_restart_resets_counters() {
        let source = Arc::new(StubSource::default());
        *source.frame.lock() = Some(render_face_frame(32, 24, None));

        let mut sampler = FrameSampler::new(TICK);
        sampler.start(source.clone(), |_| {});
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sampler.processed_frames() > 0);

        sampler.start(source, |_| {});
        assert_eq!(sampler.processed_frames(), 0);
        assert!(sampler.is_running());
        sampler.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut sampler = FrameSampler::default();
        sampler.stop();
        sampler.stop();
        assert!(!sampler.is_running());
        assert_eq!(sampler.interval(), DEFAULT_SAMPLING_INTERVAL);
    }
}
