//! Thread-safe camera access and the latest-frame mailbox.

use boardwatch_core::RgbImage;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pull-based frame producer, e.g. a camera driver or a file sequence.
pub trait FrameSource {
    /// Next frame, or `None` if the device had nothing usable.
    fn read(&mut self) -> Option<RgbImage>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Option<RgbImage>,
{
    fn read(&mut self) -> Option<RgbImage> {
        self()
    }
}

/// Single-slot, overwrite-on-write frame cell.
#[derive(Debug, Default)]
pub struct LatestFrame {
    slot: Mutex<Option<Arc<RgbImage>>>,
}

impl LatestFrame {
    pub fn publish(&self, frame: Arc<RgbImage>) {
        *self.slot.lock() = Some(frame);
    }

    pub fn get(&self) -> Option<Arc<RgbImage>> {
        self.slot.lock().clone()
    }
}

/// A frame source behind a mutex, shared by the background reader and
/// turn transitions.
pub struct Camera<S> {
    source: Mutex<S>,
    latest: LatestFrame,
}

impl<S: FrameSource> Camera<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Mutex::new(source),
            latest: LatestFrame::default(),
        }
    }

    /// Read one frame and publish it.
    pub fn read(&self) -> Option<Arc<RgbImage>> {
        let mut source = self.source.lock();
        self.read_locked(&mut source)
    }

    fn read_locked(&self, source: &mut S) -> Option<Arc<RgbImage>> {
        let frame = Arc::new(source.read()?);
        self.latest.publish(Arc::clone(&frame));
        Some(frame)
    }

    /// Most recently published frame without touching the device.
    pub fn latest(&self) -> Option<Arc<RgbImage>> {
        self.latest.get()
    }

    /// Up to `count` frames read back to back with `delay` between attempts.
    ///
    /// The source stays locked for the whole burst. Failed reads are
    /// skipped, so fewer frames than requested may come back.
    pub fn burst(&self, count: usize, delay: Duration) -> Vec<Arc<RgbImage>> {
        let mut source = self.source.lock();
        let mut frames = Vec::with_capacity(count);
        for i in 0..count {
            match self.read_locked(&mut source) {
                Some(f) => frames.push(f),
                None => log::debug!("capture: burst frame {i} failed"),
            }
            if i + 1 < count && !delay.is_zero() {
                thread::sleep(delay);
            }
        }
        frames
    }
}

/// Background reader thread; stops and joins on [`ReaderHandle::stop`] or drop.
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(t) = self.thread.take() {
            if t.join().is_err() {
                log::warn!("capture: reader thread panicked");
            }
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Keep `camera.latest()` fresh by reading every `interval`.
pub fn spawn_reader<S>(camera: Arc<Camera<S>>, interval: Duration) -> ReaderHandle
where
    S: FrameSource + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let thread = thread::spawn(move || {
        while !flag.load(Ordering::Acquire) {
            if camera.read().is_none() {
                log::debug!("capture: reader got no frame");
            }
            thread::sleep(interval);
        }
    });
    ReaderHandle {
        stop,
        thread: Some(thread),
    }
}
