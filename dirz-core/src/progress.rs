use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

/// Shared file/byte counters with an optional background ticker that logs
/// them periodically. Cloning shares the counters.
#[derive(Clone, Debug)]
pub struct Progress {
    enabled: bool,
    interval: Duration,
    stage: Arc<Mutex<String>>,
    files_done: Arc<AtomicUsize>,
    files_total: Arc<AtomicUsize>,
    bytes_done: Arc<AtomicU64>,
    bytes_total: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self::with_interval(enabled, Duration::from_secs(5))
    }

    pub fn with_interval(enabled: bool, interval: Duration) -> Self {
        Self {
            enabled,
            interval,
            stage: Arc::new(Mutex::new(String::new())),
            files_done: Arc::new(AtomicUsize::new(0)),
            files_total: Arc::new(AtomicUsize::new(0)),
            bytes_done: Arc::new(AtomicU64::new(0)),
            bytes_total: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enter a new stage and reset the counters to the given totals.
    pub fn begin(&self, stage: &str, files: usize, bytes: u64) {
        *self.stage.lock().unwrap_or_else(|p| p.into_inner()) = stage.to_string();
        self.files_total.store(files, Ordering::Relaxed);
        self.files_done.store(0, Ordering::Relaxed);
        self.bytes_total.store(bytes, Ordering::Relaxed);
        self.bytes_done.store(0, Ordering::Relaxed);
    }

    pub fn file_done(&self, bytes: u64) {
        self.files_done.fetch_add(1, Ordering::Relaxed);
        self.bytes_done.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn files_done(&self) -> usize {
        self.files_done.load(Ordering::Relaxed)
    }

    pub fn bytes_done(&self) -> u64 {
        self.bytes_done.load(Ordering::Relaxed)
    }

    pub fn start(&self) {
        if !self.enabled || self.running.swap(true, Ordering::Relaxed) {
            return;
        }
        // A ticker from an earlier start() may still be asleep; it retires on
        // waking because its generation is stale.
        let epoch = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let me = self.clone();
        thread::spawn(move || {
            let t0 = Instant::now();
            while me.ticker_alive(epoch) {
                thread::sleep(me.interval);
                if !me.ticker_alive(epoch) {
                    break;
                }
                let stage = me.stage.lock().unwrap_or_else(|p| p.into_inner()).clone();
                let bt = me.bytes_total.load(Ordering::Relaxed);
                let bpct = if bt > 0 { me.bytes_done() as f64 / bt as f64 * 100.0 } else { 0.0 };
                tracing::info!(
                    elapsed_s = t0.elapsed().as_secs(),
                    "{} | files {}/{} | bytes {}%",
                    stage,
                    me.files_done(),
                    me.files_total.load(Ordering::Relaxed),
                    bpct as i32
                );
            }
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    fn ticker_alive(&self, epoch: u64) -> bool {
        self.running.load(Ordering::Relaxed) && self.generation.load(Ordering::SeqCst) == epoch
    }
}
