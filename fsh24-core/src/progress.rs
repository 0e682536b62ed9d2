use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_secs(5);

/// Optional stderr ticker for long batches. Counters are atomics; a disabled
/// instance ignores `start` and prints nothing.
#[derive(Clone)]
pub struct Progress {
    enabled: bool,
    pub stage: Arc<Mutex<String>>,
    pub files_done: Arc<AtomicUsize>,
    pub files_total: Arc<AtomicUsize>,
    pub bytes_done: Arc<AtomicU64>,
    pub bytes_total: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            stage: Arc::new(Mutex::new(String::new())),
            files_done: Arc::new(AtomicUsize::new(0)),
            files_total: Arc::new(AtomicUsize::new(0)),
            bytes_done: Arc::new(AtomicU64::new(0)),
            bytes_total: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Inert reporter for library callers that do not want output.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn set_stage(&self, s: &str) {
        if !self.enabled {
            return;
        }
        if let Ok(mut stage) = self.stage.lock() {
            *stage = s.to_string();
        }
    }
    pub fn set_files_total(&self, n: usize) {
        self.files_total.store(n, Ordering::Relaxed);
        self.files_done.store(0, Ordering::Relaxed);
    }
    pub fn inc_file(&self) {
        self.files_done.fetch_add(1, Ordering::Relaxed);
    }
    pub fn reset_bytes(&self, total: u64) {
        self.bytes_total.store(total, Ordering::Relaxed);
        self.bytes_done.store(0, Ordering::Relaxed);
    }
    pub fn add_bytes(&self, n: u64) {
        self.bytes_done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn start(&self) {
        if !self.enabled {
            return;
        }
        self.running.store(true, Ordering::Relaxed);
        let this = self.clone();
        thread::spawn(move || {
            let t0 = Instant::now();
            while this.running.load(Ordering::Relaxed) {
                thread::sleep(TICK);
                if !this.running.load(Ordering::Relaxed) {
                    break;
                }
                eprintln!("[{:>4}s] {}", t0.elapsed().as_secs(), this.status_line());
            }
        });
    }
    pub fn stop(&self) {
        if self.enabled {
            self.running.store(false, Ordering::Relaxed);
        }
    }

    pub fn status_line(&self) -> String {
        let stage = self.stage.lock().map(|s| s.clone()).unwrap_or_default();
        let fd = self.files_done.load(Ordering::Relaxed);
        let ft = self.files_total.load(Ordering::Relaxed);
        let bd = self.bytes_done.load(Ordering::Relaxed);
        let bt = self.bytes_total.load(Ordering::Relaxed);
        if bt > 0 {
            let bpct = (bd as f64 / bt as f64) * 100.0;
            format!("{} | files {}/{} | sampled {}%", stage, fd, ft, bpct as i32)
        } else {
            format!("{} | files {}/{} | sampled {} MiB", stage, fd, ft, bd >> 20)
        }
    }
}
