use tracing::info;

const REPORT_EVERY: u64 = 10_000;

// row-count based so it behaves the same on non-tty output
pub struct Progress {
    message: String,
    total_processed: u64,
}

impl Progress {
    pub fn new(message: String) -> Self {
        Self {
            message,
            total_processed: 0,
        }
    }

    pub fn update(&mut self) {
        self.total_processed += 1;
        if self.total_processed % REPORT_EVERY == 0 {
            info!("{}: {} rows processed", self.message, self.total_processed);
        }
    }

    pub fn finish(&self) {
        info!("{}: done, {} rows total", self.message, self.total_processed);
    }
}
