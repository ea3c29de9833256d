/// Time source for note timestamps, in milliseconds since epoch.
/// Injected so tests can pin the clock.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Source of opaque unique note ids.
pub trait IdGenerator {
    fn next_id(&mut self, title: &str) -> String;
}

/// Hashes the title together with a nanosecond timestamp, so two notes with
/// the same title still get distinct ids.
pub struct HashIdGenerator;

impl IdGenerator for HashIdGenerator {
    fn next_id(&mut self, title: &str) -> String {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
        format!("{:x}", md5::compute(format!("{}{}", title, nanos)))
    }
}
