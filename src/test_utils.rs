//! Shared fixtures for loop and control tests.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::subscription::OutputSink;

/// Output sink that collects written lines in memory, optionally failing
/// after a fixed number of successful writes. Clones share the same
/// backing store, so a clone kept by the test doubles as a probe.
#[derive(Clone)]
pub struct CollectSink {
    lines: Arc<Mutex<Vec<String>>>,
    fail_after: Option<usize>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self {
            lines: Arc::new(Mutex::new(Vec::new())),
            fail_after: None,
        }
    }

    pub fn failing_after(writes: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(Vec::new())),
            fail_after: Some(writes),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl OutputSink for CollectSink {
    fn write_line(&mut self, value: &str) -> io::Result<()> {
        let mut lines = self.lines.lock().unwrap();
        if self.fail_after.is_some_and(|limit| lines.len() >= limit) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink full"));
        }
        lines.push(value.to_string());
        Ok(())
    }
}

/// Wait until `condition` holds, panicking after a bound well above any
/// poll timeout used in the tests.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}
