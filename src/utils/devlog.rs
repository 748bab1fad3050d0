//! Per-operation trace lines. Reads, writes, aggregations and index builds each emit one JSON
//! object under [`DEV_TARGET`]; a [`Capture`] collects the lines of the current thread.

use serde_json::Value;
use std::cell::RefCell;

pub const DEV_TARGET: &str = "bookshelf::dev";

thread_local! {
    static CAPTURED: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Collects trace lines emitted on this thread until dropped.
#[derive(Debug)]
pub struct Capture(());

impl Capture {
    #[must_use]
    pub fn start() -> Self {
        CAPTURED.with(|c| *c.borrow_mut() = Some(Vec::new()));
        Self(())
    }

    /// Lines emitted since the last call, parsed. Lines that are not JSON are skipped.
    #[must_use]
    pub fn take(&self) -> Vec<Value> {
        let lines = CAPTURED.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default());
        lines.iter().filter_map(|l| serde_json::from_str(l).ok()).collect()
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        CAPTURED.with(|c| *c.borrow_mut() = None);
    }
}

#[doc(hidden)]
pub fn emit(line: String) {
    log::debug!(target: DEV_TARGET, "{line}");
    CAPTURED.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(line);
        }
    });
}

#[macro_export]
macro_rules! devlog {
    ($($arg:tt)*) => {
        $crate::utils::devlog::emit(format!($($arg)*))
    };
}
