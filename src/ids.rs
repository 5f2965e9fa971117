use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh uuids for copied nodes
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 uuids, used outside of tests
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV4Generator;

impl IdGenerator for UuidV4Generator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Predictable ids (`<prefix>-1`, `<prefix>-2`, ...) for scripted runs
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let next = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, next)
    }
}
