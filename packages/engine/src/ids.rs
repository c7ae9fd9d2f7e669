/// Source of fresh model ids.
///
/// Ids must be valid word characters only (`[A-Za-z0-9_]`) so they survive the
/// placeholder pattern and bare attribute selectors.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Prefix plus a monotonic counter, independent of wall-clock time
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    count: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            count: 0,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        self.count += 1;
        format!("{}{}", self.prefix, self.count)
    }
}
