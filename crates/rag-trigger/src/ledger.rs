//! Process-local record of files already handed to the mover
//!
//! Guards against duplicate deliveries seen by the same instance only. The set
//! is not persisted and is lost on restart; concurrent instances each hold
//! their own copy.

use dashmap::DashSet;

use crate::types::FileIdentifier;

/// In-memory set of processed (bucket, name, metageneration) keys
#[derive(Debug, Default)]
pub struct ProcessedFileLedger {
    seen: DashSet<FileIdentifier>,
}

impl ProcessedFileLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &FileIdentifier) -> bool {
        self.seen.contains(id)
    }

    /// Record a key. Returns `false` if it was already present.
    pub fn record(&self, id: FileIdentifier) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str, metageneration: &str) -> FileIdentifier {
        FileIdentifier {
            bucket: "raw".to_string(),
            name: name.to_string(),
            metageneration: metageneration.to_string(),
        }
    }

    #[test]
    fn test_record_once() {
        let ledger = ProcessedFileLedger::new();
        assert!(!ledger.contains(&id("doc.pdf", "1")));
        assert!(ledger.record(id("doc.pdf", "1")));
        assert!(!ledger.record(id("doc.pdf", "1")));
        assert!(ledger.contains(&id("doc.pdf", "1")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_metageneration_is_part_of_key() {
        let ledger = ProcessedFileLedger::new();
        ledger.record(id("doc.pdf", "1"));
        assert!(!ledger.contains(&id("doc.pdf", "2")));
    }

    #[test]
    fn test_concurrent_record_has_one_winner() {
        let ledger = ProcessedFileLedger::new();

        let winners = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| ledger.record(id("doc.pdf", "1"))))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count()
        });

        assert_eq!(winners, 1);
        assert_eq!(ledger.len(), 1);
    }
}
