use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

use crate::record::{ImageId, ImageRecord};
use crate::traits::Corpus;
use crate::{Error, Result};

/// In-memory image store.
///
/// Records are immutable once inserted; they can only be deleted. Snapshots
/// preserve insertion order, which is what ranking ties fall back to.
#[derive(Default)]
pub struct InMemoryCorpus {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    records: Vec<Arc<ImageRecord>>,
    index: AHashMap<ImageId, usize>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Insert a new record; fails if the id is already present
    pub fn insert(&self, record: ImageRecord) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&record.id) {
            return Err(Error::ImageExists(record.id.to_string()));
        }
        debug!(id = %record.id, objects = record.objects.len(), "corpus insert");
        let pos = inner.records.len();
        inner.index.insert(record.id.clone(), pos);
        inner.records.push(Arc::new(record));
        Ok(())
    }

    /// Insert many records, reporting each outcome separately
    pub fn insert_batch(&self, records: Vec<ImageRecord>) -> Vec<(ImageId, Result<()>)> {
        records
            .into_iter()
            .map(|record| {
                let id = record.id.clone();
                (id, self.insert(record))
            })
            .collect()
    }

    pub fn get(&self, id: &ImageId) -> Option<Arc<ImageRecord>> {
        let inner = self.inner.read();
        inner.index.get(id).map(|&pos| inner.records[pos].clone())
    }

    /// Delete a record by id. Returns whether it existed.
    pub fn delete(&self, id: &ImageId) -> bool {
        let mut inner = self.inner.write();
        let Some(pos) = inner.index.remove(id) else {
            return false;
        };
        inner.records.remove(pos);
        for slot in inner.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        true
    }

    pub fn ids(&self) -> Vec<ImageId> {
        self.inner.read().records.iter().map(|r| r.id.clone()).collect()
    }
}

impl Corpus for InMemoryCorpus {
    fn snapshot(&self) -> Vec<Arc<ImageRecord>> {
        self.inner.read().records.clone()
    }
}

impl FromIterator<ImageRecord> for InMemoryCorpus {
    fn from_iter<T: IntoIterator<Item = ImageRecord>>(iter: T) -> Self {
        let corpus = InMemoryCorpus::new();
        for record in iter {
            // Later duplicates lose
            let _ = corpus.insert(record);
        }
        corpus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let corpus = InMemoryCorpus::new();
        corpus.insert(ImageRecord::new("a", None)).unwrap();
        corpus.insert(ImageRecord::new("b", None)).unwrap();

        assert_eq!(corpus.count(), 2);
        assert!(corpus.get(&ImageId::from("a")).is_some());
        assert!(corpus.get(&ImageId::from("z")).is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let corpus = InMemoryCorpus::new();
        corpus.insert(ImageRecord::new("a", None)).unwrap();
        assert!(matches!(
            corpus.insert(ImageRecord::new("a", None)),
            Err(Error::ImageExists(_))
        ));
        assert_eq!(corpus.count(), 1);
    }

    #[test]
    fn test_delete_keeps_order() {
        let corpus: InMemoryCorpus = ["a", "b", "c", "d"]
            .into_iter()
            .map(|id| ImageRecord::new(id, None))
            .collect();

        assert!(corpus.delete(&ImageId::from("b")));
        assert!(!corpus.delete(&ImageId::from("b")));
        assert_eq!(
            corpus.ids(),
            vec![ImageId::from("a"), ImageId::from("c"), ImageId::from("d")]
        );
        assert_eq!(corpus.get(&ImageId::from("d")).unwrap().id, ImageId::from("d"));
    }

    #[test]
    fn test_snapshot_isolated_from_later_writes() {
        let corpus = InMemoryCorpus::new();
        corpus.insert(ImageRecord::new("a", None)).unwrap();
        let snapshot = corpus.snapshot();

        corpus.insert(ImageRecord::new("b", None)).unwrap();
        corpus.delete(&ImageId::from("a"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, ImageId::from("a"));
    }

    #[test]
    fn test_insert_batch_reports_each() {
        let corpus = InMemoryCorpus::new();
        let outcomes = corpus.insert_batch(vec![
            ImageRecord::new("a", None),
            ImageRecord::new("a", None),
            ImageRecord::new("b", None),
        ]);
        assert!(outcomes[0].1.is_ok());
        assert!(outcomes[1].1.is_err());
        assert!(outcomes[2].1.is_ok());
        assert_eq!(corpus.count(), 2);
    }
}
