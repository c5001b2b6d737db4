use crate::{Record, Result};
use async_trait::async_trait;

/// A lazy, finite, single-pass sequence of records.
///
/// Records arrive already typed and filtered; once `next_record` returns
/// `Ok(None)` the source is spent.
#[async_trait]
pub trait RecordSource: Send {
    type Item: Record;

    async fn next_record(&mut self) -> Result<Option<Self::Item>>;

    /// Total number of records, if known up front. Used for percent and ETA.
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

/// Adapts any iterator into a `RecordSource`.
pub struct IterSource<I> {
    iter: I,
    total: Option<u64>,
}

impl<I> IterSource<I>
where
    I: Iterator + Send,
    I::Item: Record,
{
    pub fn new(iter: I) -> Self {
        Self { iter, total: None }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }
}

impl<R: Record> IterSource<std::vec::IntoIter<R>> {
    /// Source over an in-memory list. The total is known.
    pub fn from_vec(records: Vec<R>) -> Self {
        let total = records.len() as u64;
        Self::new(records.into_iter()).with_total(total)
    }
}

#[async_trait]
impl<I> RecordSource for IterSource<I>
where
    I: Iterator + Send,
    I::Item: Record,
{
    type Item = I::Item;

    async fn next_record(&mut self) -> Result<Option<Self::Item>> {
        Ok(self.iter.next())
    }

    fn size_hint(&self) -> Option<u64> {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Row;

    #[tokio::test]
    async fn test_iter_source_is_single_pass() {
        let mut source = IterSource::from_vec(vec![Row::new("id", "a"), Row::new("id", "b")]);
        assert_eq!(source.size_hint(), Some(2));

        let first = source.next_record().await.unwrap().unwrap();
        let second = source.next_record().await.unwrap().unwrap();
        assert_eq!(first.natural_key(), "a");
        assert_eq!(second.natural_key(), "b");

        assert!(source.next_record().await.unwrap().is_none());
        assert!(source.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unbounded_iterator_has_no_total() {
        let source = IterSource::new((0..3).map(|i| Row::new("id", i.to_string())));
        assert_eq!(source.size_hint(), None);
    }
}
