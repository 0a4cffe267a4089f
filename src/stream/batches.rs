//! Fixed-size batching over a row stream, and the age filter built on it.
use super::rows::{stream_rows, RowStream};
use crate::core::db::Server;
use crate::core::{ProdevError, Result};
use crate::record::Record;
use std::vec;
use tracing::debug;

/// Groups a row stream into batches of `batch_size` items.
///
/// Every batch is full except possibly the last. If the source fails, the
/// rows gathered so far come out as one short batch, then the error, then
/// nothing.
pub struct BatchStream<I> {
    rows: I,
    batch_size: usize,
    pending_error: Option<ProdevError>,
    done: bool,
}

impl<I, T> Iterator for BatchStream<I>
where
    I: Iterator<Item = Result<T>>,
{
    type Item = Result<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }
        if self.done {
            return None;
        }
        if self.batch_size == 0 {
            self.done = true;
            return Some(Err(ProdevError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            )));
        }

        let mut batch = Vec::with_capacity(self.batch_size.min(1024));
        while batch.len() < self.batch_size {
            match self.rows.next() {
                Some(Ok(row)) => batch.push(row),
                Some(Err(e)) => {
                    self.done = true;
                    if batch.is_empty() {
                        return Some(Err(e));
                    }
                    self.pending_error = Some(e);
                    break;
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            debug!(size = batch.len(), "batch ready");
            Some(Ok(batch))
        }
    }
}

/// Wraps any fallible row iterator into a [`BatchStream`].
pub fn batches<I, T>(rows: I, batch_size: usize) -> BatchStream<I::IntoIter>
where
    I: IntoIterator<Item = Result<T>>,
{
    BatchStream {
        rows: rows.into_iter(),
        batch_size,
        pending_error: None,
        done: false,
    }
}

/// Opens a connection and lends `consume` the user records in batches of `batch_size`.
pub fn stream_batches<R, F>(server: &Server, batch_size: usize, consume: F) -> R
where
    F: FnOnce(BatchStream<RowStream<'_, Record>>) -> R,
{
    stream_rows(server, |rows| consume(batches(rows, batch_size)))
}

/// Records older than `threshold`, flattened out of a batch stream in source order.
pub struct AgesOver<I> {
    batches: I,
    current: vec::IntoIter<Record>,
    threshold: u32,
}

impl<I> Iterator for AgesOver<I>
where
    I: Iterator<Item = Result<Vec<Record>>>,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.current.find(|r| r.age > self.threshold) {
                return Some(Ok(record));
            }
            match self.batches.next()? {
                Ok(batch) => self.current = batch.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub fn ages_over<I>(batches: I, threshold: u32) -> AgesOver<I::IntoIter>
where
    I: IntoIterator<Item = Result<Vec<Record>>>,
{
    AgesOver {
        batches: batches.into_iter(),
        current: Vec::new().into_iter(),
        threshold,
    }
}
