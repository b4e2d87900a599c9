// ai
//! 📬 ConnectorBuffer — a bounded, ordered queue shared by exactly two stages.
//!
//! Built on `async_channel::bounded`, same as the worker channels everywhere else in this crate.
//! Capacity zero is bumped to one: `async_channel` has no rendezvous mode.

use std::time::Duration;

use async_channel::{Receiver, Sender, TryRecvError};
use thiserror::Error;

/// 🚧 Why a write did not land.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferWriteError {
    #[error("no space freed up within {0:?}")]
    Timeout(Duration),
    #[error("the buffer is closed")]
    Closed,
}

/// 📬 Bounded FIFO of records between a connector and the downstream reader.
#[derive(Debug)]
pub struct ConnectorBuffer<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

impl<T> Clone for ConnectorBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> ConnectorBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = async_channel::bounded(capacity);
        Self { tx, rx, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// ⏳ Block until there is room, up to `timeout`.
    pub async fn write(&self, record: T, timeout: Duration) -> Result<(), BufferWriteError> {
        match tokio::time::timeout(timeout, self.tx.send(record)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(BufferWriteError::Closed),
            Err(_) => Err(BufferWriteError::Timeout(timeout)),
        }
    }

    /// 📦 Wait for one record, then grab whatever else is already queued, up to `max` total.
    /// `None` once the buffer is closed and drained.
    pub async fn read_batch(&self, max: usize) -> Option<Vec<T>> {
        let first = self.rx.recv().await.ok()?;
        let mut batch = Vec::with_capacity(max.clamp(1, self.capacity.max(1)));
        batch.push(first);
        while batch.len() < max {
            match self.rx.try_recv() {
                Ok(record) => batch.push(record),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        Some(batch)
    }

    /// 🔒 No more writes. Readers still drain what is queued.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_records_come_out_in_the_order_they_went_in() {
        let buffer = ConnectorBuffer::new(8);
        for n in 0..5 {
            buffer.write(n, Duration::from_secs(1)).await.expect("💀 write");
        }
        assert_eq!(buffer.read_batch(3).await, Some(vec![0, 1, 2]));
        assert_eq!(buffer.read_batch(10).await, Some(vec![3, 4]));
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_full_buffer_times_out_the_writer() {
        let buffer = ConnectorBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.write("first", Duration::from_millis(5)).await.expect("💀 fits");
        let outcome = buffer.write("second", Duration::from_millis(50)).await;
        assert_eq!(outcome, Err(BufferWriteError::Timeout(Duration::from_millis(50))));
    }

    #[tokio::test]
    async fn the_one_where_closing_drains_then_ends() {
        let buffer = ConnectorBuffer::new(4);
        buffer.write(1, Duration::from_secs(1)).await.expect("💀 write");
        assert!(buffer.close());
        assert!(buffer.is_closed());
        assert_eq!(
            buffer.write(2, Duration::from_secs(1)).await,
            Err(BufferWriteError::Closed)
        );
        assert_eq!(buffer.read_batch(10).await, Some(vec![1]));
        assert_eq!(buffer.read_batch(10).await, None);
    }
}
