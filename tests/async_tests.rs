//! Integration tests for the async queue consumer.
//!
//! These tests verify that a Tokio task can drain what a synchronous
//! producer pushes into a bounded queue.

#![cfg(feature = "async")]

mod common;

use std::io::Write;
use std::sync::Arc;
use std::thread;

use common::pattern;
use spanio::streaming::{AsyncQueueReader, BufferQueue, QueueConfig, SynchronizedWriter};
use tokio::io::AsyncReadExt;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawned_producer_roundtrip() {
    let data = pattern(200_000);
    let expected = data.clone();
    let config = QueueConfig::new().max_memory_usage(8192).chunk_size(1000);

    let mut reader = AsyncQueueReader::spawn(&config, move |out| {
        out.write_all(&data)?;
        Ok(())
    })
    .unwrap();

    let mut received = Vec::new();
    reader.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn test_reader_over_external_producer() {
    let queue = Arc::new(BufferQueue::new(1024));
    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut writer = SynchronizedWriter::with_chunk_size(Arc::clone(&queue), 100).unwrap();
            writer.write_all(&pattern(5000)).unwrap();
            queue.notify_finished();
        })
    };

    let mut reader = AsyncQueueReader::new(queue);
    let mut received = Vec::new();
    let mut buf = [0u8; 64];
    loop {
        let n = reader.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        received.extend_from_slice(&buf[..n]);
    }
    producer.join().unwrap();
    assert_eq!(received, pattern(5000));
}

#[tokio::test]
async fn test_producer_failure_is_reported() {
    let config = QueueConfig::new().max_memory_usage(4096).chunk_size(512);
    let mut reader = AsyncQueueReader::spawn(&config, |out| {
        out.write_all(b"some bytes")?;
        Err(spanio::Error::ProducerFailed("truncated input".into()))
    })
    .unwrap();

    let mut head = [0u8; 10];
    reader.read_exact(&mut head).await.unwrap();
    assert_eq!(&head, b"some bytes");

    let err = reader.read(&mut [0u8; 8]).await.unwrap_err();
    assert!(err.to_string().contains("truncated input"));
}

#[tokio::test]
async fn test_early_drop_releases_producer() {
    let config = QueueConfig::new().max_memory_usage(256).chunk_size(64);
    let mut reader = AsyncQueueReader::spawn(&config, |out| {
        out.write_all(&pattern(1 << 20))?;
        Ok(())
    })
    .unwrap();

    let mut head = [0u8; 16];
    reader.read_exact(&mut head).await.unwrap();
    let queue = Arc::clone(reader.queue());
    drop(reader);

    assert!(queue.is_cancelled());
    // The producer's next write fails and the queue is finished.
    tokio::task::spawn_blocking(move || {
        while !queue.is_finished() {
            thread::sleep(std::time::Duration::from_millis(5));
        }
    })
    .await
    .unwrap();
}
