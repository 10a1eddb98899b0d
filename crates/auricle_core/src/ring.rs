//! Lock-Free Sample Ring Buffer
//!
//! Single-producer/single-consumer bounded ring of f32 samples, the only
//! coupling between the capture and playback callbacks. Samples are stored
//! as f32 bit-patterns in `AtomicU32` slots; the read and write cursors
//! advance monotonically.
//!
//! # Overflow policy
//!
//! Overwrite-oldest: a push always succeeds and never blocks. When free
//! space is insufficient the producer advances the read cursor past the
//! oldest unread samples. Both sides CAS the read cursor, so a consumer
//! that raced an overwrite detects it and re-reads from the new position.
//! Underrun is not an error: popping from an empty ring reads zero samples.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

struct RingShared {
    slots: Box<[AtomicU32]>,
    /// Read cursor: samples below this are consumed (or overwritten).
    head: AtomicUsize,
    /// Write cursor: samples below this are published.
    tail: AtomicUsize,
}

impl RingShared {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail - head
    }
}

/// Fixed-capacity SPSC sample ring.
pub struct SampleRing;

impl SampleRing {
    /// Create a ring holding `capacity` samples, returning the two
    /// single-role endpoints.
    pub fn with_capacity(capacity: usize) -> (Producer, Consumer) {
        assert!(capacity > 0, "ring capacity must be non-zero");
        let shared = Arc::new(RingShared {
            slots: (0..capacity).map(|_| AtomicU32::new(0)).collect(),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        });
        (
            Producer {
                shared: Arc::clone(&shared),
            },
            Consumer { shared },
        )
    }
}

/// Capture-side endpoint.
pub struct Producer {
    shared: Arc<RingShared>,
}

impl Producer {
    /// Push all samples, overwriting the oldest unread data if the ring is
    /// full. Returns the number of unread samples that were dropped.
    /// Never blocks, never allocates.
    pub fn push(&mut self, data: &[f32]) -> usize {
        let capacity = self.shared.capacity();
        let mut dropped = 0;

        // A burst larger than the ring keeps only its newest samples.
        let data = if data.len() > capacity {
            dropped += data.len() - capacity;
            &data[data.len() - capacity..]
        } else {
            data
        };

        let tail = self.shared.tail.load(Ordering::Relaxed);
        let target = tail + data.len();

        // Claim space before writing: push the read cursor past whatever
        // would be overwritten, so the consumer can tell.
        loop {
            let head = self.shared.head.load(Ordering::Acquire);
            if target <= head + capacity {
                break;
            }
            let new_head = target - capacity;
            match self.shared.head.compare_exchange(
                head,
                new_head,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    dropped += new_head - head;
                    break;
                }
                // The consumer advanced the cursor meanwhile; re-check.
                Err(_) => continue,
            }
        }

        for (offset, &sample) in data.iter().enumerate() {
            self.shared.slots[(tail + offset) % capacity].store(sample.to_bits(), Ordering::Relaxed);
        }
        self.shared.tail.store(target, Ordering::Release);

        dropped
    }

    /// Samples currently readable.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

/// Playback-side endpoint.
pub struct Consumer {
    shared: Arc<RingShared>,
}

impl Consumer {
    /// Pop up to `out.len()` samples in FIFO order. Returns the count
    /// actually read; an empty ring reads zero samples (short read, never
    /// blocks).
    pub fn pop(&mut self, out: &mut [f32]) -> usize {
        let capacity = self.shared.capacity();
        loop {
            let head = self.shared.head.load(Ordering::Acquire);
            let tail = self.shared.tail.load(Ordering::Acquire);
            let count = (tail - head).min(out.len());
            if count == 0 {
                return 0;
            }

            for (offset, slot) in out.iter_mut().enumerate().take(count) {
                *slot = f32::from_bits(
                    self.shared.slots[(head + offset) % capacity].load(Ordering::Relaxed),
                );
            }

            // Committing the read fails iff the producer overwrote part of
            // the span we just copied; start over from the new cursor.
            if self
                .shared
                .head
                .compare_exchange(head, head + count, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return count;
            }
        }
    }

    /// Samples currently readable.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_identity() {
        let (mut producer, mut consumer) = SampleRing::with_capacity(64);
        let input: Vec<f32> = (0..48).map(|i| i as f32 * 0.25).collect();

        assert_eq!(producer.push(&input), 0);
        assert_eq!(consumer.len(), 48);

        let mut output = vec![0.0; 48];
        assert_eq!(consumer.pop(&mut output), 48);
        assert_eq!(input, output);
        assert!(consumer.is_empty());
    }

    #[test]
    fn short_read_reports_available_count() {
        let (mut producer, mut consumer) = SampleRing::with_capacity(32);
        producer.push(&[1.0, 2.0, 3.0]);

        let mut output = [0.0; 8];
        let read = consumer.pop(&mut output);
        assert_eq!(read, 3);
        assert_eq!(&output[..3], &[1.0, 2.0, 3.0]);

        // Empty ring: zero samples, no blocking.
        assert_eq!(consumer.pop(&mut output), 0);
    }

    #[test]
    fn overflow_overwrites_oldest() {
        let (mut producer, mut consumer) = SampleRing::with_capacity(8);
        let first: Vec<f32> = (1..=8).map(|i| i as f32).collect();
        assert_eq!(producer.push(&first), 0);

        // Two more samples: 1.0 and 2.0 are the oldest and must go.
        assert_eq!(producer.push(&[9.0, 10.0]), 2);

        let mut output = [0.0; 8];
        assert_eq!(consumer.pop(&mut output), 8);
        let expected: Vec<f32> = (3..=10).map(|i| i as f32).collect();
        assert_eq!(&output[..], &expected[..]);
    }

    #[test]
    fn oversized_push_keeps_newest_samples() {
        let (mut producer, mut consumer) = SampleRing::with_capacity(4);
        let burst: Vec<f32> = (0..10).map(|i| i as f32).collect();
        assert_eq!(producer.push(&burst), 6);

        let mut output = [0.0; 4];
        assert_eq!(consumer.pop(&mut output), 4);
        assert_eq!(output, [6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn wraparound_preserves_order() {
        let (mut producer, mut consumer) = SampleRing::with_capacity(8);
        let mut output = [0.0; 8];

        // Advance the cursors so subsequent pushes straddle the boundary.
        for cycle in 0..20 {
            let base = cycle as f32 * 10.0;
            producer.push(&[base, base + 1.0, base + 2.0]);
            assert_eq!(consumer.pop(&mut output[..3]), 3);
            assert_eq!(&output[..3], &[base, base + 1.0, base + 2.0]);
        }
    }

    #[test]
    fn concurrent_producer_consumer_keeps_fifo_order() {
        use std::thread;

        let (mut producer, mut consumer) = SampleRing::with_capacity(256);
        let total = 100_000_u32;

        let writer = thread::spawn(move || {
            let mut next = 0u32;
            let mut chunk = [0.0f32; 64];
            while next < total {
                let n = (total - next).min(64) as usize;
                for (i, slot) in chunk.iter_mut().enumerate().take(n) {
                    *slot = (next + i as u32) as f32;
                }
                producer.push(&chunk[..n]);
                next += n as u32;
            }
        });

        // Samples may be dropped by overwrite, but whatever arrives must be
        // strictly increasing (FIFO order of the surviving samples).
        let mut last_seen = -1.0f32;
        let mut received = 0u32;
        let mut buffer = [0.0f32; 96];
        while received < total {
            let read = consumer.pop(&mut buffer);
            if read == 0 {
                if writer.is_finished() && consumer.is_empty() {
                    break;
                }
                std::hint::spin_loop();
                continue;
            }
            for &sample in &buffer[..read] {
                assert!(sample > last_seen, "out of order: {} after {}", sample, last_seen);
                last_seen = sample;
            }
            received += read as u32;
        }

        writer.join().unwrap();
    }
}
