use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    CachingCons, CachingProd, HeapRb,
};

/// Audio-thread end of the spectrum FIFO.
///
/// Samples are gathered into a fixed-size block; a completed block is copied
/// into the ring only if the whole block fits. Otherwise the block is dropped
/// (drop-newest) and counted. Never blocks, never allocates after creation.
pub struct SpectrumTap {
    producer: CachingProd<Arc<HeapRb<f32>>>,
    pending: Vec<f32>,
    block_size: usize,
    dropped: Arc<AtomicU64>,
}

/// Analysis-thread end of the spectrum FIFO.
pub struct SpectrumReceiver {
    consumer: CachingCons<Arc<HeapRb<f32>>>,
    block_size: usize,
    dropped: Arc<AtomicU64>,
    reported: u64,
}

/// Creates a FIFO holding up to `capacity_blocks` blocks of `block_size`
/// samples.
pub fn spectrum_fifo(block_size: usize, capacity_blocks: usize) -> (SpectrumTap, SpectrumReceiver) {
    let block_size = block_size.max(1);
    let rb = HeapRb::<f32>::new(block_size * capacity_blocks.max(1));
    let (producer, consumer) = rb.split();
    let dropped = Arc::new(AtomicU64::new(0));
    (
        SpectrumTap {
            producer,
            pending: Vec::with_capacity(block_size),
            block_size,
            dropped: dropped.clone(),
        },
        SpectrumReceiver {
            consumer,
            block_size,
            dropped,
            reported: 0,
        },
    )
}

impl SpectrumTap {
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn push_sample(&mut self, sample: f32) {
        self.pending.push(sample);
        if self.pending.len() == self.block_size {
            self.flush_block();
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        let mut rest = samples;
        while !rest.is_empty() {
            let take = (self.block_size - self.pending.len()).min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.pending.len() == self.block_size {
                self.flush_block();
            }
        }
    }

    fn flush_block(&mut self) {
        if self.producer.vacant_len() >= self.block_size {
            self.producer.push_slice(&self.pending);
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.pending.clear();
    }
}

impl SpectrumReceiver {
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn available_blocks(&self) -> usize {
        self.consumer.occupied_len() / self.block_size
    }

    /// Pops one complete block into `out[..block_size]`.
    pub fn pop_block(&mut self, out: &mut [f32]) -> bool {
        if out.len() < self.block_size || self.consumer.occupied_len() < self.block_size {
            return false;
        }
        self.consumer.pop_slice(&mut out[..self.block_size]) == self.block_size
    }

    /// Blocks dropped by the producer since the last call.
    pub fn take_dropped(&mut self) -> u64 {
        let total = self.dropped.load(Ordering::Relaxed);
        let fresh = total - self.reported;
        self.reported = total;
        fresh
    }

    pub fn clear(&mut self) {
        self.consumer.clear();
    }
}
