use std::sync::Arc;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    CachingCons, CachingProd, HeapRb,
};

/// Decode-thread end of the sample queue feeding the output stream.
/// Carries interleaved samples at the stream's sample rate.
pub struct AudioBufferProducer {
    inner: CachingProd<Arc<HeapRb<f32>>>,
}

/// Stream-callback end of the sample queue.
pub struct AudioBufferConsumer {
    inner: CachingCons<Arc<HeapRb<f32>>>,
}

impl AudioBufferProducer {
    /// Returns the number of samples accepted.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        self.inner.push_slice(samples)
    }

    pub fn vacant_len(&self) -> usize {
        self.inner.vacant_len()
    }
}

impl AudioBufferConsumer {
    /// Fills `out` from the queue; returns how many samples were written.
    pub fn pop_slice(&mut self, out: &mut [f32]) -> usize {
        self.inner.pop_slice(out)
    }

    pub fn occupied_len(&self) -> usize {
        self.inner.occupied_len()
    }

    /// Discards everything queued.
    pub fn clear(&mut self) -> usize {
        self.inner.clear()
    }
}

/// Creates a sample queue holding `capacity` interleaved samples.
pub fn create_audio_buffer(capacity: usize) -> (AudioBufferProducer, AudioBufferConsumer) {
    let rb = HeapRb::<f32>::new(capacity.max(1));
    let (prod, cons) = rb.split();
    (
        AudioBufferProducer { inner: prod },
        AudioBufferConsumer { inner: cons },
    )
}
