//! Ring buffer for concurrent sample generation and playback
//!
//! One producer thread writes generated samples, one consumer thread (the
//! audio device source) reads them. Storage sits behind a mutex; read and
//! write positions are atomics so availability checks stay lock-free.

use crate::{Result, VgmError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Largest allowed allocation, 512 MB worth of f32 samples
const MAX_CAPACITY: usize = 512 * 1024 * 1024 / std::mem::size_of::<f32>();

/// Circular sample buffer between the producer and the audio device
///
/// Capacity is rounded up to a power of two so index wrapping is a mask.
/// One slot is kept free to distinguish full from empty.
pub struct RingBuffer {
    buffer: Mutex<Vec<f32>>,
    write_pos: AtomicUsize,
    read_pos: AtomicUsize,
    capacity: usize,
    mask: usize,
}

impl RingBuffer {
    /// Create a ring buffer holding at least `requested_capacity` samples
    ///
    /// # Errors
    ///
    /// Fails for a zero capacity or one that would exceed the maximum safe
    /// allocation.
    pub fn new(requested_capacity: usize) -> Result<Self> {
        if requested_capacity == 0 {
            return Err(VgmError::Other(
                "ring buffer capacity must be greater than 0".into(),
            ));
        }

        let capacity = requested_capacity.next_power_of_two();
        if capacity > MAX_CAPACITY {
            return Err(VgmError::Other(format!(
                "ring buffer capacity {capacity} exceeds maximum safe size {MAX_CAPACITY}"
            )));
        }

        Ok(RingBuffer {
            buffer: Mutex::new(vec![0.0; capacity]),
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            capacity,
            mask: capacity - 1,
        })
    }

    /// Number of samples available to read without blocking
    pub fn available_read(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        if write >= read {
            write - read
        } else {
            self.capacity - (read - write)
        }
    }

    /// Number of samples that can be written without blocking
    pub fn available_write(&self) -> usize {
        self.capacity - self.available_read() - 1
    }

    /// Write samples (producer side); returns how many fit
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut buf = self.buffer.lock();

        // Space is computed under the lock so a concurrent read cannot race
        // the copy below
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let available = if write_pos >= read_pos {
            self.capacity - (write_pos - read_pos) - 1
        } else {
            (read_pos - write_pos) - 1
        };

        let to_write = samples.len().min(available);
        if to_write == 0 {
            return 0;
        }

        let idx = write_pos & self.mask;
        if idx + to_write <= self.capacity {
            buf[idx..idx + to_write].copy_from_slice(&samples[..to_write]);
        } else {
            let first = self.capacity - idx;
            buf[idx..].copy_from_slice(&samples[..first]);
            buf[..to_write - first].copy_from_slice(&samples[first..to_write]);
        }
        drop(buf);

        self.write_pos.store(write_pos + to_write, Ordering::Release);
        to_write
    }

    /// Read samples (consumer side); returns how many were available
    pub fn read(&self, dest: &mut [f32]) -> usize {
        let buf = self.buffer.lock();

        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let available = if write_pos >= read_pos {
            write_pos - read_pos
        } else {
            self.capacity - (read_pos - write_pos)
        };

        let to_read = dest.len().min(available);
        if to_read == 0 {
            return 0;
        }

        let idx = read_pos & self.mask;
        if idx + to_read <= self.capacity {
            dest[..to_read].copy_from_slice(&buf[idx..idx + to_read]);
        } else {
            let first = self.capacity - idx;
            dest[..first].copy_from_slice(&buf[idx..]);
            dest[first..to_read].copy_from_slice(&buf[..to_read - first]);
        }
        drop(buf);

        self.read_pos.store(read_pos + to_read, Ordering::Release);
        to_read
    }

    /// Drain and discard all pending samples
    pub fn flush(&self) {
        let write_pos = self.write_pos.load(Ordering::Acquire);
        self.read_pos.store(write_pos, Ordering::Release);
    }

    /// Fill level from 0.0 (empty) to 1.0 (full)
    pub fn fill_percentage(&self) -> f32 {
        (self.available_read() as f32) / (self.capacity as f32)
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("available_read", &self.available_read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        let rb = RingBuffer::new(1000).unwrap();
        assert_eq!(rb.capacity(), 1024);
    }

    #[test]
    fn test_write_and_read() {
        let rb = RingBuffer::new(16).unwrap();
        let samples = vec![0.1, 0.2, 0.3, 0.4];

        assert_eq!(rb.write(&samples), 4);
        assert_eq!(rb.available_read(), 4);

        let mut dest = vec![0.0; 4];
        assert_eq!(rb.read(&mut dest), 4);
        assert_eq!(dest, samples);
    }

    #[test]
    fn test_wrap_around() {
        let rb = RingBuffer::new(16).unwrap();

        assert_eq!(rb.write(&[1.0; 10]), 10);
        let mut buf = vec![0.0; 5];
        assert_eq!(rb.read(&mut buf), 5);

        // This write wraps past the end of the storage
        let written = rb.write(&[2.0; 8]);
        assert_eq!(written, 8);

        let mut buf = vec![0.0; 16];
        let read = rb.read(&mut buf);
        assert_eq!(read, 13);
        assert_eq!(&buf[..5], &[1.0; 5]);
        assert_eq!(&buf[5..13], &[2.0; 8]);
    }

    #[test]
    fn test_full_buffer_rejects_writes() {
        let rb = RingBuffer::new(8).unwrap();
        // One slot stays free
        assert_eq!(rb.write(&[1.0; 8]), 7);
        assert_eq!(rb.write(&[2.0; 1]), 0);
        assert_eq!(rb.available_write(), 0);
    }

    #[test]
    fn test_fill_percentage() {
        let rb = RingBuffer::new(128).unwrap();
        assert_eq!(rb.fill_percentage(), 0.0);

        rb.write(&vec![1.0; 64]);
        let fill = rb.fill_percentage();
        assert!(fill > 0.45 && fill < 0.55, "fill percentage {fill}");
    }

    #[test]
    fn test_flush_empties_buffer() {
        let rb = RingBuffer::new(16).unwrap();
        rb.write(&[1.0; 8]);
        rb.flush();
        assert_eq!(rb.available_read(), 0);
    }

    #[test]
    fn test_zero_capacity_is_an_error() {
        assert!(RingBuffer::new(0).is_err());
    }

    #[test]
    fn test_oversized_capacity_is_an_error() {
        assert!(RingBuffer::new(MAX_CAPACITY + 1).is_err());
    }
}
