//! Producer-side front-end for real-time streaming
//!
//! Wraps the ring buffer with blocking/non-blocking writes and playback
//! statistics. The producer thread generates session samples and pushes
//! them here; the audio device drains the shared buffer.

use super::{RingBuffer, StreamConfig, BUFFER_BACKOFF_MICROS};
use parking_lot::Mutex;
use std::sync::Arc;

/// Real-time streaming front-end
pub struct RealtimePlayer {
    /// Ring buffer shared with the audio device
    buffer: Arc<RingBuffer>,
    /// Stream configuration
    config: StreamConfig,
    /// Playback statistics
    stats: Arc<Mutex<PlaybackStats>>,
}

/// Statistics for monitoring overruns and buffer health
#[derive(Debug, Clone, Default)]
pub struct PlaybackStats {
    /// Producer writes rejected because the buffer was full
    pub overrun_count: usize,
    /// Samples handed to the buffer so far
    pub samples_played: usize,
    /// Buffer fill level at the last write
    pub fill_percentage: f32,
}

impl RealtimePlayer {
    /// Create a streaming front-end for the given configuration
    pub fn new(config: StreamConfig) -> crate::Result<Self> {
        let buffer = Arc::new(RingBuffer::new(config.ring_buffer_size)?);
        Ok(RealtimePlayer {
            buffer,
            config,
            stats: Arc::new(Mutex::new(PlaybackStats::default())),
        })
    }

    /// Write samples, backing off until all of them fit (backpressure)
    pub fn write_blocking(&self, samples: &[f32]) -> usize {
        let mut total_written = 0;
        let mut remaining = samples;

        while !remaining.is_empty() {
            let written = self.buffer.write(remaining);

            let mut stats = self.stats.lock();
            stats.samples_played += written;
            stats.fill_percentage = self.buffer.fill_percentage();
            drop(stats);

            total_written += written;

            if written == 0 {
                std::thread::sleep(std::time::Duration::from_micros(BUFFER_BACKOFF_MICROS));
            } else {
                remaining = &remaining[written..];
            }
        }

        total_written
    }

    /// Write samples without blocking; a full buffer counts as an overrun
    pub fn write_nonblocking(&self, samples: &[f32]) -> usize {
        let written = self.buffer.write(samples);

        let mut stats = self.stats.lock();
        if written < samples.len() {
            stats.overrun_count += 1;
        }
        stats.samples_played += written;
        stats.fill_percentage = self.buffer.fill_percentage();

        written
    }

    /// Samples that can currently be written without blocking
    pub fn available_write(&self) -> usize {
        self.buffer.available_write()
    }

    /// Current playback statistics
    pub fn get_stats(&self) -> PlaybackStats {
        self.stats.lock().clone()
    }

    /// Discard all pending samples
    pub fn flush(&self) {
        self.buffer.flush();
    }

    /// Buffer fill level (0.0 to 1.0)
    pub fn fill_percentage(&self) -> f32 {
        self.buffer.fill_percentage()
    }

    /// Buffer latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        self.config.latency_ms()
    }

    /// The stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Shared ring buffer handle for audio device integration
    pub fn get_buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.buffer)
    }
}

impl Drop for RealtimePlayer {
    fn drop(&mut self) {
        let stats = self.stats.lock();
        log::info!(
            "playback complete: {} samples, {} overruns",
            stats.samples_played,
            stats.overrun_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonblocking_write_tracks_overruns() {
        let player = RealtimePlayer::new(StreamConfig {
            ring_buffer_size: 8,
            sample_rate: 44100,
            channels: 1,
        })
        .unwrap();

        // Capacity 8 leaves 7 writable slots
        assert_eq!(player.write_nonblocking(&[0.5; 16]), 7);
        let stats = player.get_stats();
        assert_eq!(stats.overrun_count, 1);
        assert_eq!(stats.samples_played, 7);
    }

    #[test]
    fn test_blocking_write_drains_through_consumer() {
        let player = RealtimePlayer::new(StreamConfig {
            ring_buffer_size: 64,
            sample_rate: 44100,
            channels: 1,
        })
        .unwrap();
        let buffer = player.get_buffer();

        let consumer = std::thread::spawn(move || {
            let mut out = Vec::new();
            let mut chunk = [0.0f32; 32];
            while out.len() < 256 {
                let read = buffer.read(&mut chunk);
                out.extend_from_slice(&chunk[..read]);
                if read == 0 {
                    std::thread::sleep(std::time::Duration::from_micros(50));
                }
            }
            out
        });

        let written = player.write_blocking(&[0.25; 256]);
        assert_eq!(written, 256);
        let consumed = consumer.join().unwrap();
        assert_eq!(consumed.len(), 256);
        assert!(consumed.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn test_flush_discards_pending() {
        let player = RealtimePlayer::new(StreamConfig::low_latency(44100)).unwrap();
        player.write_nonblocking(&[0.1; 128]);
        player.flush();
        assert_eq!(player.get_buffer().available_read(), 0);
    }
}
