//! VGM register-log player for OPL-family FM chips
//!
//! Replays a recorded VGM command stream by driving an OPL1/OPL2/OPL3
//! chip-emulation backend in lockstep with audio sample generation.
//! The interpreter services at most one command per generated sample and
//! keeps an authoritative shadow copy of every synthesizer register for
//! diagnostic display.
//!
//! # Features
//! - VGM header parsing with OPL3 → OPL2 → OPL1 chip-clock priority
//! - One-command-per-sample playback clock (44.1 kHz)
//! - Wait opcodes (`0x7n`, `0x61`, `0x62`, `0x63`) and OPL register writes
//!   (`0x5A`, `0x5B`, `0x5E`, `0x5F`)
//! - Loop-point handling with full chip/shadow reset on loop-less restart
//! - 512-entry register shadow with decoded operator/channel fields
//! - Optional real-time streaming playback
//!
//! # Crate feature flags
//! - `visualization` (default): Terminal register-dump rendering (`visualization`)
//! - `streaming` (opt-in): Real-time audio output (enables optional `rodio` dep)
//!
//! # Quick start
//! ## Interpreter only
//! ```no_run
//! use vgmopl::chip::NullOpl;
//! use vgmopl::PlaybackSession;
//! let data = std::fs::read("song.vgm").unwrap();
//! let mut session = PlaybackSession::new(data, Box::new(NullOpl::default())).unwrap();
//! let sample: i16 = session.next_sample();
//! ```
//!
//! ## Real-time streaming
//! ```no_run
//! # #[cfg(feature = "streaming")]
//! # {
//! use vgmopl::chip::NullOpl;
//! use vgmopl::streaming::{AudioDevice, RealtimePlayer, StreamConfig};
//! use vgmopl::PlaybackSession;
//! let data = std::fs::read("song.vgm").unwrap();
//! let mut session = PlaybackSession::new(data, Box::new(NullOpl::default())).unwrap();
//! let cfg = StreamConfig::low_latency(44_100);
//! let stream = RealtimePlayer::new(cfg).unwrap();
//! let _dev = AudioDevice::new(cfg.sample_rate, cfg.channels, stream.get_buffer()).unwrap();
//! stream.write_blocking(&session.generate_samples(4096));
//! # }
//! ```

#![warn(missing_docs)]

pub mod chip; // OPL backend interface and chip adapter
pub mod player; // Playback engine (interpreter + pacing)
pub mod registers; // Register shadow and field decoding
#[cfg(feature = "streaming")]
pub mod streaming; // Audio output & streaming
pub mod vgm; // VGM format parsing
#[cfg(feature = "visualization")]
pub mod visualization; // Terminal register-dump rendering

/// Error types for player operations
#[derive(thiserror::Error, Debug)]
pub enum VgmError {
    /// Bad magic tag or truncated header
    #[error("Format error: {0}")]
    Format(String),

    /// No recognized nonzero chip clock in the header
    #[error("Unsupported chip: {0}")]
    UnsupportedChip(String),

    /// Audio output device could not be acquired
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for VgmError {
    /// Converts a String into `VgmError::Other`.
    ///
    /// Convenience conversion for generic string errors. Prefer the specific
    /// variants (`Format`, `UnsupportedChip`, `AudioDevice`) where the error
    /// class matters for reporting or exit codes.
    fn from(msg: String) -> Self {
        VgmError::Other(msg)
    }
}

impl From<&str> for VgmError {
    /// Converts a string slice into `VgmError::Other`.
    fn from(msg: &str) -> Self {
        VgmError::Other(msg.to_string())
    }
}

/// Result type for player operations
pub type Result<T> = std::result::Result<T, VgmError>;

// Public API exports
pub use chip::{Bank, Chip, NullOpl, OplBackend, OplKind};
pub use player::{PlaybackSession, SAMPLE_RATE};
pub use registers::{RegisterShadow, REGISTER_COUNT};
#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, RealtimePlayer, RingBuffer, StreamConfig};
pub use vgm::{ChipSelection, StreamBounds, VgmHeader};
