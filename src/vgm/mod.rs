//! VGM format support
//!
//! VGM is a logged binary format capturing a timestamped sequence of
//! sound-chip register writes. This module covers the parts of the format
//! the player executes: the fixed-offset header fields that describe the
//! command stream, and the opcode layout of the stream itself.

pub mod commands;
pub mod header;

pub use commands::opcode;
pub use header::{ChipSelection, StreamBounds, VgmHeader};
