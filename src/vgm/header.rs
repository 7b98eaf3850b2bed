//! VGM header parser
//!
//! The header is a block of little-endian 32-bit fields at fixed byte
//! offsets. Only the fields the player needs are read: stream bounds, loop
//! point, and the three OPL chip clocks.
//!
//! Field layout (offsets in bytes from the start of the file):
//! - 0x00: magic tag `"Vgm "`
//! - 0x04: end-of-data offset, relative to itself (absolute end = 4 + value)
//! - 0x1C: loop point, absolute file position (0 = no loop)
//! - 0x34: data start offset, relative to itself (absolute = 52 + value)
//! - 0x50: YM3812 (OPL2) clock in Hz
//! - 0x54: YM3526 (OPL1) clock in Hz
//! - 0x5C: YMF262 (OPL3) clock in Hz

use crate::chip::OplKind;
use crate::{Result, VgmError};

/// 4-byte magic tag at the start of every VGM file
pub const MAGIC: &[u8; 4] = b"Vgm ";

/// Byte offset of the end-of-data field
const EOF_OFFSET: usize = 4;
/// Byte offset of the loop-point field
const LOOP_OFFSET: usize = 28;
/// Byte offset of the data-start field
const DATA_OFFSET: usize = 52;
/// Byte offset of the YM3812 (OPL2) clock field
const OPL2_CLOCK: usize = 80;
/// Byte offset of the YM3526 (OPL1) clock field
const OPL1_CLOCK: usize = 84;
/// Byte offset of the YMF262 (OPL3) clock field
const OPL3_CLOCK: usize = 92;

/// Smallest header that contains every field the player reads
const MIN_HEADER_LEN: usize = OPL3_CLOCK + 4;

/// Command-stream bounds derived from the header
///
/// All positions are absolute offsets into the file buffer. `loop_offset`
/// is where playback resumes after end-of-stream; when the file carries no
/// valid loop point it equals `data_start` and `has_loop` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBounds {
    /// First byte of the command stream
    pub data_start: usize,
    /// One past the last byte of the command stream
    pub eof_offset: usize,
    /// Playback resume position after end-of-stream
    pub loop_offset: usize,
    /// Whether the file carries a valid loop point
    pub has_loop: bool,
}

/// Chip selected from the header clock fields
///
/// Chosen once per session, highest-priority nonzero clock wins:
/// OPL3 first, then OPL2, then OPL1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipSelection {
    /// YM3526 with its master clock in Hz
    Opl1(u32),
    /// YM3812 with its master clock in Hz
    Opl2(u32),
    /// YMF262 with its master clock in Hz
    Opl3(u32),
}

impl ChipSelection {
    /// The chip generation this selection targets
    pub fn kind(&self) -> OplKind {
        match self {
            ChipSelection::Opl1(_) => OplKind::Opl1,
            ChipSelection::Opl2(_) => OplKind::Opl2,
            ChipSelection::Opl3(_) => OplKind::Opl3,
        }
    }

    /// Master clock frequency in Hz
    pub fn clock_hz(&self) -> u32 {
        match self {
            ChipSelection::Opl1(hz) | ChipSelection::Opl2(hz) | ChipSelection::Opl3(hz) => *hz,
        }
    }
}

impl std::fmt::Display for ChipSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {} Hz", self.kind(), self.clock_hz())
    }
}

/// Parsed VGM header: stream bounds plus the selected chip
#[derive(Debug, Clone, Copy)]
pub struct VgmHeader {
    /// Command-stream bounds in absolute file coordinates
    pub bounds: StreamBounds,
    /// Selected chip variant and clock
    pub chip: ChipSelection,
}

impl VgmHeader {
    /// Parse the header from a fully buffered file image
    ///
    /// # Errors
    ///
    /// Returns [`VgmError::Format`] for a missing magic tag or a header too
    /// short to contain the required fields, and
    /// [`VgmError::UnsupportedChip`] when every candidate OPL clock is zero.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_HEADER_LEN {
            return Err(VgmError::Format(format!(
                "file too small for VGM header ({} bytes, need {})",
                data.len(),
                MIN_HEADER_LEN
            )));
        }

        if &data[0..4] != MAGIC {
            return Err(VgmError::Format("invalid VGM magic tag".into()));
        }

        let mut eof_offset = EOF_OFFSET + read_u32(data, EOF_OFFSET) as usize;
        if eof_offset > data.len() {
            log::warn!(
                "end-of-data offset {} exceeds file size {}, clamping",
                eof_offset,
                data.len()
            );
            eof_offset = data.len();
        }

        let data_start = DATA_OFFSET + read_u32(data, DATA_OFFSET) as usize;
        if data_start > eof_offset {
            return Err(VgmError::Format(format!(
                "data start {} lies beyond end of data {}",
                data_start, eof_offset
            )));
        }

        // The loop field is an absolute position. Values outside the command
        // area (including 0, the customary "no loop" marker) disable looping
        // and playback restarts at the data start.
        let raw_loop = read_u32(data, LOOP_OFFSET) as usize;
        let (loop_offset, has_loop) = if (LOOP_OFFSET..eof_offset).contains(&raw_loop) {
            (raw_loop, true)
        } else {
            (data_start, false)
        };

        let chip = select_chip(data)?;

        Ok(VgmHeader {
            bounds: StreamBounds {
                data_start,
                eof_offset,
                loop_offset,
                has_loop,
            },
            chip,
        })
    }
}

/// Pick the chip variant from the clock fields, highest generation first
fn select_chip(data: &[u8]) -> Result<ChipSelection> {
    let opl3 = read_u32(data, OPL3_CLOCK);
    if opl3 > 0 {
        return Ok(ChipSelection::Opl3(opl3));
    }
    let opl2 = read_u32(data, OPL2_CLOCK);
    if opl2 > 0 {
        return Ok(ChipSelection::Opl2(opl2));
    }
    let opl1 = read_u32(data, OPL1_CLOCK);
    if opl1 > 0 {
        return Ok(ChipSelection::Opl1(opl1));
    }
    Err(VgmError::UnsupportedChip(
        "no OPL3, OPL2 or OPL1 clock found in header".into(),
    ))
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
