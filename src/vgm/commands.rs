//! VGM command-stream opcode layout
//!
//! The command stream is a sequence of self-delimiting opcodes. The player
//! executes only the wait, OPL register-write and end-of-stream opcodes;
//! everything else in the published opcode map is skipped by its operand
//! length so the cursor stays aligned on files that log additional chips.

/// Opcodes the interpreter executes
pub mod opcode {
    /// Wait n samples, n encoded in the low nibble (`0x70..=0x7F`)
    pub const WAIT_SHORT_BASE: u8 = 0x70;
    /// Wait, 16-bit little-endian sample count operand
    pub const WAIT_LONG: u8 = 0x61;
    /// Wait 735 samples (one 60 Hz NTSC video frame)
    pub const WAIT_NTSC_FRAME: u8 = 0x62;
    /// Wait 882 samples (one 50 Hz PAL video frame)
    pub const WAIT_PAL_FRAME: u8 = 0x63;
    /// YM3812 (OPL2) register write
    pub const OPL2_WRITE: u8 = 0x5A;
    /// YM3526 (OPL1) register write
    pub const OPL1_WRITE: u8 = 0x5B;
    /// YMF262 (OPL3) bank 0 register write
    pub const OPL3_WRITE_BANK0: u8 = 0x5E;
    /// YMF262 (OPL3) bank 1 register write
    pub const OPL3_WRITE_BANK1: u8 = 0x5F;
    /// End of sound data
    pub const END_OF_STREAM: u8 = 0x66;
    /// Data block, variable length (6 fixed operand bytes + u32 LE payload size)
    pub const DATA_BLOCK: u8 = 0x67;
}

/// Samples in one NTSC video frame at 44.1 kHz
pub const NTSC_FRAME_SAMPLES: u16 = 735;
/// Samples in one PAL video frame at 44.1 kHz
pub const PAL_FRAME_SAMPLES: u16 = 882;

/// Operand byte count for fixed-length VGM opcodes
///
/// Covers the published opcode map so unexecuted commands can be skipped
/// without desynchronizing the cursor. Returns `None` for reserved opcodes
/// with no defined length and for the variable-length [`opcode::DATA_BLOCK`],
/// which the interpreter sizes from its payload field.
pub const fn operand_len(op: u8) -> Option<usize> {
    match op {
        0x30..=0x3F => Some(1),        // second-chip PSG writes
        0x40..=0x4E => Some(2),        // Mikey and reserved two-operand range
        0x4F | 0x50 => Some(1),        // Game Gear stereo / PSG write
        0x51..=0x5F => Some(2),        // FM chip register writes
        0x61 => Some(2),               // long wait
        0x62 | 0x63 | 0x66 => Some(0), // frame waits, end of stream
        0x64 => Some(3),               // wait-length override
        0x68 => Some(11),              // PCM RAM write
        0x70..=0x8F => Some(0),        // short waits, YM2612 DAC+wait
        0x90 | 0x91 | 0x95 => Some(4), // DAC stream control
        0x92 => Some(5),
        0x93 => Some(10),
        0x94 => Some(1),
        0xA0..=0xBF => Some(2), // AY8910 and two-operand chip writes
        0xC0..=0xDF => Some(3),
        0xE0..=0xFF => Some(4),
        _ => None,
    }
}
