//! Playback engine: command interpreter and playback clock
//!
//! [`PlaybackSession`] owns everything one playback pass needs: the fully
//! buffered file image, the stream cursor, the chip adapter and the register
//! shadow. There is no hidden global state; the session value is threaded
//! into the sample-production path and shared with the display side behind a
//! lock.
//!
//! Pacing: each call to [`PlaybackSession::next_sample`] produces exactly one
//! mono sample. When no delay is pending, exactly one command (plus its
//! operand bytes) is consumed before that sample, never more. This caps
//! command throughput at one command per output sample.

use crate::chip::{Bank, Chip, OplBackend};
use crate::registers::RegisterShadow;
use crate::vgm::commands::{operand_len, NTSC_FRAME_SAMPLES, PAL_FRAME_SAMPLES};
use crate::vgm::{opcode, StreamBounds, VgmHeader};
use crate::Result;

/// Fixed output rate assumed by VGM recordings and the OPL backends
pub const SAMPLE_RATE: u32 = 44_100;

/// One playback pass over a VGM command stream
///
/// Sole writer of the register shadow and sole caller into the chip
/// backend's mutating operations. The display side reads through
/// [`PlaybackSession::shadow_snapshot`], a bounded whole-shadow copy.
pub struct PlaybackSession {
    data: Vec<u8>,
    bounds: StreamBounds,
    chip: Chip,
    shadow: RegisterShadow,
    position: usize,
    pending_delay: u16,
    samples_generated: u64,
    skipped_commands: u64,
    desync_count: u64,
}

impl PlaybackSession {
    /// Parse the header and set up a session over the buffered file image
    ///
    /// The backend is reset with the 44.1 kHz output rate and the clock the
    /// header selected. The cursor starts at the data-start offset.
    pub fn new(data: Vec<u8>, backend: Box<dyn OplBackend>) -> Result<Self> {
        let header = VgmHeader::parse(&data)?;
        Ok(Self::from_header(header, data, backend))
    }

    /// Set up a session from an already parsed header
    pub fn from_header(header: VgmHeader, data: Vec<u8>, backend: Box<dyn OplBackend>) -> Self {
        log::info!(
            "stream {}..{} ({} bytes), loop {:?}, chip {}",
            header.bounds.data_start,
            header.bounds.eof_offset,
            header.bounds.eof_offset - header.bounds.data_start,
            header.bounds.has_loop.then_some(header.bounds.loop_offset),
            header.chip,
        );
        let chip = Chip::new(header.chip, backend, SAMPLE_RATE);
        PlaybackSession {
            data,
            bounds: header.bounds,
            chip,
            shadow: RegisterShadow::new(),
            position: header.bounds.data_start,
            pending_delay: 0,
            samples_generated: 0,
            skipped_commands: 0,
            desync_count: 0,
        }
    }

    /// Stream bounds this session plays within
    pub fn bounds(&self) -> StreamBounds {
        self.bounds
    }

    /// The chip adapter driven by this session
    pub fn chip(&self) -> &Chip {
        &self.chip
    }

    /// Current cursor position in absolute file coordinates
    pub fn position(&self) -> usize {
        self.position
    }

    /// Samples still owed before the next command is eligible
    pub fn pending_delay(&self) -> u16 {
        self.pending_delay
    }

    /// Total samples produced since construction
    pub fn samples_generated(&self) -> u64 {
        self.samples_generated
    }

    /// Commands recognized by length but not executed (other-chip writes etc.)
    pub fn skipped_commands(&self) -> u64 {
        self.skipped_commands
    }

    /// Passes ended with the cursor out of sync (unknown opcode or
    /// truncated operands)
    pub fn desync_count(&self) -> u64 {
        self.desync_count
    }

    /// Read access to the live shadow (interpreter-side only)
    pub fn shadow(&self) -> &RegisterShadow {
        &self.shadow
    }

    /// Consistent copy of the whole shadow for the display side
    ///
    /// Callers on another thread take this under the session lock; the copy
    /// is bounded so the audio path is never blocked for long.
    pub fn shadow_snapshot(&self) -> RegisterShadow {
        self.shadow.clone()
    }

    /// Produce the next mono output sample, advancing the stream by at most
    /// one command
    pub fn next_sample(&mut self) -> i16 {
        if self.pending_delay > 0 {
            self.pending_delay -= 1;
        } else {
            self.step_command();
        }
        self.samples_generated += 1;
        self.chip.generate()
    }

    /// Batch `count` ticks into f32 samples for the streaming layer
    pub fn generate_samples(&mut self, count: usize) -> Vec<f32> {
        (0..count)
            .map(|_| self.next_sample() as f32 / 32768.0)
            .collect()
    }

    /// Consume exactly one command from the cursor
    fn step_command(&mut self) {
        if self.position >= self.bounds.eof_offset {
            self.end_of_stream();
            return;
        }

        let op = self.data[self.position];
        self.position += 1;

        let kind = self.chip.kind();
        match op {
            0x70..=0x7F => self.pending_delay = (op & 0x0F) as u16,
            opcode::WAIT_LONG => {
                if let Some([lo, hi]) = self.operands::<2>() {
                    self.pending_delay = u16::from_le_bytes([lo, hi]);
                }
            }
            opcode::WAIT_NTSC_FRAME => self.pending_delay = NTSC_FRAME_SAMPLES,
            opcode::WAIT_PAL_FRAME => self.pending_delay = PAL_FRAME_SAMPLES,
            opcode::OPL2_WRITE if kind == crate::chip::OplKind::Opl2 => {
                self.register_write(Bank::Bank0)
            }
            opcode::OPL1_WRITE if kind == crate::chip::OplKind::Opl1 => {
                self.register_write(Bank::Bank0)
            }
            opcode::OPL3_WRITE_BANK0 if kind == crate::chip::OplKind::Opl3 => {
                self.register_write(Bank::Bank0)
            }
            opcode::OPL3_WRITE_BANK1 if kind == crate::chip::OplKind::Opl3 => {
                self.register_write(Bank::Bank1)
            }
            opcode::END_OF_STREAM => self.end_of_stream(),
            opcode::DATA_BLOCK => self.skip_data_block(),
            _ => self.skip_command(op),
        }
    }

    /// Forward a register write to the backend and the shadow
    ///
    /// Register writes never set a delay; the next command is eligible on
    /// the very next sample tick.
    fn register_write(&mut self, bank: Bank) {
        if let Some([register, value]) = self.operands::<2>() {
            self.chip.write_register(bank, register, value);
            self.shadow.write(bank, register, value);
        }
    }

    /// Skip a command addressed to a chip this session does not drive
    ///
    /// The original player left operand bytes of unhandled commands in the
    /// stream, desynchronizing the cursor on any log that uses them. Skipping
    /// by the published operand length keeps the cursor aligned; opcodes with
    /// no defined length end the pass like end-of-stream does.
    fn skip_command(&mut self, op: u8) {
        match operand_len(op) {
            Some(len) => {
                if self.skipped_commands == 0 {
                    log::warn!(
                        "stream contains commands for chips this player does not drive \
                         (first: {op:#04X}); skipping them"
                    );
                }
                self.skipped_commands += 1;
                self.advance(len);
            }
            None => {
                // Warned once only: on a looping file whose loop body hits
                // this opcode the arm re-runs every sample tick, and the
                // producer path must not write formatted output at 44.1 kHz
                if self.desync_count == 0 {
                    log::warn!(
                        "unknown opcode {op:#04X} at offset {}, ending pass",
                        self.position - 1
                    );
                }
                self.desync_count += 1;
                self.end_of_stream();
            }
        }
    }

    /// Skip a 0x67 data block: 0x66 compatibility byte, block type, u32 LE
    /// payload size, then the payload itself
    fn skip_data_block(&mut self) {
        if let Some([_compat, _block_type, s0, s1, s2, s3]) = self.operands::<6>() {
            let payload = u32::from_le_bytes([s0, s1, s2, s3]) as usize;
            if self.skipped_commands == 0 {
                log::warn!("stream contains a data block ({payload} bytes); skipping it");
            }
            self.skipped_commands += 1;
            self.advance(payload);
        }
    }

    /// Read N operand bytes, or end the pass if the file is truncated
    ///
    /// Truncation counts as a lost-sync pass end; like the unknown-opcode
    /// arm it can recur every tick on a looping file, so the warning fires
    /// once.
    fn operands<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.position + N > self.data.len() {
            if self.desync_count == 0 {
                log::warn!("command operands truncated at offset {}", self.position);
            }
            self.desync_count += 1;
            self.end_of_stream();
            return None;
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[self.position..self.position + N]);
        self.position += N;
        Some(bytes)
    }

    /// Advance the cursor, saturating at the end of the buffer
    fn advance(&mut self, len: usize) {
        self.position = (self.position + len).min(self.data.len());
    }

    /// End-of-stream transition: seek to the loop target; without a loop the
    /// chip and the whole register shadow are reset for the fresh pass
    fn end_of_stream(&mut self) {
        self.position = self.bounds.loop_offset;
        if !self.bounds.has_loop {
            self.chip.reset(SAMPLE_RATE);
            self.shadow.clear();
        }
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("position", &self.position)
            .field("pending_delay", &self.pending_delay)
            .field("bounds", &self.bounds)
            .field("chip", &self.chip)
            .finish_non_exhaustive()
    }
}
