//! OPL chip backend interface and adapter
//!
//! The numeric FM synthesis core is an external collaborator: the player
//! drives it through the narrow [`OplBackend`] trait and never looks inside.
//! [`Chip`] couples a backend instance with the selected chip generation and
//! handles what differs between generations, which is bank addressing and
//! the OPL3 stereo downmix.

use crate::vgm::ChipSelection;

/// OPL chip generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OplKind {
    /// YM3526: 9 channels, one register bank, 2-bit waveform select
    Opl1,
    /// YM3812: 9 channels, one register bank, 2-bit waveform select
    Opl2,
    /// YMF262: 18 channels across two register banks, 3-bit waveform select
    Opl3,
}

impl OplKind {
    /// Number of 256-entry register banks this generation addresses
    pub fn bank_count(&self) -> usize {
        match self {
            OplKind::Opl1 | OplKind::Opl2 => 1,
            OplKind::Opl3 => 2,
        }
    }

    /// Bit mask applied to the waveform-select register value
    pub fn waveform_mask(&self) -> u8 {
        match self {
            OplKind::Opl1 | OplKind::Opl2 => 0x03,
            OplKind::Opl3 => 0x07,
        }
    }
}

impl std::fmt::Display for OplKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OplKind::Opl1 => "OPL1",
            OplKind::Opl2 => "OPL2",
            OplKind::Opl3 => "OPL3",
        };
        f.write_str(name)
    }
}

/// Register bank within the chip's address space
///
/// OPL1/OPL2 only have bank 0. OPL3 adds a second bank selected by which
/// register-write opcode appears in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    /// Primary register bank (addresses 0..=255)
    Bank0,
    /// OPL3 secondary register bank (addresses 256..=511)
    Bank1,
}

impl Bank {
    /// Base address of this bank in the flat 512-entry register space
    pub fn base(&self) -> usize {
        match self {
            Bank::Bank0 => 0,
            Bank::Bank1 => 256,
        }
    }
}

/// Narrow interface to an FM synthesis backend
///
/// Mono backends (OPL1/OPL2 cores) mirror their sample into both slots of
/// the `generate` result; the adapter picks channel 0. OPL3 backends return
/// a true stereo pair.
pub trait OplBackend: Send {
    /// Fully reset the synthesizer for the given output rate and master clock
    fn reset(&mut self, sample_rate: u32, clock_hz: u32);

    /// Write one register byte
    fn write_register(&mut self, bank: Bank, register: u8, value: u8);

    /// Generate the next sample pair
    fn generate(&mut self) -> [i16; 2];
}

/// Silent stand-in backend
///
/// Keeps the playback engine, register shadow and diagnostic display fully
/// functional without a synthesis core. A real emulator plugs in by
/// implementing [`OplBackend`].
#[derive(Debug, Default)]
pub struct NullOpl;

impl OplBackend for NullOpl {
    fn reset(&mut self, _sample_rate: u32, _clock_hz: u32) {}

    fn write_register(&mut self, _bank: Bank, _register: u8, _value: u8) {}

    fn generate(&mut self) -> [i16; 2] {
        [0, 0]
    }
}

/// Chip adapter: one backend instance plus the selected generation
///
/// Owned by the playback session for the audio-active lifetime of the
/// program; the variant never changes after construction.
pub struct Chip {
    kind: OplKind,
    clock_hz: u32,
    backend: Box<dyn OplBackend>,
}

impl Chip {
    /// Build the adapter and reset the backend for the selected chip
    pub fn new(selection: ChipSelection, mut backend: Box<dyn OplBackend>, sample_rate: u32) -> Self {
        backend.reset(sample_rate, selection.clock_hz());
        Chip {
            kind: selection.kind(),
            clock_hz: selection.clock_hz(),
            backend,
        }
    }

    /// The chip generation this adapter drives
    pub fn kind(&self) -> OplKind {
        self.kind
    }

    /// Master clock the backend was configured with
    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Forward one register write to the backend
    pub fn write_register(&mut self, bank: Bank, register: u8, value: u8) {
        self.backend.write_register(bank, register, value);
    }

    /// Generate one signed 16-bit mono output sample
    ///
    /// OPL1/OPL2 pass the backend's mono output through. OPL3 averages the
    /// stereo pair with an arithmetic shift, truncating toward negative
    /// infinity for negative sums.
    pub fn generate(&mut self) -> i16 {
        let [left, right] = self.backend.generate();
        match self.kind {
            OplKind::Opl1 | OplKind::Opl2 => left,
            OplKind::Opl3 => ((left as i32 + right as i32) >> 1) as i16,
        }
    }

    /// Fully reset the backend with the original sample rate and clock
    pub fn reset(&mut self, sample_rate: u32) {
        self.backend.reset(sample_rate, self.clock_hz);
    }
}

impl std::fmt::Debug for Chip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chip")
            .field("kind", &self.kind)
            .field("clock_hz", &self.clock_hz)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend stub that plays back canned sample pairs and records calls
    struct StubOpl {
        samples: Vec<[i16; 2]>,
        pos: usize,
        resets: Vec<(u32, u32)>,
        writes: Vec<(Bank, u8, u8)>,
    }

    impl StubOpl {
        fn with_samples(samples: Vec<[i16; 2]>) -> Self {
            StubOpl {
                samples,
                pos: 0,
                resets: Vec::new(),
                writes: Vec::new(),
            }
        }
    }

    impl OplBackend for StubOpl {
        fn reset(&mut self, sample_rate: u32, clock_hz: u32) {
            self.resets.push((sample_rate, clock_hz));
        }

        fn write_register(&mut self, bank: Bank, register: u8, value: u8) {
            self.writes.push((bank, register, value));
        }

        fn generate(&mut self) -> [i16; 2] {
            let sample = self.samples.get(self.pos).copied().unwrap_or([0, 0]);
            self.pos += 1;
            sample
        }
    }

    #[test]
    fn test_construction_resets_backend_with_clock() {
        let backend = Box::new(StubOpl::with_samples(vec![]));
        let chip = Chip::new(ChipSelection::Opl2(3_579_545), backend, 44_100);
        assert_eq!(chip.kind(), OplKind::Opl2);
        assert_eq!(chip.clock_hz(), 3_579_545);
    }

    #[test]
    fn test_mono_passthrough() {
        let backend = Box::new(StubOpl::with_samples(vec![[1234, 0]]));
        let mut chip = Chip::new(ChipSelection::Opl2(3_579_545), backend, 44_100);
        assert_eq!(chip.generate(), 1234);
    }

    #[test]
    fn test_opl3_downmix_averages() {
        let backend = Box::new(StubOpl::with_samples(vec![[100, 300]]));
        let mut chip = Chip::new(ChipSelection::Opl3(14_318_180), backend, 44_100);
        assert_eq!(chip.generate(), 200);
    }

    #[test]
    fn test_opl3_downmix_truncates_toward_negative_infinity() {
        // (-3 + 0) >> 1 == -2 with arithmetic shift, not -1
        let backend = Box::new(StubOpl::with_samples(vec![[-3, 0]]));
        let mut chip = Chip::new(ChipSelection::Opl3(14_318_180), backend, 44_100);
        assert_eq!(chip.generate(), -2);
    }

    #[test]
    fn test_opl3_downmix_extremes_do_not_overflow() {
        let backend = Box::new(StubOpl::with_samples(vec![[i16::MAX, i16::MAX]]));
        let mut chip = Chip::new(ChipSelection::Opl3(14_318_180), backend, 44_100);
        assert_eq!(chip.generate(), i16::MAX);
    }

    #[test]
    fn test_bank_bases() {
        assert_eq!(Bank::Bank0.base(), 0);
        assert_eq!(Bank::Bank1.base(), 256);
    }

    #[test]
    fn test_kind_properties() {
        assert_eq!(OplKind::Opl1.bank_count(), 1);
        assert_eq!(OplKind::Opl3.bank_count(), 2);
        assert_eq!(OplKind::Opl2.waveform_mask(), 0x03);
        assert_eq!(OplKind::Opl3.waveform_mask(), 0x07);
    }
}
