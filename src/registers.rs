//! Register shadow and diagnostic field decoding
//!
//! The shadow holds the last value written to every synthesizer register
//! across both OPL3 banks. It is written only by the command interpreter;
//! the display side works from a cloned snapshot taken under the session
//! lock, so decoding never touches live interpreter state.
//!
//! Register layout (per bank):
//! - 0x01: waveform-select enable (bit 5), CSM (bit 7)
//! - 0x20+op: tremolo/vibrato/sustain/KSR flags + frequency multiple
//! - 0x40+op: key-scale level + total level
//! - 0x60+op: attack/decay rates — 0x80+op: sustain level/release rate
//! - 0xA0+ch: F-number low 8 bits
//! - 0xB0+ch: key-on (bit 5) + block (bits 4-2) + F-number high 2 bits
//! - 0xBD: depth and rhythm-section bits
//! - 0xC0+ch: feedback + connection
//! - 0xE0+op: waveform select
//! - 0x104/0x105 (OPL3, bank 1): 4-op channel mask / OPL3-mode enable

use crate::chip::{Bank, OplKind};

/// Total shadowed registers across both banks
pub const REGISTER_COUNT: usize = 512;

/// Channels per register bank
pub const CHANNELS_PER_BANK: usize = 9;

/// Operator register offsets, indexed by `channel * 2 + operator`
///
/// The 18 operator slots of one bank are scattered over the 0x00..=0x15
/// register range; this table maps (channel, operator) to the slot.
pub const OP_OFFSETS: [u8; 18] = [
    0x00, 0x03, 0x01, 0x04, 0x02, 0x05, 0x08, 0x0B, 0x09, 0x0C, 0x0A, 0x0D, 0x10, 0x13, 0x11,
    0x14, 0x12, 0x15,
];

/// Decoded per-operator parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorParams {
    /// Amplitude modulation (tremolo) enabled
    pub tremolo: bool,
    /// Frequency modulation (vibrato) enabled
    pub vibrato: bool,
    /// Envelope holds at sustain level while keyed
    pub sustained: bool,
    /// Envelope rates scale with key number
    pub key_scale_rate: bool,
    /// Frequency multiple (0..=15)
    pub multiple: u8,
    /// Key-scale level (0..=3)
    pub key_scale_level: u8,
    /// Attenuation, 0 is loudest (0..=63)
    pub total_level: u8,
    /// Attack rate (0..=15)
    pub attack: u8,
    /// Decay rate (0..=15)
    pub decay: u8,
    /// Sustain level (0..=15)
    pub sustain: u8,
    /// Release rate (0..=15)
    pub release: u8,
    /// Waveform select, masked to the generation's width
    pub waveform: u8,
}

/// Decoded per-channel parameters with both operators
///
/// `key_on` doubles as the "active" flag the display side uses for visual
/// emphasis of every field on the channel's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelParams {
    /// Channel envelope currently gated on
    pub key_on: bool,
    /// Octave block (0..=7)
    pub block: u8,
    /// 10-bit F-number
    pub fnumber: u16,
    /// Modulator feedback (0..=7)
    pub feedback: u8,
    /// Connection bit: true = additive, false = FM
    pub additive: bool,
    /// Modulator and carrier parameters
    pub operators: [OperatorParams; 2],
}

/// Decoded global chip flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalParams {
    /// Waveform select enable (register 0x01, bit 5)
    pub waveform_select: bool,
    /// Composite sine mode (register 0x01, bit 7)
    pub csm: bool,
    /// Deep tremolo (register 0xBD, bit 7)
    pub deep_tremolo: bool,
    /// Deep vibrato (register 0xBD, bit 6)
    pub deep_vibrato: bool,
    /// Rhythm section enabled (register 0xBD, bit 5)
    pub rhythm_mode: bool,
    /// Bass drum key (register 0xBD, bit 4)
    pub bass_drum: bool,
    /// Snare drum key (register 0xBD, bit 3)
    pub snare_drum: bool,
    /// Tom-tom key (register 0xBD, bit 2)
    pub tom_tom: bool,
    /// Cymbal key (register 0xBD, bit 1)
    pub cymbal: bool,
    /// Hi-hat key (register 0xBD, bit 0)
    pub hi_hat: bool,
    /// OPL3-mode enable (register 0x105), absent on OPL1/OPL2
    pub opl3_enable: Option<bool>,
    /// 4-operator channel mask (register 0x104), absent on OPL1/OPL2
    pub four_op_mask: Option<u8>,
}

/// Byte-addressable store of the last value written to every register
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterShadow {
    regs: [u8; REGISTER_COUNT],
}

impl Default for RegisterShadow {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterShadow {
    /// Fresh shadow with every register at zero
    pub fn new() -> Self {
        RegisterShadow {
            regs: [0; REGISTER_COUNT],
        }
    }

    /// Record a register write
    pub fn write(&mut self, bank: Bank, register: u8, value: u8) {
        self.regs[bank.base() + register as usize] = value;
    }

    /// Raw value at a flat address (0..512)
    pub fn read(&self, address: usize) -> u8 {
        self.regs[address]
    }

    /// Zero all 512 entries
    pub fn clear(&mut self) {
        self.regs = [0; REGISTER_COUNT];
    }

    /// Decode the global flags for the given chip generation
    pub fn global_params(&self, kind: OplKind) -> GlobalParams {
        let test = self.regs[0x01];
        let depth = self.regs[0xBD];
        let (opl3_enable, four_op_mask) = match kind {
            OplKind::Opl3 => (
                Some(self.regs[0x105] & 0x01 != 0),
                Some(self.regs[0x104] & 0x3F),
            ),
            _ => (None, None),
        };
        GlobalParams {
            waveform_select: test & 0x20 != 0,
            csm: test & 0x80 != 0,
            deep_tremolo: depth & 0x80 != 0,
            deep_vibrato: depth & 0x40 != 0,
            rhythm_mode: depth & 0x20 != 0,
            bass_drum: depth & 0x10 != 0,
            snare_drum: depth & 0x08 != 0,
            tom_tom: depth & 0x04 != 0,
            cymbal: depth & 0x02 != 0,
            hi_hat: depth & 0x01 != 0,
            opl3_enable,
            four_op_mask,
        }
    }

    /// Decode one channel, both operators
    ///
    /// Channels 0..9 live in bank 0. In OPL3 mode channels 9..18 map to the
    /// same register layout in bank 1. Out-of-range channels return `None`.
    pub fn channel_params(&self, kind: OplKind, channel: usize) -> Option<ChannelParams> {
        let max = kind.bank_count() * CHANNELS_PER_BANK;
        if channel >= max {
            return None;
        }
        let base = (channel / CHANNELS_PER_BANK) * 256;
        let local = channel % CHANNELS_PER_BANK;

        let block_fnum_key = self.regs[base + 0xB0 + local];
        let fnum_low = self.regs[base + 0xA0 + local];
        let feedback_conn = self.regs[base + 0xC0 + local];

        let operators = [
            self.operator_params(kind, base, local, 0),
            self.operator_params(kind, base, local, 1),
        ];

        Some(ChannelParams {
            key_on: block_fnum_key & 0x20 != 0,
            block: (block_fnum_key >> 2) & 0x07,
            fnumber: ((block_fnum_key as u16 & 0x03) << 8) | fnum_low as u16,
            feedback: (feedback_conn >> 1) & 0x07,
            additive: feedback_conn & 0x01 != 0,
            operators,
        })
    }

    fn operator_params(&self, kind: OplKind, base: usize, local: usize, op: usize) -> OperatorParams {
        let slot = OP_OFFSETS[local * 2 + op] as usize;
        let flags = self.regs[base + 0x20 + slot];
        let level = self.regs[base + 0x40 + slot];
        let attack_decay = self.regs[base + 0x60 + slot];
        let sustain_release = self.regs[base + 0x80 + slot];
        let wave = self.regs[base + 0xE0 + slot];

        OperatorParams {
            tremolo: flags & 0x80 != 0,
            vibrato: flags & 0x40 != 0,
            sustained: flags & 0x20 != 0,
            key_scale_rate: flags & 0x10 != 0,
            multiple: flags & 0x0F,
            key_scale_level: (level >> 6) & 0x03,
            total_level: level & 0x3F,
            attack: (attack_decay >> 4) & 0x0F,
            decay: attack_decay & 0x0F,
            sustain: (sustain_release >> 4) & 0x0F,
            release: sustain_release & 0x0F,
            waveform: wave & kind.waveform_mask(),
        }
    }
}

impl std::fmt::Debug for RegisterShadow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let written = self.regs.iter().filter(|&&v| v != 0).count();
        f.debug_struct("RegisterShadow")
            .field("nonzero", &written)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_on_round_trip() {
        let mut shadow = RegisterShadow::new();

        // Key-on bit set, octave 0
        shadow.write(Bank::Bank0, 0xB0, 0x20);
        let ch = shadow.channel_params(OplKind::Opl2, 0).unwrap();
        assert!(ch.key_on);
        assert_eq!(ch.block, 0);

        // Clearing bit 5 gates the channel off
        shadow.write(Bank::Bank0, 0xB0, 0x00);
        let ch = shadow.channel_params(OplKind::Opl2, 0).unwrap();
        assert!(!ch.key_on);
    }

    #[test]
    fn test_fnumber_combines_low_and_high_bits() {
        let mut shadow = RegisterShadow::new();
        shadow.write(Bank::Bank0, 0xA3, 0x6D);
        shadow.write(Bank::Bank0, 0xB3, 0x32); // key on, block 4, fnum hi = 2
        let ch = shadow.channel_params(OplKind::Opl2, 3).unwrap();
        assert!(ch.key_on);
        assert_eq!(ch.block, 4);
        assert_eq!(ch.fnumber, 0x26D);
    }

    #[test]
    fn test_operator_fields() {
        let mut shadow = RegisterShadow::new();
        // Channel 1 operator 0 sits at slot 0x01
        shadow.write(Bank::Bank0, 0x21, 0xB5); // AM + EGT + KSR, mult 5
        shadow.write(Bank::Bank0, 0x41, 0x8A); // KSL 2, TL 10
        shadow.write(Bank::Bank0, 0x61, 0xF2); // attack 15, decay 2
        shadow.write(Bank::Bank0, 0x81, 0x74); // sustain 7, release 4
        shadow.write(Bank::Bank0, 0xE1, 0x03);

        let ch = shadow.channel_params(OplKind::Opl2, 1).unwrap();
        let op = ch.operators[0];
        assert!(op.tremolo);
        assert!(!op.vibrato);
        assert!(op.sustained);
        assert!(op.key_scale_rate);
        assert_eq!(op.multiple, 5);
        assert_eq!(op.key_scale_level, 2);
        assert_eq!(op.total_level, 10);
        assert_eq!(op.attack, 15);
        assert_eq!(op.decay, 2);
        assert_eq!(op.sustain, 7);
        assert_eq!(op.release, 4);
        assert_eq!(op.waveform, 3);
    }

    #[test]
    fn test_waveform_width_depends_on_generation() {
        let mut shadow = RegisterShadow::new();
        shadow.write(Bank::Bank0, 0xE0, 0x07);
        let opl2 = shadow.channel_params(OplKind::Opl2, 0).unwrap();
        let opl3 = shadow.channel_params(OplKind::Opl3, 0).unwrap();
        assert_eq!(opl2.operators[0].waveform, 0x03);
        assert_eq!(opl3.operators[0].waveform, 0x07);
    }

    #[test]
    fn test_bank1_maps_to_upper_channels() {
        let mut shadow = RegisterShadow::new();
        shadow.write(Bank::Bank1, 0xB0, 0x28);
        shadow.write(Bank::Bank1, 0xA0, 0x80);

        let ch9 = shadow.channel_params(OplKind::Opl3, 9).unwrap();
        assert!(ch9.key_on);
        assert_eq!(ch9.fnumber, 0x080);

        // Bank 0 channel 0 is untouched
        let ch0 = shadow.channel_params(OplKind::Opl3, 0).unwrap();
        assert!(!ch0.key_on);
    }

    #[test]
    fn test_channel_range_per_generation() {
        let shadow = RegisterShadow::new();
        assert!(shadow.channel_params(OplKind::Opl2, 8).is_some());
        assert!(shadow.channel_params(OplKind::Opl2, 9).is_none());
        assert!(shadow.channel_params(OplKind::Opl3, 17).is_some());
        assert!(shadow.channel_params(OplKind::Opl3, 18).is_none());
    }

    #[test]
    fn test_global_flags() {
        let mut shadow = RegisterShadow::new();
        shadow.write(Bank::Bank0, 0x01, 0xA0); // CSM + waveform select
        shadow.write(Bank::Bank0, 0xBD, 0xE1); // deep AM/VIB, rhythm, hi-hat
        let flags = shadow.global_params(OplKind::Opl2);
        assert!(flags.waveform_select);
        assert!(flags.csm);
        assert!(flags.deep_tremolo);
        assert!(flags.deep_vibrato);
        assert!(flags.rhythm_mode);
        assert!(flags.hi_hat);
        assert!(!flags.bass_drum);
        assert_eq!(flags.opl3_enable, None);
        assert_eq!(flags.four_op_mask, None);
    }

    #[test]
    fn test_opl3_global_extensions() {
        let mut shadow = RegisterShadow::new();
        shadow.write(Bank::Bank1, 0x05, 0x01);
        shadow.write(Bank::Bank1, 0x04, 0x15);
        let flags = shadow.global_params(OplKind::Opl3);
        assert_eq!(flags.opl3_enable, Some(true));
        assert_eq!(flags.four_op_mask, Some(0x15));
    }

    #[test]
    fn test_clear_zeroes_everything() {
        let mut shadow = RegisterShadow::new();
        for reg in 0..=255u8 {
            shadow.write(Bank::Bank0, reg, 0xFF);
            shadow.write(Bank::Bank1, reg, 0xFF);
        }
        shadow.clear();
        assert!((0..REGISTER_COUNT).all(|addr| shadow.read(addr) == 0));
    }
}
