//! End-to-end playback tests over synthetic VGM images
//!
//! Each test builds a complete in-memory file (header plus command stream)
//! and drives a full session through the public API.

use vgmopl::{Bank, NullOpl, OplBackend, OplKind, PlaybackSession, VgmError, SAMPLE_RATE};

const DATA_START: usize = 128;

/// Assemble a playable VGM image with the command stream at offset 128
fn vgm_image(commands: &[u8], loop_at: Option<usize>, clocks: [u32; 3]) -> Vec<u8> {
    let [opl2, opl1, opl3] = clocks;
    let mut data = vec![0u8; DATA_START + commands.len()];
    data[0..4].copy_from_slice(b"Vgm ");
    let eof_offset = (data.len() - 4) as u32;
    data[4..8].copy_from_slice(&eof_offset.to_le_bytes());
    data[28..32].copy_from_slice(&(loop_at.unwrap_or(0) as u32).to_le_bytes());
    data[52..56].copy_from_slice(&((DATA_START - 52) as u32).to_le_bytes());
    data[80..84].copy_from_slice(&opl2.to_le_bytes());
    data[84..88].copy_from_slice(&opl1.to_le_bytes());
    data[92..96].copy_from_slice(&opl3.to_le_bytes());
    data[DATA_START..].copy_from_slice(commands);
    data
}

const OPL2_CLOCKS: [u32; 3] = [3_579_545, 0, 0];
const OPL3_CLOCKS: [u32; 3] = [0, 0, 14_318_180];

/// Backend producing a constant sample pair, for checking the audio path
struct ConstantOpl {
    sample: [i16; 2],
}

impl OplBackend for ConstantOpl {
    fn reset(&mut self, _sample_rate: u32, _clock_hz: u32) {}

    fn write_register(&mut self, _bank: Bank, _register: u8, _value: u8) {}

    fn generate(&mut self) -> [i16; 2] {
        self.sample
    }
}

#[test]
fn rejects_non_vgm_file() {
    let err = PlaybackSession::new(vec![0u8; 256], Box::new(NullOpl)).unwrap_err();
    assert!(matches!(err, VgmError::Format(_)));
}

#[test]
fn rejects_file_without_opl_clock() {
    let data = vgm_image(&[0x66], None, [0, 0, 0]);
    let err = PlaybackSession::new(data, Box::new(NullOpl)).unwrap_err();
    assert!(matches!(err, VgmError::UnsupportedChip(_)));
}

#[test]
fn opl3_clock_takes_priority() {
    let data = vgm_image(&[0x66], None, [3_579_545, 3_579_545, 14_318_180]);
    let session = PlaybackSession::new(data, Box::new(NullOpl)).unwrap();
    assert_eq!(session.chip().kind(), OplKind::Opl3);
    assert_eq!(session.chip().clock_hz(), 14_318_180);
}

#[test]
fn register_writes_populate_the_shadow() {
    // Operator setup followed by a key-on across two channels
    let commands = [
        0x5A, 0x20, 0x21, // ch0 modulator flags
        0x5A, 0xA0, 0x6D, // ch0 fnum low
        0x5A, 0xB0, 0x2E, // ch0 key on, block 3, fnum hi 2
        0x5A, 0xB1, 0x20, // ch1 key on
        0x66,
    ];
    let data = vgm_image(&commands, Some(DATA_START), OPL2_CLOCKS);
    let mut session = PlaybackSession::new(data, Box::new(NullOpl)).unwrap();

    // One command per sample tick
    for _ in 0..4 {
        session.next_sample();
    }

    let shadow = session.shadow_snapshot();
    let ch0 = shadow.channel_params(OplKind::Opl2, 0).unwrap();
    assert!(ch0.key_on);
    assert_eq!(ch0.block, 3);
    assert_eq!(ch0.fnumber, 0x26D);
    assert_eq!(ch0.operators[0].multiple, 1);
    assert!(shadow.channel_params(OplKind::Opl2, 1).unwrap().key_on);
}

#[test]
fn wait_commands_pace_the_stream() {
    // 0x61 938 samples, then a write
    let commands = [0x61, 0xAA, 0x03, 0x5A, 0xB0, 0x20, 0x66];
    let data = vgm_image(&commands, Some(DATA_START), OPL2_CLOCKS);
    let mut session = PlaybackSession::new(data, Box::new(NullOpl)).unwrap();

    session.next_sample(); // consumes the wait command
    assert_eq!(session.pending_delay(), 938);

    for _ in 0..938 {
        session.next_sample();
    }
    assert_eq!(session.shadow_snapshot().read(0xB0), 0);

    session.next_sample(); // write becomes eligible exactly now
    assert_eq!(session.shadow_snapshot().read(0xB0), 0x20);
}

#[test]
fn looped_file_replays_without_reset() {
    // Key-on, short wait, end; loop back to the wait so the key stays held
    let commands = [0x5A, 0xB0, 0x20, 0x70, 0x66];
    let data = vgm_image(&commands, Some(DATA_START + 3), OPL2_CLOCKS);
    let mut session = PlaybackSession::new(data, Box::new(NullOpl)).unwrap();

    for _ in 0..100 {
        session.next_sample();
    }
    assert_eq!(session.shadow_snapshot().read(0xB0), 0x20);
}

#[test]
fn unlooped_file_restarts_from_a_clean_slate() {
    let commands = [0x5A, 0xB0, 0x20, 0x66];
    let data = vgm_image(&commands, None, OPL2_CLOCKS);
    let mut session = PlaybackSession::new(data, Box::new(NullOpl)).unwrap();

    session.next_sample(); // write
    session.next_sample(); // end of stream, full reset
    assert_eq!(session.position(), session.bounds().data_start);
    assert_eq!(session.shadow_snapshot().read(0xB0), 0);

    // The next pass replays the same write
    session.next_sample();
    assert_eq!(session.shadow_snapshot().read(0xB0), 0x20);
}

#[test]
fn opl3_banks_are_independent() {
    let commands = [0x5E, 0xB0, 0x20, 0x5F, 0xB0, 0x28, 0x66];
    let data = vgm_image(&commands, Some(DATA_START), OPL3_CLOCKS);
    let mut session = PlaybackSession::new(data, Box::new(NullOpl)).unwrap();
    session.next_sample();
    session.next_sample();

    let shadow = session.shadow_snapshot();
    assert!(shadow.channel_params(OplKind::Opl3, 0).unwrap().key_on);
    let ch9 = shadow.channel_params(OplKind::Opl3, 9).unwrap();
    assert!(ch9.key_on);
    assert_eq!(ch9.block, 2);
}

#[test]
fn foreign_chip_commands_do_not_derail_playback() {
    // A YM2612 write and a PSG write interleaved with OPL2 commands
    let commands = [0x52, 0x28, 0xF0, 0x50, 0x9F, 0x5A, 0xB0, 0x20, 0x66];
    let data = vgm_image(&commands, Some(DATA_START), OPL2_CLOCKS);
    let mut session = PlaybackSession::new(data, Box::new(NullOpl)).unwrap();

    for _ in 0..3 {
        session.next_sample();
    }
    assert_eq!(session.skipped_commands(), 2);
    assert_eq!(session.shadow_snapshot().read(0xB0), 0x20);
}

#[test]
fn generated_audio_is_normalized_f32() {
    let data = vgm_image(&[0x66], Some(DATA_START), OPL2_CLOCKS);
    let backend = Box::new(ConstantOpl {
        sample: [16384, 16384],
    });
    let mut session = PlaybackSession::new(data, backend).unwrap();

    let samples = session.generate_samples(256);
    assert_eq!(samples.len(), 256);
    assert!(samples.iter().all(|&s| (s - 0.5).abs() < 1e-4));
    assert_eq!(session.samples_generated(), 256);
}

#[test]
fn opl3_output_is_downmixed_to_mono() {
    let data = vgm_image(&[0x66], Some(DATA_START), OPL3_CLOCKS);
    let backend = Box::new(ConstantOpl {
        sample: [1000, 3000],
    });
    let mut session = PlaybackSession::new(data, backend).unwrap();
    assert_eq!(session.next_sample(), 2000);
}

#[test]
fn playback_rate_constant_matches_vgm_timebase() {
    assert_eq!(SAMPLE_RATE, 44_100);
}

#[cfg(feature = "visualization")]
mod visualization {
    use super::*;
    use vgmopl::visualization::render_register_dump;

    #[test]
    fn dump_reflects_a_played_stream() {
        let commands = [0x5A, 0xB0, 0x20, 0x66];
        let data = vgm_image(&commands, Some(DATA_START), OPL2_CLOCKS);
        let mut session = PlaybackSession::new(data, Box::new(NullOpl)).unwrap();
        session.next_sample();

        let lines = render_register_dump(&session.shadow_snapshot(), OplKind::Opl2);
        assert_eq!(lines.len(), 2 + 9 * 2);
        let carrier = &lines[3];
        assert!(carrier
            .iter()
            .any(|span| span.text == "KEY " && span.bright));
    }
}
