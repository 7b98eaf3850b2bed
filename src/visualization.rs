//! Terminal register-dump rendering
//!
//! Lays out a decoded register snapshot as rows of text spans. Each span
//! carries a `bright` flag derived from the owning channel's key-on bit so
//! the terminal front-end can emphasize active voices; this module does no
//! terminal I/O itself.

use crate::chip::OplKind;
use crate::registers::{ChannelParams, GlobalParams, RegisterShadow, CHANNELS_PER_BANK};

/// One run of text with its emphasis flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Text content
    pub text: String,
    /// Render emphasized (channel active / flag set)
    pub bright: bool,
}

impl Span {
    fn new(text: impl Into<String>, bright: bool) -> Self {
        Span {
            text: text.into(),
            bright,
        }
    }
}

/// One rendered row of the dump
pub type Line = Vec<Span>;

/// Waveform glyphs for the 2-bit OPL1/OPL2 select
const WAVE_GLYPHS: [&str; 4] = ["[^v^v]", "[^-^-]", "[^^^^]", "[/|/|]"];

/// Waveform glyphs for the 3-bit OPL3 select
const OPL3_WAVE_GLYPHS: [&str; 8] = [
    "[^v^v]", "[^-^-]", "[^^^^]", "[/|/|]", "[^v--]", "[^^--]", "[_-_-]", "[////]",
];

/// Render the full register dump for one shadow snapshot
///
/// Row layout: global flags, column header, then two operator rows per
/// channel — 9 channels for OPL1/OPL2, 18 across both banks for OPL3.
pub fn render_register_dump(shadow: &RegisterShadow, kind: OplKind) -> Vec<Line> {
    let mut lines = Vec::new();
    lines.push(global_flags_line(&shadow.global_params(kind), kind));
    lines.push(vec![Span::new(
        "                  ml   k   tl    a   d   s   r   o  freq      fbk      wave",
        true,
    )]);

    let channels = kind.bank_count() * CHANNELS_PER_BANK;
    for ch in 0..channels {
        // In-range by construction
        if let Some(params) = shadow.channel_params(kind, ch) {
            let glyphs: &[&str] = match kind {
                OplKind::Opl1 | OplKind::Opl2 => &WAVE_GLYPHS,
                OplKind::Opl3 => &OPL3_WAVE_GLYPHS,
            };
            for op in 0..2 {
                lines.push(operator_line(&params, ch, op, glyphs));
            }
        }
    }
    lines
}

/// Global flag row: test/rhythm bits, plus OPL3-mode bits where present
fn global_flags_line(flags: &GlobalParams, kind: OplKind) -> Line {
    let mut line = vec![
        Span::new("WF ", flags.waveform_select),
        Span::new("CSM ", flags.csm),
        Span::new("AMI ", flags.deep_tremolo),
        Span::new("VIBI ", flags.deep_vibrato),
        Span::new("DRUM ", flags.rhythm_mode),
        Span::new("BD ", flags.bass_drum),
        Span::new("SD ", flags.snare_drum),
        Span::new("TOM ", flags.tom_tom),
        Span::new("CYM ", flags.cymbal),
        Span::new("HH ", flags.hi_hat),
    ];
    if kind == OplKind::Opl3 {
        line.push(Span::new("OPL3 ", flags.opl3_enable.unwrap_or(false)));
        line.push(Span::new(
            "4OP ",
            flags.four_op_mask.unwrap_or(0) > 0,
        ));
    }
    line
}

/// One operator row; the second operator's row carries the channel columns
fn operator_line(params: &ChannelParams, channel: usize, op: usize, glyphs: &[&str]) -> Line {
    let o = params.operators[op];
    let kon = params.key_on;

    let mut line = vec![
        Span::new(format!("{} ", op + 1), true),
        Span::new("AM ", o.tremolo && kon),
        Span::new("VIB ", o.vibrato && kon),
        Span::new("EGT ", o.sustained && kon),
        Span::new("KSR ", o.key_scale_rate && kon),
        Span::new(format!("[{:2}] ", o.multiple), kon),
        Span::new(format!("[{}] ", o.key_scale_level), kon),
        Span::new(format!("[{:2}] ", o.total_level), kon),
        Span::new(format!("[{:2}]", o.attack), kon),
        Span::new(format!("[{:2}]", o.decay), kon),
        Span::new(format!("[{:2}]", o.sustain), kon),
        Span::new(format!("[{:2}] ", o.release), kon),
    ];

    if op == 1 {
        line.push(Span::new(format!("[{}]", params.block), kon));
        line.push(Span::new(format!("[{:4}] ", params.fnumber), kon));
        line.push(Span::new("KEY ", kon));
        line.push(Span::new(format!("[{}] ", params.feedback), kon));
        line.push(Span::new("ALG ", params.additive && kon));
    } else {
        line.push(Span::new(format!("{:<21}", channel + 1), kon));
    }

    line.push(Span::new(glyphs[o.waveform as usize], kon));
    line
}
