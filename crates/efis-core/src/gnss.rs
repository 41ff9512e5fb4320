//! GNSS sentence intake.
//!
//! The receiver's sentences are not decoded here. [`NmeaAssembler`] splits
//! the UART stream into lines and [`GnssCache`] keeps the latest text of
//! each forwarded sentence kind for the telemetry frame.

use heapless::String;

/// Longest valid sentence, `$` through `\n`.
pub const NMEA_MAX_LEN: usize = 82;

pub type SentenceText = String<NMEA_MAX_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SentenceKind {
    Gga,
    Gsa,
    Rmc,
    Vtg,
}

impl SentenceKind {
    pub const ALL: [SentenceKind; 4] = [
        SentenceKind::Gga,
        SentenceKind::Gsa,
        SentenceKind::Rmc,
        SentenceKind::Vtg,
    ];

    /// Classifies by the three-letter id after the talker (`$GPGGA`, `$GNRMC`).
    pub fn classify(line: &str) -> Option<Self> {
        match line.get(3..6)? {
            "GGA" => Some(SentenceKind::Gga),
            "GSA" => Some(SentenceKind::Gsa),
            "RMC" => Some(SentenceKind::Rmc),
            "VTG" => Some(SentenceKind::Vtg),
            _ => None,
        }
    }

    /// Telemetry key
    pub const fn key(self) -> &'static str {
        match self {
            SentenceKind::Gga => "gga",
            SentenceKind::Gsa => "gsa",
            SentenceKind::Rmc => "rmc",
            SentenceKind::Vtg => "vtg",
        }
    }
}

/// `true` when there is no `*hh` suffix or it matches the XOR of the body.
fn checksum_ok(s: &str) -> bool {
    let Some((content, check_str)) = s.split_once('*') else {
        return true;
    };
    let content = content.strip_prefix('$').unwrap_or(content);
    let calc = content.bytes().fold(0u8, |acc, b| acc ^ b);
    match check_str.get(..2).map(|hex| u8::from_str_radix(hex, 16)) {
        Some(Ok(val)) => calc == val,
        _ => false,
    }
}

/// Latest raw sentence per kind. Each new instance replaces the old one.
#[derive(Debug, Clone, Default)]
pub struct GnssCache {
    sentences: [SentenceText; 4],
    sentences_rx: u16,
    checksum_errors: u16,
    unknown_count: u16,
}

impl GnssCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes one received line. Returns the kind it was cached as.
    pub fn ingest_line(&mut self, line: &str) -> Option<SentenceKind> {
        let s = line.trim();
        if !s.starts_with('$') || s.len() < 6 {
            return None;
        }

        if !checksum_ok(s) {
            self.checksum_errors = self.checksum_errors.wrapping_add(1);
            efis_warn!("gnss checksum mismatch");
            return None;
        }

        let Some(kind) = SentenceKind::classify(s) else {
            self.unknown_count = self.unknown_count.wrapping_add(1);
            return None;
        };

        let slot = &mut self.sentences[kind as usize];
        slot.clear();
        // trimmed line fits: the assembler never yields more than NMEA_MAX_LEN
        if slot.push_str(s).is_err() {
            return None;
        }
        self.sentences_rx = self.sentences_rx.wrapping_add(1);
        Some(kind)
    }

    /// Cached text, empty until the first sentence of that kind.
    pub fn sentence(&self, kind: SentenceKind) -> &str {
        self.sentences[kind as usize].as_str()
    }

    pub fn sentences_rx(&self) -> u16 {
        self.sentences_rx
    }

    pub fn checksum_errors(&self) -> u16 {
        self.checksum_errors
    }

    pub fn unknown_count(&self) -> u16 {
        self.unknown_count
    }
}

/// Splits a raw byte stream into `$`-started, `\n`-terminated lines.
#[derive(Debug, Clone, Default)]
pub struct NmeaAssembler {
    buffer: SentenceText,
    in_line: bool,
    frame_errors: u16,
}

impl NmeaAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes incoming UART bytes, handing complete lines to `cache`.
    pub fn push_data(&mut self, data: &[u8], cache: &mut GnssCache) {
        for &b in data {
            self.push_byte(b, cache);
        }
    }

    pub fn push_byte(&mut self, b: u8, cache: &mut GnssCache) {
        if b == b'$' {
            self.buffer.clear();
            self.in_line = true;
        }
        if !self.in_line {
            return;
        }

        if !b.is_ascii() || self.buffer.push(b as char).is_err() {
            // overlong or garbage, drop until the next '$'
            self.frame_errors = self.frame_errors.wrapping_add(1);
            efis_warn!("gnss line overflow");
            self.buffer.clear();
            self.in_line = false;
            return;
        }

        if b == b'\n' {
            cache.ingest_line(self.buffer.as_str());
            self.buffer.clear();
            self.in_line = false;
        }
    }

    pub fn frame_errors(&self) -> u16 {
        self.frame_errors
    }
}
