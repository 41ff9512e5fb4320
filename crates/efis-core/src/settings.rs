//! Inbound settings protocol.
//!
//! The host display sends frames of the form
//!
//! ```text
//! #
//! !asd=0
//! !atg=101325.00
//! +
//! ```
//!
//! `#` opens a frame and discards any partial one, `+` closes it, and the
//! body is a list of `!key=value` tokens. The parser consumes one byte per
//! call so it can run from the governor's idle wait.

use crate::rtc::DateTime;

/// Frame start byte.
pub const FRAME_START: u8 = b'#';
/// Frame end byte.
pub const FRAME_END: u8 = b'+';
/// Token delimiter.
pub const TOKEN_DELIMITER: char = '!';
/// Ring capacity of the in-progress frame.
pub const FRAME_CAPACITY: usize = 64;

/// Default altimeter setting (Pa).
pub const DEFAULT_ALT_SETTING_PA: f32 = 101_300.0;

/// Pilot settings echoed back in telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Altimeter setting (Pa)
    pub alt_setting_pa: f32,
    /// Altimeter on standard pressure
    pub alt_std: bool,
    /// Set-time request waiting for the next cycle
    pub pending_rtc: Option<DateTime>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alt_setting_pa: DEFAULT_ALT_SETTING_PA,
            alt_std: false,
            pending_rtc: None,
        }
    }
}

/// Fixed ring holding the current frame body. The write index wraps modulo
/// the capacity and overwrites the oldest bytes of the frame.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    bytes: [u8; FRAME_CAPACITY],
    index: usize,
}

impl FrameBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; FRAME_CAPACITY],
            index: 0,
        }
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn push(&mut self, byte: u8) {
        self.bytes[self.index] = byte;
        self.index = (self.index + 1) % FRAME_CAPACITY;
    }

    /// Bytes written since the last reset or wrap.
    pub fn contents(&self) -> &[u8] {
        &self.bytes[..self.index]
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental frame parser.
#[derive(Debug, Clone, Default)]
pub struct SettingsParser {
    buf: FrameBuffer,
    in_frame: bool,
    frames_applied: u32,
    frames_dropped: u32,
}

impl SettingsParser {
    pub const fn new() -> Self {
        Self {
            buf: FrameBuffer::new(),
            in_frame: false,
            frames_applied: 0,
            frames_dropped: 0,
        }
    }

    /// Feeds one inbound byte. Returns `true` when it closed a frame.
    pub fn feed(&mut self, byte: u8, settings: &mut Settings) -> bool {
        match byte {
            FRAME_START => {
                self.buf.reset();
                self.in_frame = true;
                false
            }
            FRAME_END if self.in_frame => {
                self.in_frame = false;
                match core::str::from_utf8(self.buf.contents()) {
                    Ok(text) => {
                        let keys = apply_frame(text, settings);
                        self.frames_applied += 1;
                        efis_info!("settings frame applied ({} keys)", keys);
                    }
                    Err(_) => {
                        self.frames_dropped += 1;
                        efis_warn!("settings frame dropped: not utf-8");
                    }
                }
                self.buf.reset();
                true
            }
            _ if self.in_frame => {
                self.buf.push(byte);
                false
            }
            // outside a frame
            _ => false,
        }
    }

    /// Feeds a chunk of inbound bytes, returning the number of frames closed.
    pub fn feed_all(&mut self, bytes: &[u8], settings: &mut Settings) -> usize {
        bytes.iter().filter(|b| self.feed(**b, settings)).count()
    }

    pub fn frames_applied(&self) -> u32 {
        self.frames_applied
    }

    pub fn frames_dropped(&self) -> u32 {
        self.frames_dropped
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Applies every recognised `key=value` token of a frame body.
/// Returns the number of keys that changed settings.
pub fn apply_frame(text: &str, settings: &mut Settings) -> usize {
    let mut applied = 0;
    for token in text.split(TOKEN_DELIMITER) {
        let Some((key, value)) = token.trim().split_once('=') else {
            continue;
        };
        if apply_key(key.trim(), value.trim(), settings) {
            applied += 1;
        }
    }
    applied
}

fn apply_key(key: &str, value: &str, settings: &mut Settings) -> bool {
    match key {
        "asd" => match parse_bool(value) {
            Some(std) => {
                settings.alt_std = std;
                true
            }
            None => false,
        },
        // older firmware name for the altimeter setting
        "atg" | "set_altStg" => match value.parse::<f32>() {
            Ok(pa) if pa.is_finite() && pa > 0.0 => {
                settings.alt_setting_pa = pa;
                true
            }
            _ => false,
        },
        "rtc" => match DateTime::parse_iso(value) {
            Some(time) => {
                settings.pending_rtc = Some(time);
                true
            }
            None => false,
        },
        _ => {
            efis_debug!("ignoring settings key");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_str(parser: &mut SettingsParser, settings: &mut Settings, s: &str) -> usize {
        parser.feed_all(s.as_bytes(), settings)
    }

    #[test]
    fn display_frame_updates_settings() {
        let mut p = SettingsParser::new();
        let mut s = Settings::default();
        let closed = feed_str(&mut p, &mut s, "#\r\n!asd=1\r\n!atg=101000.00\r\n+\r\n+\r\n");
        assert_eq!(closed, 1);
        assert!(s.alt_std);
        assert!((s.alt_setting_pa - 101_000.0).abs() < 0.01);
        assert_eq!(p.frames_applied(), 1);
    }

    #[test]
    fn bytes_outside_frame_are_ignored() {
        let mut p = SettingsParser::new();
        let mut s = Settings::default();
        feed_str(&mut p, &mut s, "!atg=90000+");
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn start_byte_discards_partial_frame() {
        let mut p = SettingsParser::new();
        let mut s = Settings::default();
        feed_str(&mut p, &mut s, "#!atg=90000#!asd=1+");
        assert!(s.alt_std);
        assert_eq!(s.alt_setting_pa, DEFAULT_ALT_SETTING_PA);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_ignored() {
        let mut p = SettingsParser::new();
        let mut s = Settings::default();
        feed_str(&mut p, &mut s, "#!foo=1!atg=abc!atg=-5!asd=maybe!rtc=yesterday+");
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let frame = "#!asd=0!atg=100900.5!rtc=2024-05-01T10:00:00Z+";
        let mut p = SettingsParser::new();
        let mut once = Settings::default();
        feed_str(&mut p, &mut once, frame);
        let mut twice = once;
        feed_str(&mut p, &mut twice, frame);
        assert_eq!(once, twice);
        assert_eq!(once.pending_rtc, DateTime::new(2024, 5, 1, 10, 0, 0));
    }

    #[test]
    fn overflow_keeps_only_bytes_after_last_wrap() {
        let mut p = SettingsParser::new();
        let mut s = Settings::default();
        let mut frame = std::string::String::from("#!atg=95000");
        // pad to exactly one full ring, then a short token lands at slot 0
        while frame.len() < 1 + FRAME_CAPACITY {
            frame.push(' ');
        }
        frame.push_str("!asd=1+");
        feed_str(&mut p, &mut s, &frame);
        assert!(s.alt_std);
        // the atg token was overwritten by the wrap
        assert_eq!(s.alt_setting_pa, DEFAULT_ALT_SETTING_PA);
    }

    #[test]
    fn overflow_can_truncate_a_token() {
        let mut p = SettingsParser::new();
        let mut s = Settings::default();
        let mut frame = std::string::String::from("#");
        while frame.len() < FRAME_CAPACITY - 2 {
            frame.push(' ');
        }
        // "!at" fills the ring, "g=95000" wraps to the start
        frame.push_str("!atg=95000+");
        feed_str(&mut p, &mut s, &frame);
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn non_utf8_frame_is_dropped() {
        let mut p = SettingsParser::new();
        let mut s = Settings::default();
        p.feed_all(b"#!asd=1\xff+", &mut s);
        assert!(!s.alt_std);
        assert_eq!(p.frames_dropped(), 1);
    }

    #[test]
    fn legacy_altimeter_key_is_accepted() {
        let mut s = Settings::default();
        assert_eq!(apply_frame("\n!set_altStg=100500\n", &mut s), 1);
        assert_eq!(s.alt_setting_pa, 100_500.0);
    }
}
