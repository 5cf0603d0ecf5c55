//! Log sanitization for body measurements.
//!
//! Body measurements are personal data. The engine logs indicator names and
//! outcomes, never raw lengths, but input echoes and third-party errors can
//! still carry them. This module redacts:
//! - `key=value` / `"key": value` pairs for every recognized measurement key
//! - structured `value=` fields emitted by tracing
//!
//! Lines longer than `DIMORPHIC_SANITIZE_MAX_BYTES` are cut and marked
//! `[TRUNCATED]`; the writer never buffers past that cap.

use std::io::{self, Write};
use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

use crate::config::SANITIZE_MAX_BYTES_ENV;

static MEASUREMENT_PATTERNS: OnceLock<MeasurementPatterns> = OnceLock::new();
static LINE_LIMIT: OnceLock<usize> = OnceLock::new();

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

/// Keeps the key and separator (group 1), replaces the number.
const REPLACEMENT: &str = "${1}[REDACTED]";
const TRUNCATED: &str = " [TRUNCATED]";

struct MeasurementPatterns {
    set: RegexSet,
    rules: Vec<Regex>,
}

fn get_patterns() -> &'static MeasurementPatterns {
    MEASUREMENT_PATTERNS.get_or_init(|| {
        let rules: [&str; 2] = [
            // Measurement keys, plain or quoted, with `=` or `:`
            r#"(?i)(\b(?:(?:left_|right_)?(?:upper_arm|forearm)_length|shoulder_breadth(?:_cm)?|standing_height|height_cm|head_circumference(?:_cm)?|hip_circumference|waist_circumference|arm_span)\b"?\s*[:=]\s*)-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?"#,
            // Structured tracing field carrying an indicator value
            r"(\bvalue\s*=\s*)-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?",
        ];

        MeasurementPatterns {
            set: RegexSet::new(rules).expect("Valid regex set"),
            rules: rules
                .iter()
                .map(|pattern| Regex::new(pattern).expect("Valid regex"))
                .collect(),
        }
    })
}

/// Per-line byte cap, read once.
fn line_limit() -> usize {
    *LINE_LIMIT.get_or_init(|| {
        std::env::var(SANITIZE_MAX_BYTES_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
    })
}

/// Longest prefix of `input` within `max_bytes`, if `input` exceeds it.
fn clip(input: &str, max_bytes: usize) -> Option<&str> {
    if input.len() <= max_bytes {
        return None;
    }
    let end = (0..=max_bytes)
        .rev()
        .find(|&i| input.is_char_boundary(i))
        .unwrap_or(0);
    Some(&input[..end])
}

/// Apply only the rules that match somewhere in `text`.
fn redact(text: &str) -> String {
    let patterns = get_patterns();
    let mut out = text.to_string();
    for idx in patterns.set.matches(text).iter() {
        out = patterns.rules[idx].replace_all(&out, REPLACEMENT).into_owned();
    }
    out
}

/// Redact measurement values from a string.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, line_limit())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    match clip(input, max_bytes) {
        Some(head) => redact(head) + TRUNCATED,
        None => redact(input),
    }
}

/// Check if a string carries a measurement value.
#[must_use]
pub fn contains_measurement(input: &str) -> bool {
    let head = clip(input, line_limit()).unwrap_or(input);
    get_patterns().set.is_match(head)
}

/// `MakeWriter` wrapper that redacts measurements from each log line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
    limit: usize,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self::with_limit(inner, line_limit())
    }

    #[must_use]
    pub fn with_limit(inner: M, limit: usize) -> Self {
        Self {
            inner,
            limit: limit.max(1),
        }
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer(), self.limit)
    }
}

/// Line-buffered writer. Bytes past `limit` on one line are dropped.
pub struct SanitizingWriter<W> {
    inner: W,
    line: Vec<u8>,
    limit: usize,
    overflow: bool,
}

impl<W: Write> SanitizingWriter<W> {
    fn new(inner: W, limit: usize) -> Self {
        Self {
            inner,
            line: Vec::new(),
            limit,
            overflow: false,
        }
    }

    fn push(&mut self, bytes: &[u8]) {
        let room = self.limit.saturating_sub(self.line.len());
        if bytes.len() > room {
            self.line.extend_from_slice(&bytes[..room]);
            self.overflow = true;
        } else {
            self.line.extend_from_slice(bytes);
        }
    }

    fn emit(&mut self, newline: bool) -> io::Result<()> {
        let text = String::from_utf8_lossy(&self.line);
        // Most lines carry no measurement and pass through untouched.
        let mut out = if get_patterns().set.is_match(&text) {
            redact(&text)
        } else {
            text.into_owned()
        };
        if self.overflow {
            out.push_str(TRUNCATED);
        }
        if newline {
            out.push('\n');
        }

        self.line.clear();
        self.overflow = false;
        self.inner.write_all(out.as_bytes())
    }
}

impl<W: Write> Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.split_inclusive(|&b| b == b'\n') {
            match chunk.split_last() {
                Some((&b'\n', body)) => {
                    self.push(body);
                    self.emit(true)?;
                }
                _ => self.push(chunk),
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.line.is_empty() || self.overflow {
            self.emit(false)?;
        }
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_key_value_pairs() {
        let sanitized = sanitize("input shoulder_breadth=42.5 standing_height = 175");
        assert_eq!(
            sanitized,
            "input shoulder_breadth=[REDACTED] standing_height = [REDACTED]"
        );
    }

    #[test]
    fn test_redacts_json_echo() {
        let sanitized = sanitize(r#"bad input {"left_forearm_length": 22.0, "height_cm":171}"#);
        assert!(sanitized.contains(r#""left_forearm_length": [REDACTED]"#));
        assert!(sanitized.contains(r#""height_cm":[REDACTED]"#));
        assert!(!sanitized.contains("22.0"));
        assert!(!sanitized.contains("171"));
    }

    #[test]
    fn test_redacts_structured_value_field() {
        let sanitized = sanitize("DEBUG indicator=shoulder_breadth value=1.2e1 excluded");
        assert_eq!(sanitized, "DEBUG indicator=shoulder_breadth value=[REDACTED] excluded");
    }

    #[test]
    fn test_leaves_scores_alone() {
        let line = "prediction=male confidence=0.87 indicators_used=5";
        assert_eq!(sanitize(line), line);
        assert!(!contains_measurement(line));
        assert!(contains_measurement("arm_span: 180"));
    }

    #[test]
    fn test_truncates_large_inputs() {
        let sanitized = sanitize_with_limit("arm_span=180 and a long tail of text", 12);
        assert!(sanitized.ends_with("[TRUNCATED]"));
        assert!(!sanitized.contains("180"));
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let mut sink = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut sink, 1024);
            writer.write_all(b"arm_span=18").expect("write");
            writer.write_all(b"0.5\nok\n").expect("write");
            writer.flush().expect("flush");
        }
        assert_eq!(String::from_utf8(sink).expect("utf8"), "arm_span=[REDACTED]\nok\n");
    }

    #[test]
    fn test_writer_drops_overlong_tail() {
        let mut sink = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut sink, 8);
            writer.write_all(b"arm_span=123456\nok\n").expect("write");
            writer.flush().expect("flush");
        }
        assert_eq!(
            String::from_utf8(sink).expect("utf8"),
            "arm_span [TRUNCATED]\nok\n"
        );
    }

    #[test]
    fn test_writer_passes_clean_lines_through() {
        let mut sink = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut sink, 1024);
            writer
                .write_all(b"INFO Scoring engine ready (calibration 3fa1c0)\n")
                .expect("write");
            writer.write_all(b"partial").expect("write");
            writer.flush().expect("flush");
        }
        assert_eq!(
            String::from_utf8(sink).expect("utf8"),
            "INFO Scoring engine ready (calibration 3fa1c0)\npartial"
        );
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        assert_eq!(clip("short", 16), None);
        assert_eq!(clip("é1234", 1), Some(""));
        assert_eq!(clip("é1234", 3), Some("é1"));
    }
}
