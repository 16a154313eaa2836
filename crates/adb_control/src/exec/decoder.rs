//! Turns captured process bytes into trimmed text

use encoding_rs::{DecoderResult, Encoding, UTF_8};
use thiserror::Error;

use super::runner::{ExitState, RawOutput};
use crate::error::{AdbError, Result};

/// Bytes that are valid under neither the primary encoding nor UTF-8
#[derive(Debug, Error)]
#[error("{stream} is not valid {primary} or UTF-8 ({len} bytes)")]
pub struct DecodeError {
    pub stream: &'static str,
    pub primary: &'static str,
    pub len: usize,
}

/// Decoded result of one process call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit: ExitState,
}

impl ExecutionResult {
    /// Stdout when it carries anything, stderr otherwise
    pub fn text(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }

    pub fn into_text(self) -> String {
        if self.stdout.is_empty() {
            self.stderr
        } else {
            self.stdout
        }
    }

    pub fn success(&self) -> bool {
        self.exit == ExitState::Code(0)
    }

    pub fn timed_out(&self) -> bool {
        self.exit == ExitState::TimedOut
    }
}

/// Decodes with a configurable primary encoding and a strict UTF-8 fallback
#[derive(Debug, Clone, Copy)]
pub struct OutputDecoder {
    primary: &'static Encoding,
}

impl Default for OutputDecoder {
    fn default() -> Self {
        Self { primary: UTF_8 }
    }
}

impl OutputDecoder {
    /// Resolve a WHATWG encoding label such as "utf-8", "gbk" or "shift_jis"
    pub fn for_label(label: &str) -> Result<Self> {
        let primary = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| AdbError::UnsupportedEncoding(label.to_string()))?;
        Ok(Self { primary })
    }

    pub fn encoding_name(&self) -> &'static str {
        self.primary.name()
    }

    /// Decode one stream and trim surrounding whitespace
    pub fn decode_stream(
        &self,
        bytes: &[u8],
        stream: &'static str,
    ) -> std::result::Result<String, DecodeError> {
        self.decode_bytes(bytes, stream, true)
    }

    /// `complete` is false when the process was killed, in which case an
    /// unfinished character at the end of the buffer is dropped.
    fn decode_bytes(
        &self,
        bytes: &[u8],
        stream: &'static str,
        complete: bool,
    ) -> std::result::Result<String, DecodeError> {
        let decoded = strict_decode(self.primary, bytes, complete)
            .or_else(|| strict_decode(UTF_8, bytes, complete))
            .ok_or(DecodeError {
                stream,
                primary: self.primary.name(),
                len: bytes.len(),
            })?;
        Ok(decoded.trim().to_string())
    }

    fn pick(
        &self,
        stdout: &[u8],
        stderr: &[u8],
        complete: bool,
    ) -> std::result::Result<String, DecodeError> {
        let out = self.decode_bytes(stdout, "stdout", complete)?;
        if !out.is_empty() {
            return Ok(out);
        }
        self.decode_bytes(stderr, "stderr", complete)
    }

    /// The stdout-or-stderr convention: stderr is only consulted when stdout
    /// is empty after trimming.
    pub fn decode(
        &self,
        stdout: &[u8],
        stderr: &[u8],
    ) -> std::result::Result<String, DecodeError> {
        self.pick(stdout, stderr, true)
    }

    /// [`decode`](Self::decode) for a finished call; output cut short by a
    /// timeout kill keeps every complete character
    pub fn decode_text(&self, raw: &RawOutput) -> std::result::Result<String, DecodeError> {
        self.pick(&raw.stdout, &raw.stderr, raw.exit != ExitState::TimedOut)
    }

    /// Decode both streams of a finished call
    pub fn decode_output(
        &self,
        raw: &RawOutput,
    ) -> std::result::Result<ExecutionResult, DecodeError> {
        let complete = raw.exit != ExitState::TimedOut;
        Ok(ExecutionResult {
            stdout: self.decode_bytes(&raw.stdout, "stdout", complete)?,
            stderr: self.decode_bytes(&raw.stderr, "stderr", complete)?,
            exit: raw.exit,
        })
    }
}

/// Decode without replacement characters; `None` on malformed input
///
/// With `complete == false` the decoder is not told that input ended, so a
/// trailing partial sequence stays buffered inside it instead of failing.
fn strict_decode(encoding: &'static Encoding, bytes: &[u8], complete: bool) -> Option<String> {
    if complete {
        return encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned());
    }
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let capacity = decoder.max_utf8_buffer_length_without_replacement(bytes.len())?;
    let mut text = String::with_capacity(capacity);
    match decoder.decode_to_string_without_replacement(bytes, &mut text, false) {
        (DecoderResult::InputEmpty, _) => Some(text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stdout_falls_back_to_stderr() {
        let decoder = OutputDecoder::default();
        assert_eq!(
            decoder.decode(b"", b"permission denied").unwrap(),
            "permission denied"
        );
        assert_eq!(decoder.decode(b" \n\t", b"  error: closed\n").unwrap(), "error: closed");
    }

    #[test]
    fn test_stdout_wins_when_present() {
        let decoder = OutputDecoder::default();
        assert_eq!(decoder.decode(b"3\n", b"ignored").unwrap(), "3");
    }

    #[test]
    fn test_stderr_not_decoded_when_stdout_present() {
        let decoder = OutputDecoder::default();
        assert_eq!(decoder.decode(b"ok", &[0xFF, 0xFE, 0xFD]).unwrap(), "ok");
    }

    #[test]
    fn test_gbk_primary() {
        let decoder = OutputDecoder::for_label("gbk").unwrap();
        assert_eq!(decoder.encoding_name(), "GBK");
        // "中文" in GBK
        let bytes = [0xD6, 0xD0, 0xCE, 0xC4];
        assert_eq!(decoder.decode(&bytes, b"").unwrap(), "中文");
    }

    #[test]
    fn test_utf8_fallback_when_primary_fails() {
        // ISO-2022-JP rejects every byte above 0x7F
        let decoder = OutputDecoder::for_label("iso-2022-jp").unwrap();
        assert_eq!(decoder.decode("café".as_bytes(), b"").unwrap(), "café");
    }

    #[test]
    fn test_invalid_under_both_encodings() {
        let decoder = OutputDecoder::for_label("gbk").unwrap();
        let err = decoder.decode(&[0x61, 0xFF], b"").unwrap_err();
        assert_eq!(err.stream, "stdout");
        assert_eq!(err.primary, "GBK");

        let err = OutputDecoder::default()
            .decode(b"", &[0xC3, 0x28])
            .unwrap_err();
        assert_eq!(err.stream, "stderr");
    }

    #[test]
    fn test_unknown_label() {
        assert!(matches!(
            OutputDecoder::for_label("klingon"),
            Err(AdbError::UnsupportedEncoding(_))
        ));
    }

    fn timed_out(stdout: &[u8]) -> RawOutput {
        RawOutput {
            stdout: stdout.to_vec(),
            stderr: Vec::new(),
            exit: ExitState::TimedOut,
            elapsed: std::time::Duration::from_millis(300),
        }
    }

    #[test]
    fn test_killed_mid_character_keeps_complete_text() {
        // "ok" then the first two bytes of "中" (E4 B8 AD)
        let raw = timed_out(&[b'o', b'k', 0xE4, 0xB8]);
        let decoder = OutputDecoder::default();
        assert_eq!(decoder.decode_text(&raw).unwrap(), "ok");

        let result = decoder.decode_output(&raw).unwrap();
        assert_eq!(result.stdout, "ok");
        assert!(result.timed_out());
    }

    #[test]
    fn test_truncated_tail_is_an_error_after_normal_exit() {
        let raw = RawOutput {
            exit: ExitState::Code(0),
            ..timed_out(&[b'o', b'k', 0xE4, 0xB8])
        };
        let err = OutputDecoder::default().decode_text(&raw).unwrap_err();
        assert_eq!(err.stream, "stdout");
    }

    #[test]
    fn test_killed_output_still_rejects_malformed_bytes() {
        let raw = timed_out(&[b'o', 0xFF, b'k']);
        assert!(OutputDecoder::default().decode_text(&raw).is_err());
    }

    #[test]
    fn test_execution_result_text() {
        let result = ExecutionResult {
            stdout: String::new(),
            stderr: "error: no devices/emulators found".to_string(),
            exit: ExitState::Code(1),
        };
        assert_eq!(result.text(), "error: no devices/emulators found");
        assert!(!result.success());
        assert!(!result.timed_out());
    }
}
