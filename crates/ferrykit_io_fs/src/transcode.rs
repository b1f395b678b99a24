//! Charset-aware bridge between byte streams and character streams.
//!
//! Decoding wraps a byte source in a [`DecodeReader`], encoding wraps a byte
//! sink in an [`EncodeWriter`]; both then run through the character copy loop
//! in [`crate::stream`].

use std::io::{self, Read, Write};

use encoding_rs::{CoderResult, Decoder, Encoder, EncoderResult, Encoding, UTF_8};

use crate::spec::TranscodeError;
use crate::stream::{CharRead, CharWrite, N_DEFAULT_BUFFER_SIZE, copy_chars_large};

////////////////////////////////////////////////////////////////////////////////
// #region Charset

/// Charset used when the caller supplies none.
pub fn default_charset() -> &'static Encoding {
    UTF_8
}

/// Resolve a charset label (`"utf-8"`, `"ISO-8859-1"`, `"Shift_JIS"`, ...).
///
/// `None` and the empty label resolve to [`default_charset`].
pub fn resolve_charset(label: Option<&str>) -> Result<&'static Encoding, TranscodeError> {
    let Some(label) = label.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default_charset());
    };
    Encoding::for_label(label.as_bytes()).ok_or_else(|| TranscodeError::UnknownCharset {
        label: label.to_string(),
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Adapters

/// Decodes a byte source into characters.
///
/// Malformed input is replaced with U+FFFD. A byte order mark is kept as
/// content, not sniffed.
pub struct DecodeReader<R> {
    inner: R,
    decoder: Decoder,
    buf_bytes: Vec<u8>,
    c_pending: String,
    if_finished: bool,
}

impl<R: Read> DecodeReader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder_without_bom_handling(),
            buf_bytes: vec![0_u8; N_DEFAULT_BUFFER_SIZE],
            c_pending: String::new(),
            if_finished: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill_pending(&mut self) -> io::Result<()> {
        let n_read = loop {
            match self.inner.read(&mut self.buf_bytes) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        let if_last = n_read == 0;

        let mut raw_rest = &self.buf_bytes[..n_read];
        loop {
            let n_capacity = self
                .decoder
                .max_utf8_buffer_length(raw_rest.len())
                .ok_or_else(|| io::Error::other("decode buffer length overflow"))?;
            self.c_pending.reserve(n_capacity);
            let (result, n_consumed, _) =
                self.decoder
                    .decode_to_string(raw_rest, &mut self.c_pending, if_last);
            raw_rest = &raw_rest[n_consumed..];
            if matches!(result, CoderResult::InputEmpty) {
                break;
            }
        }

        if if_last {
            self.if_finished = true;
        }
        Ok(())
    }
}

impl<R: Read> CharRead for DecodeReader<R> {
    fn read_chars(&mut self, buf: &mut String, n_max_chars: usize) -> io::Result<usize> {
        if n_max_chars == 0 {
            return Ok(0);
        }
        while self.c_pending.is_empty() && !self.if_finished {
            self.fill_pending()?;
        }
        if self.c_pending.is_empty() {
            return Ok(0);
        }

        let n_split = self
            .c_pending
            .char_indices()
            .nth(n_max_chars)
            .map_or(self.c_pending.len(), |(n_idx, _)| n_idx);
        let n_chars = self.c_pending[..n_split].chars().count();
        buf.push_str(&self.c_pending[..n_split]);
        self.c_pending.drain(..n_split);
        Ok(n_chars)
    }
}

/// Encodes characters into a byte sink.
///
/// Characters the charset cannot represent are written as `?`. UTF-16
/// labels encode as UTF-8, following the Encoding Standard's output rules.
pub struct EncodeWriter<W> {
    inner: W,
    encoder: Encoder,
    buf_bytes: Vec<u8>,
    if_finished: bool,
}

impl<W: Write> EncodeWriter<W> {
    pub fn new(inner: W, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoder: encoding.new_encoder(),
            buf_bytes: Vec::with_capacity(N_DEFAULT_BUFFER_SIZE),
            if_finished: false,
        }
    }

    /// Emit any pending encoder state, then flush the inner sink.
    ///
    /// No characters may be written after this call.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.if_finished {
            self.encode_chunk("", true)?;
            self.if_finished = true;
        }
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn encode_chunk(&mut self, text: &str, if_last: bool) -> io::Result<()> {
        let mut c_rest = text;
        loop {
            self.buf_bytes.clear();
            let n_capacity = self
                .encoder
                .max_buffer_length_from_utf8_without_replacement(c_rest.len())
                .ok_or_else(|| io::Error::other("encode buffer length overflow"))?;
            self.buf_bytes.reserve(n_capacity);
            let (result, n_read) = self.encoder.encode_from_utf8_to_vec_without_replacement(
                c_rest,
                &mut self.buf_bytes,
                if_last,
            );
            self.inner.write_all(&self.buf_bytes)?;
            c_rest = &c_rest[n_read..];
            match result {
                EncoderResult::InputEmpty => return Ok(()),
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(_) => self.inner.write_all(b"?")?,
            }
        }
    }
}

impl<W: Write> CharWrite for EncodeWriter<W> {
    fn write_chars(&mut self, text: &str) -> io::Result<()> {
        if self.if_finished {
            return Err(io::Error::other("encoder already finished"));
        }
        self.encode_chunk(text, false)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Copy

/// Decode `input` under `charset` and copy the characters into `writer`.
///
/// Returns the number of characters copied. Neither endpoint is closed.
pub fn copy_to_chars<R, W>(
    input: R,
    writer: &mut W,
    charset: Option<&str>,
) -> Result<u64, TranscodeError>
where
    R: Read,
    W: CharWrite + ?Sized,
{
    let encoding = resolve_charset(charset)?;
    let mut reader = DecodeReader::new(input, encoding);
    Ok(copy_chars_large(&mut reader, writer)?)
}

/// Encode the characters of `reader` under `charset` into `output`.
///
/// The output is flushed after the copy; a failed flush is reported as
/// [`TranscodeError::Flush`], a failed copy as [`TranscodeError::Stream`].
pub fn copy_to_bytes<R, W>(
    reader: &mut R,
    output: W,
    charset: Option<&str>,
) -> Result<u64, TranscodeError>
where
    R: CharRead + ?Sized,
    W: Write,
{
    let encoding = resolve_charset(charset)?;
    let mut writer = EncodeWriter::new(output, encoding);
    let n_count = copy_chars_large(reader, &mut writer)?;
    writer.finish().map_err(TranscodeError::Flush)?;
    Ok(n_count)
}

/// Decode the whole of `input` into a string.
pub fn read_to_string<R: Read>(input: R, charset: Option<&str>) -> Result<String, TranscodeError> {
    let mut c_text = String::new();
    copy_to_chars(input, &mut c_text, charset)?;
    Ok(c_text)
}

/// Encode the whole of `reader` into bytes.
pub fn chars_to_byte_array<R>(
    reader: &mut R,
    charset: Option<&str>,
) -> Result<Vec<u8>, TranscodeError>
where
    R: CharRead + ?Sized,
{
    let mut l_bytes = Vec::with_capacity(1024);
    copy_to_bytes(reader, &mut l_bytes, charset)?;
    Ok(l_bytes)
}

/// Decode `input` and split it into lines.
///
/// `\n`, `\r` and `\r\n` all terminate a line; terminators are not kept.
pub fn read_lines<R: Read>(input: R, charset: Option<&str>) -> Result<Vec<String>, TranscodeError> {
    let c_text = read_to_string(input, charset)?;
    Ok(split_lines(&c_text))
}

fn split_lines(c_text: &str) -> Vec<String> {
    let mut l_lines = Vec::new();
    let mut c_rest = c_text;
    while !c_rest.is_empty() {
        let Some(n_idx) = c_rest.find(|c: char| c == '\n' || c == '\r') else {
            l_lines.push(c_rest.to_string());
            break;
        };
        l_lines.push(c_rest[..n_idx].to_string());
        let n_skip = if c_rest[n_idx..].starts_with("\r\n") { 2 } else { 1 };
        c_rest = &c_rest[n_idx + n_skip..];
    }
    l_lines
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Write};

    use super::{
        chars_to_byte_array, copy_to_bytes, copy_to_chars, read_lines, read_to_string,
        resolve_charset,
    };
    use crate::spec::{StreamError, TranscodeError};

    struct FlushFailingWriter {
        l_bytes: Vec<u8>,
    }

    impl Write for FlushFailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.l_bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("flush refused"))
        }
    }

    struct WriteFailingWriter;

    impl Write for WriteFailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("write refused"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn resolve_charset_defaults_and_rejects_unknown() {
        assert_eq!(resolve_charset(None).expect("default").name(), "UTF-8");
        assert_eq!(resolve_charset(Some("")).expect("empty").name(), "UTF-8");
        assert_eq!(
            resolve_charset(Some("Shift_JIS")).expect("sjis").name(),
            "Shift_JIS"
        );

        let err = resolve_charset(Some("no-such-charset")).expect_err("must fail");
        assert!(matches!(
            err,
            TranscodeError::UnknownCharset { ref label } if label == "no-such-charset"
        ));
    }

    #[test]
    fn decode_latin1_bytes() {
        let raw_data = [0x63_u8, 0x61, 0x66, 0xE9];
        let mut c_out = String::new();
        let n_count = copy_to_chars(&raw_data[..], &mut c_out, Some("ISO-8859-1")).expect("copy");
        assert_eq!(c_out, "café");
        assert_eq!(n_count, 4);
    }

    #[test]
    fn encode_shift_jis() {
        let mut reader = "日本";
        let mut l_out = Vec::new();
        let n_count = copy_to_bytes(&mut reader, &mut l_out, Some("Shift_JIS")).expect("copy");
        assert_eq!(n_count, 2);
        assert_eq!(l_out, vec![0x93, 0xFA, 0x96, 0x7B]);
    }

    #[test]
    fn unmappable_characters_become_question_marks() {
        let mut reader = "a中b";
        let l_out = chars_to_byte_array(&mut reader, Some("windows-1252")).expect("encode");
        assert_eq!(l_out, b"a?b");
    }

    #[test]
    fn multibyte_sequences_survive_buffer_boundaries() {
        let c_text = "中".repeat(2000);
        let l_encoded = c_text.as_bytes().to_vec();
        let c_decoded = read_to_string(Cursor::new(l_encoded), None).expect("decode");
        assert_eq!(c_decoded, c_text);
    }

    #[test]
    fn malformed_utf8_is_replaced() {
        let c_decoded = read_to_string(&[b'a', 0xFF, b'b'][..], Some("utf-8")).expect("decode");
        assert_eq!(c_decoded, "a\u{FFFD}b");
    }

    #[test]
    fn flush_failure_is_distinct_from_copy_failure() {
        let mut reader = "payload";
        let mut writer = FlushFailingWriter {
            l_bytes: Vec::new(),
        };
        let err = copy_to_bytes(&mut reader, &mut writer, None).expect_err("flush must fail");
        assert!(matches!(err, TranscodeError::Flush(_)));
        assert_eq!(writer.l_bytes, b"payload");

        let mut reader_again = "payload";
        let err = copy_to_bytes(&mut reader_again, WriteFailingWriter, None)
            .expect_err("write must fail");
        assert!(matches!(
            err,
            TranscodeError::Stream(StreamError::Transfer(_))
        ));
    }

    #[test]
    fn unknown_charset_fails_before_any_io() {
        let mut reader = "payload";
        let mut l_out = Vec::new();
        let err = copy_to_bytes(&mut reader, &mut l_out, Some("klingon")).expect_err("must fail");
        assert!(matches!(err, TranscodeError::UnknownCharset { .. }));
        assert!(l_out.is_empty());
    }

    #[test]
    fn read_lines_handles_all_terminators() {
        let l_lines = read_lines(&b"one\r\ntwo\nthree\rfour\n\nsix"[..], None).expect("lines");
        assert_eq!(l_lines, vec!["one", "two", "three", "four", "", "six"]);
    }
}
