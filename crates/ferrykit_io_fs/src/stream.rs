//! Buffered byte and character stream copy.
//!
//! None of these functions close their endpoints: the caller owns both the
//! source and the sink and drops them when it is done.

use std::io::{self, Read, Write};

use crate::spec::StreamError;

/// Buffer size of the streaming copy path.
pub const N_DEFAULT_BUFFER_SIZE: usize = 4096;

/// Returned by the 32-bit copy variants when the real count does not fit.
pub const N_COPY_OVERFLOW: i32 = -1;

////////////////////////////////////////////////////////////////////////////////
// #region ByteCopy

/// Copy all remaining bytes from `reader` to `writer`.
///
/// Returns the exact number of bytes moved. Bytes already written when an
/// error occurs stay in the sink.
pub fn copy_large<R, W>(reader: &mut R, writer: &mut W) -> Result<u64, StreamError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = [0_u8; N_DEFAULT_BUFFER_SIZE];
    copy_large_with_buffer(reader, writer, &mut buffer)
}

/// [`copy_large`] with a caller-provided buffer.
pub fn copy_large_with_buffer<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut [u8],
) -> Result<u64, StreamError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if buffer.is_empty() {
        return Err(StreamError::EmptyBuffer);
    }

    let mut n_count: u64 = 0;
    loop {
        let n_read = match reader.read(buffer) {
            Ok(0) => return Ok(n_count),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamError::Transfer(e)),
        };
        writer
            .write_all(&buffer[..n_read])
            .map_err(StreamError::Transfer)?;
        n_count += n_read as u64;
    }
}

/// 32-bit variant of [`copy_large`].
///
/// Only for callers that have already bounded the size: a count above
/// `i32::MAX` is reported as [`N_COPY_OVERFLOW`].
pub fn copy<R, W>(reader: &mut R, writer: &mut W) -> Result<i32, StreamError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let n_count = copy_large(reader, writer)?;
    Ok(i32::try_from(n_count).unwrap_or(N_COPY_OVERFLOW))
}

/// Drain `reader` into a byte vector.
pub fn to_byte_array<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, StreamError> {
    let mut l_bytes = Vec::with_capacity(1024);
    copy_large(reader, &mut l_bytes)?;
    Ok(l_bytes)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CharCopy

/// A source of decoded text.
pub trait CharRead {
    /// Append at most `n_max_chars` characters to `buf`.
    ///
    /// Returns the number of characters appended; `Ok(0)` means end of input.
    fn read_chars(&mut self, buf: &mut String, n_max_chars: usize) -> io::Result<usize>;
}

/// A sink for text.
pub trait CharWrite {
    fn write_chars(&mut self, text: &str) -> io::Result<()>;
}

impl CharRead for &str {
    fn read_chars(&mut self, buf: &mut String, n_max_chars: usize) -> io::Result<usize> {
        let n_split = self
            .char_indices()
            .nth(n_max_chars)
            .map_or(self.len(), |(n_idx, _)| n_idx);
        let (c_head, c_rest) = self.split_at(n_split);
        buf.push_str(c_head);
        *self = c_rest;
        Ok(c_head.chars().count())
    }
}

impl CharWrite for String {
    fn write_chars(&mut self, text: &str) -> io::Result<()> {
        self.push_str(text);
        Ok(())
    }
}

impl<T: CharWrite + ?Sized> CharWrite for &mut T {
    fn write_chars(&mut self, text: &str) -> io::Result<()> {
        (**self).write_chars(text)
    }
}

/// Copy all remaining characters from `reader` to `writer`.
///
/// Character counterpart of [`copy_large`]: buffers of
/// [`N_DEFAULT_BUFFER_SIZE`] characters, returns the character count.
pub fn copy_chars_large<R, W>(reader: &mut R, writer: &mut W) -> Result<u64, StreamError>
where
    R: CharRead + ?Sized,
    W: CharWrite + ?Sized,
{
    let mut buffer = String::with_capacity(N_DEFAULT_BUFFER_SIZE);
    let mut n_count: u64 = 0;
    loop {
        buffer.clear();
        let n_read = match reader.read_chars(&mut buffer, N_DEFAULT_BUFFER_SIZE) {
            Ok(0) => return Ok(n_count),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamError::Transfer(e)),
        };
        writer
            .write_chars(&buffer)
            .map_err(StreamError::Transfer)?;
        n_count += n_read as u64;
    }
}

/// 32-bit variant of [`copy_chars_large`], with the same overflow sentinel as [`copy`].
pub fn copy_chars<R, W>(reader: &mut R, writer: &mut W) -> Result<i32, StreamError>
where
    R: CharRead + ?Sized,
    W: CharWrite + ?Sized,
{
    let n_count = copy_chars_large(reader, writer)?;
    Ok(i32::try_from(n_count).unwrap_or(N_COPY_OVERFLOW))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read, Write};

    use super::{
        CharRead, N_COPY_OVERFLOW, N_DEFAULT_BUFFER_SIZE, copy, copy_chars, copy_chars_large,
        copy_large, copy_large_with_buffer, to_byte_array,
    };
    use crate::spec::StreamError;

    struct FailingWriter {
        n_accept: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.n_accept == 0 {
                return Err(io::Error::other("disk full"));
            }
            let n = buf.len().min(self.n_accept);
            self.n_accept -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Reader that interrupts every other call.
    struct InterruptingReader {
        inner: Cursor<Vec<u8>>,
        if_interrupt_next: bool,
    }

    impl Read for InterruptingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.if_interrupt_next = !self.if_interrupt_next;
            if self.if_interrupt_next {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn copy_large_counts_all_bytes_across_buffers() {
        let raw_data: Vec<u8> = (0..(N_DEFAULT_BUFFER_SIZE * 3 + 17))
            .map(|n| (n % 251) as u8)
            .collect();
        let mut reader = Cursor::new(raw_data.clone());
        let mut l_out = Vec::new();

        let n_count = copy_large(&mut reader, &mut l_out).expect("copy");
        assert_eq!(n_count, raw_data.len() as u64);
        assert_eq!(l_out, raw_data);
    }

    #[test]
    fn copy_large_empty_source_yields_zero() {
        let mut l_out = Vec::new();
        let n_count = copy_large(&mut io::empty(), &mut l_out).expect("copy");
        assert_eq!(n_count, 0);
        assert!(l_out.is_empty());
    }

    #[test]
    fn copy_large_retries_interrupted_reads() {
        let mut reader = InterruptingReader {
            inner: Cursor::new(b"interrupted but complete".to_vec()),
            if_interrupt_next: false,
        };
        let mut l_out = Vec::new();
        let n_count = copy_large(&mut reader, &mut l_out).expect("copy");
        assert_eq!(n_count, 24);
        assert_eq!(l_out, b"interrupted but complete");
    }

    #[test]
    fn copy_large_wraps_write_failure() {
        let mut reader = Cursor::new(vec![7_u8; 10_000]);
        let mut writer = FailingWriter { n_accept: 5000 };
        let err = copy_large(&mut reader, &mut writer).expect_err("must fail");
        assert!(matches!(err, StreamError::Transfer(_)));
    }

    #[test]
    fn copy_large_rejects_empty_buffer() {
        let mut l_out = Vec::new();
        let err = copy_large_with_buffer(&mut io::empty(), &mut l_out, &mut [0_u8; 0])
            .expect_err("empty buffer must fail");
        assert!(matches!(err, StreamError::EmptyBuffer));
    }

    #[test]
    fn copy_large_handles_counts_beyond_i32() {
        let n_total = i32::MAX as u64 + 1;
        let mut reader = io::repeat(0xAB).take(n_total);
        let mut buffer = vec![0_u8; 1 << 20];

        let n_count =
            copy_large_with_buffer(&mut reader, &mut io::sink(), &mut buffer).expect("copy");
        assert_eq!(n_count, n_total);
    }

    #[test]
    fn copy_reports_overflow_sentinel() {
        let mut reader = io::repeat(0).take(i32::MAX as u64 + 1);
        let n_count = copy(&mut reader, &mut io::sink()).expect("copy");
        assert_eq!(n_count, N_COPY_OVERFLOW);

        let mut reader_small = Cursor::new(vec![1_u8; 100]);
        let n_count_small = copy(&mut reader_small, &mut io::sink()).expect("copy");
        assert_eq!(n_count_small, 100);
    }

    #[test]
    fn to_byte_array_collects_source() {
        let mut reader = Cursor::new(b"bytes".to_vec());
        assert_eq!(to_byte_array(&mut reader).expect("read"), b"bytes");
    }

    #[test]
    fn str_reader_splits_on_char_boundaries() {
        let mut reader = "aé中b";
        let mut buffer = String::new();
        assert_eq!(reader.read_chars(&mut buffer, 2).expect("read"), 2);
        assert_eq!(buffer, "aé");
        assert_eq!(reader.read_chars(&mut buffer, 10).expect("read"), 2);
        assert_eq!(buffer, "aé中b");
        assert_eq!(reader.read_chars(&mut buffer, 10).expect("read"), 0);
    }

    #[test]
    fn copy_chars_counts_characters_not_bytes() {
        let c_text = "é".repeat(N_DEFAULT_BUFFER_SIZE + 5);
        let mut reader = c_text.as_str();
        let mut c_out = String::new();

        let n_count = copy_chars_large(&mut reader, &mut c_out).expect("copy");
        assert_eq!(n_count, (N_DEFAULT_BUFFER_SIZE + 5) as u64);
        assert_eq!(c_out, c_text);

        let mut reader_again = "abc";
        let mut c_out_again = String::new();
        assert_eq!(copy_chars(&mut reader_again, &mut c_out_again).expect("copy"), 3);
    }
}
