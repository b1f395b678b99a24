//! Hex digests of byte streams.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::file::open_file_input;
use crate::spec::{StreamError, TransferError};
use crate::stream::copy_large;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumDigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl fmt::Display for EnumDigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_name = match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        };
        f.write_str(c_name)
    }
}

/// Lower-case hex digest of everything `reader` yields.
///
/// The reader is consumed and dropped before returning, on success or error.
pub fn digest_hex<R: Read>(
    reader: R,
    algorithm: EnumDigestAlgorithm,
) -> Result<String, StreamError> {
    match algorithm {
        EnumDigestAlgorithm::Md5 => _digest_reader::<Md5, R>(reader),
        EnumDigestAlgorithm::Sha1 => _digest_reader::<Sha1, R>(reader),
        EnumDigestAlgorithm::Sha256 => _digest_reader::<Sha256, R>(reader),
        EnumDigestAlgorithm::Sha384 => _digest_reader::<Sha384, R>(reader),
        EnumDigestAlgorithm::Sha512 => _digest_reader::<Sha512, R>(reader),
    }
}

fn _digest_reader<D, R>(mut reader: R) -> Result<String, StreamError>
where
    D: Digest + Write,
    R: Read,
{
    let mut hasher = D::new();
    copy_large(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

pub fn md5_hex<R: Read>(reader: R) -> Result<String, StreamError> {
    digest_hex(reader, EnumDigestAlgorithm::Md5)
}

pub fn sha1_hex<R: Read>(reader: R) -> Result<String, StreamError> {
    digest_hex(reader, EnumDigestAlgorithm::Sha1)
}

/// Digest of a file's content.
pub fn digest_hex_file<P: AsRef<Path>>(
    file: P,
    algorithm: EnumDigestAlgorithm,
) -> Result<String, TransferError> {
    let reader: BufReader<File> = BufReader::new(open_file_input(file)?);
    Ok(digest_hex(reader, algorithm)?)
}

pub fn md5_hex_file<P: AsRef<Path>>(file: P) -> Result<String, TransferError> {
    digest_hex_file(file, EnumDigestAlgorithm::Md5)
}

pub fn sha1_hex_file<P: AsRef<Path>>(file: P) -> Result<String, TransferError> {
    digest_hex_file(file, EnumDigestAlgorithm::Sha1)
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use tempfile::TempDir;

    use super::{EnumDigestAlgorithm, digest_hex, md5_hex, md5_hex_file, sha1_hex, sha1_hex_file};
    use crate::spec::{StreamError, TransferError};

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk gone"))
        }
    }

    #[test]
    fn known_vectors() {
        assert_eq!(md5_hex(&b""[..]).expect("md5"), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(&b"abc"[..]).expect("md5"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(
            sha1_hex(&b"abc"[..]).expect("sha1"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            digest_hex(&b"abc"[..], EnumDigestAlgorithm::Sha256).expect("sha256"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            digest_hex(&b"abc"[..], EnumDigestAlgorithm::Sha384)
                .expect("sha384")
                .len(),
            96
        );
        assert_eq!(
            digest_hex(&b"abc"[..], EnumDigestAlgorithm::Sha512)
                .expect("sha512")
                .len(),
            128
        );
    }

    #[test]
    fn digest_propagates_read_failure() {
        let err = md5_hex(BrokenReader).expect_err("must fail");
        assert!(matches!(err, StreamError::Transfer(_)));
    }

    #[test]
    fn digest_of_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path_file = tmp.path().join("abc.txt");
        std::fs::write(&path_file, "abc").expect("write");

        assert_eq!(
            md5_hex_file(&path_file).expect("md5"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            sha1_hex_file(&path_file).expect("sha1"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert!(matches!(
            md5_hex_file(tmp.path().join("none")),
            Err(TransferError::SourceMissing { .. })
        ));
    }

    #[test]
    fn algorithm_names() {
        assert_eq!(EnumDigestAlgorithm::Sha256.to_string(), "SHA-256");
        assert_eq!(EnumDigestAlgorithm::Md5.to_string(), "MD5");
    }
}
