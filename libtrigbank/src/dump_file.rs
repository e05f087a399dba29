use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};

use super::bank::RawBank;
use super::error::DumpError;

/// Reader for a bank dump file: a little-endian stream of records, each
/// `[tag][crate][word count][words ...]` as 32-bit values.
#[derive(Debug)]
pub struct DumpFile {
    handle: BufReader<File>,
    size_bytes: u64,
}

impl DumpFile {
    pub fn new(path: &Path) -> Result<Self, DumpError> {
        if !path.exists() {
            return Err(DumpError::BadFilePath(PathBuf::from(path)));
        }
        let file = File::open(path)?;
        let size_bytes = file.metadata()?.len();
        Ok(Self {
            handle: BufReader::new(file),
            size_bytes,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Read the next bank from the dump.
    ///
    /// Returns `Ok(None)` at a clean end of file; an end of file inside a
    /// record is an error.
    pub fn next_bank(&mut self) -> Result<Option<RawBank>, DumpError> {
        let tag = match self.handle.read_u32::<LittleEndian>() {
            Ok(tag) => tag,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(DumpError::IOError(e)),
        };
        let crate_id = self.read_word()?;
        let count = self.read_word()? as usize;
        let mut words = Vec::with_capacity(count);
        for _ in 0..count {
            words.push(self.read_word()?);
        }
        Ok(Some(RawBank::new(tag, crate_id as u8, words)))
    }

    fn read_word(&mut self) -> Result<u32, DumpError> {
        match self.handle.read_u32::<LittleEndian>() {
            Ok(word) => Ok(word),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(DumpError::TruncatedDump)
            }
            Err(e) => Err(DumpError::IOError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn write_dump(path: &Path, banks: &[(u32, u32, &[u32])]) {
        let mut buffer = Vec::new();
        for (tag, crate_id, words) in banks {
            buffer.write_u32::<LittleEndian>(*tag).unwrap();
            buffer.write_u32::<LittleEndian>(*crate_id).unwrap();
            buffer.write_u32::<LittleEndian>(words.len() as u32).unwrap();
            for word in *words {
                buffer.write_u32::<LittleEndian>(*word).unwrap();
            }
        }
        File::create(path).unwrap().write_all(&buffer).unwrap();
    }

    #[test]
    fn test_round_trip_two_banks() {
        let path = std::env::temp_dir().join("trigbank_dump_roundtrip.dat");
        write_dump(&path, &[(0xE10F, 37, &[2, 5772, 1, 1_423_000_000, 0]), (0xE107, 39, &[7])]);

        let mut dump = DumpFile::new(&path).unwrap();
        let first = dump.next_bank().unwrap().unwrap();
        assert_eq!(first.tag, 0xE10F);
        assert_eq!(first.crate_id, 37);
        assert_eq!(first.words.len(), 5);
        let second = dump.next_bank().unwrap().unwrap();
        assert_eq!(second.tag, 0xE107);
        assert_eq!(second.words, vec![7]);
        assert!(dump.next_bank().unwrap().is_none());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_truncated_record_is_an_error() {
        let path = std::env::temp_dir().join("trigbank_dump_truncated.dat");
        let mut buffer = Vec::new();
        buffer.write_u32::<LittleEndian>(0xE10F).unwrap();
        buffer.write_u32::<LittleEndian>(37).unwrap();
        buffer.write_u32::<LittleEndian>(5).unwrap();
        buffer.write_u32::<LittleEndian>(1).unwrap(); // only one of five words
        File::create(&path).unwrap().write_all(&buffer).unwrap();

        let mut dump = DumpFile::new(&path).unwrap();
        assert!(matches!(dump.next_bank(), Err(DumpError::TruncatedDump)));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            DumpFile::new(Path::new("/nonexistent/banks.dat")),
            Err(DumpError::BadFilePath(_))
        ));
    }
}
