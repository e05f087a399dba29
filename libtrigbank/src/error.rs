use std::path::PathBuf;
use thiserror::Error;

use super::constants::CHANNEL_COUNT;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("Bank 0x{tag:X} has {found} words; expected {expected}")]
    LengthMismatch {
        tag: u32,
        expected: usize,
        found: usize,
    },
    #[error("Expected bank tag 0x{expected:X} but found 0x{found:X}")]
    TagMismatch { expected: u32, found: u32 },
    #[error("Bank 0x{tag:X} record starting at word {index} is missing its continuation word")]
    TruncatedRecord { tag: u32, index: usize },
    #[error("No decoder is registered for bank tag 0x{0:X}")]
    UnknownTag(u32),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("ChannelRegistry failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("ChannelRegistry failed to parse an integer: {0}")]
    ParsingError(#[from] std::num::ParseIntError),
    #[error("ChannelRegistry was given a file with the incorrect format; most likely the number of columns is incorrect")]
    BadFileFormat,
    #[error("ChannelRegistry entry carries channel id {0} outside 1..={max}", max = CHANNEL_COUNT)]
    BadChannelId(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalibrationError {
    #[error("Channel id {0} is outside the valid range 1..={max}", max = CHANNEL_COUNT)]
    OutOfRange(u16),
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to load job configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Job configuration failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Job configuration failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Could not open bank dump because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Bank dump ended in the middle of a record")]
    TruncatedDump,
    #[error("Bank dump failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to job configuration error: {0}")]
    JobError(#[from] JobError),
    #[error("Processor failed due to ChannelRegistry error: {0}")]
    RegistryError(#[from] RegistryError),
    #[error("Processor failed due to bank dump error: {0}")]
    DumpError(#[from] DumpError),
    #[error("Processor failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}
