use super::constants::{HEAD_BANK_SIZE, HEAD_BANK_TAG};
use super::error::BankError;
use super::primitives::TimestampRecord;

// Fixed word positions within the head bank.
const WORD_RUN: usize = 1;
const WORD_EVENT: usize = 2;
const WORD_UNIX_TIME: usize = 3;

/// Decoder for the fixed five-word event header bank.
///
/// The hardware writes a zero wall-clock stamp on events that fall between
/// clock latches, and occasionally a stale one. The decoder folds the last
/// known non-zero timestamp forward over zeros and never lets the stamp roll
/// backward once it has advanced.
#[derive(Debug, Default)]
pub struct HeadBankDecoder {
    last_timestamp: u32,
}

impl HeadBankDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, words: &[u32]) -> Result<TimestampRecord, BankError> {
        if words.len() != HEAD_BANK_SIZE {
            return Err(BankError::LengthMismatch {
                tag: HEAD_BANK_TAG,
                expected: HEAD_BANK_SIZE,
                found: words.len(),
            });
        }

        let reported = words[WORD_UNIX_TIME];
        let unix_time = if reported == 0 {
            self.last_timestamp
        } else if reported < self.last_timestamp {
            spdlog::warn!(
                "Head bank timestamp {} rolls back past {}; holding the later stamp",
                reported,
                self.last_timestamp
            );
            self.last_timestamp
        } else {
            self.last_timestamp = reported;
            reported
        };

        Ok(TimestampRecord {
            run: words[WORD_RUN],
            event: words[WORD_EVENT],
            unix_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_fields_decoded() {
        let mut decoder = HeadBankDecoder::new();
        let record = decoder.decode(&[2, 5772, 1_000_123, 1_423_000_000, 0]).unwrap();
        assert_eq!(record.run, 5772);
        assert_eq!(record.event, 1_000_123);
        assert_eq!(record.unix_time, 1_423_000_000);
    }

    #[test]
    fn test_wrong_word_count_is_fatal() {
        let mut decoder = HeadBankDecoder::new();
        let result = decoder.decode(&[2, 5772, 7, 0]);
        assert_eq!(
            result,
            Err(BankError::LengthMismatch {
                tag: HEAD_BANK_TAG,
                expected: 5,
                found: 4,
            })
        );
    }

    #[test]
    fn test_zero_timestamp_folds_forward() {
        let mut decoder = HeadBankDecoder::new();
        decoder.decode(&[2, 1, 1, 1_423_000_000, 0]).unwrap();
        let record = decoder.decode(&[2, 1, 2, 0, 0]).unwrap();
        assert_eq!(record.unix_time, 1_423_000_000);
    }

    #[test]
    fn test_timestamp_never_rolls_backward() {
        let mut decoder = HeadBankDecoder::new();
        decoder.decode(&[2, 1, 1, 1_423_000_100, 0]).unwrap();
        let record = decoder.decode(&[2, 1, 2, 1_423_000_050, 0]).unwrap();
        assert_eq!(record.unix_time, 1_423_000_100);
        // A later stamp still advances normally.
        let record = decoder.decode(&[2, 1, 3, 1_423_000_200, 0]).unwrap();
        assert_eq!(record.unix_time, 1_423_000_200);
    }

    #[test]
    fn test_leading_zero_stays_zero() {
        let mut decoder = HeadBankDecoder::new();
        let record = decoder.decode(&[2, 1, 1, 0, 0]).unwrap();
        assert_eq!(record.unix_time, 0);
    }
}
