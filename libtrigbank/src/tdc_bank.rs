use super::constants::*;
use super::primitives::{DecodedPrimitive, TdcHit};

/// Decode the TDC bank: one hit per word, any number of words.
pub fn decode_tdc_bank(words: &[u32]) -> Vec<DecodedPrimitive> {
    words
        .iter()
        .map(|&word| {
            DecodedPrimitive::TdcHit(TdcHit {
                slot: ((word >> TDC_SLOT_SHIFT) & TDC_SLOT_MASK) as u8,
                channel: ((word >> TDC_CHANNEL_SHIFT) & TDC_CHANNEL_MASK) as u16,
                time: (word & TDC_TIME_MASK) as u16,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_fields_unpacked() {
        let word = (9 << TDC_SLOT_SHIFT) | (131 << TDC_CHANNEL_SHIFT) | 40_000;
        let hits = decode_tdc_bank(&[word]);
        assert_eq!(
            hits,
            vec![DecodedPrimitive::TdcHit(TdcHit {
                slot: 9,
                channel: 131,
                time: 40_000,
            })]
        );
    }

    #[test]
    fn test_empty_bank_is_fine() {
        assert!(decode_tdc_bank(&[]).is_empty());
    }
}
