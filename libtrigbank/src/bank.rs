use super::constants::*;
use super::error::BankError;
use super::head_bank::HeadBankDecoder;
use super::primitives::{Cluster, DecodedPrimitive};
use super::tdc_bank::decode_tdc_bank;
use super::test_run_bank::decode_test_run_bank;
use super::ti_bank::decode_timing_bank;
use super::trigger_bank::decode_trigger_bank;
use super::vtp_bank::decode_vtp_bank;

/// One raw bank as delivered by the event source: a format tag, the crate
/// that produced it, and its payload words. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBank {
    pub tag: u32,
    pub crate_id: u8,
    pub words: Vec<u32>,
}

impl RawBank {
    pub fn new(tag: u32, crate_id: u8, words: Vec<u32>) -> Self {
        Self {
            tag,
            crate_id,
            words,
        }
    }
}

/// Routes raw banks to the decoder registered for their tag.
///
/// All decoders are pure functions of the bank words except the head-bank
/// decoder, whose sticky-timestamp fold is the only state carried here.
#[derive(Debug, Default)]
pub struct EventDecoder {
    head: HeadBankDecoder,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one bank into its primitives.
    ///
    /// A failed bank produces no primitives but does not affect any other
    /// bank in the same event.
    pub fn decode(&mut self, bank: &RawBank) -> Result<Vec<DecodedPrimitive>, BankError> {
        match bank.tag {
            HEAD_BANK_TAG => {
                let record = self.head.decode(&bank.words)?;
                Ok(vec![DecodedPrimitive::Timestamp(record)])
            }
            TIMING_BANK_TAG => {
                let summary = decode_timing_bank(&bank.words)?;
                Ok(vec![DecodedPrimitive::TimingSummary(summary)])
            }
            TRIGGER_BANK_TAG => decode_trigger_bank(&bank.words),
            VTP_BANK_TAG => decode_vtp_bank(&bank.words),
            TEST_RUN_BANK_TAG => {
                let counts = decode_test_run_bank(&bank.words)?;
                Ok(vec![DecodedPrimitive::LegacyCounts(counts)])
            }
            TDC_BANK_TAG => Ok(decode_tdc_bank(&bank.words)),
            other => Err(BankError::UnknownTag(other)),
        }
    }
}

/// Reconstruct a signed integer from a two's-complement field of `bits` width.
pub(crate) fn sign_extend(raw: u32, bits: u32) -> i16 {
    let sign = 1u32 << (bits - 1);
    if raw & sign != 0 {
        (raw as i32 - (1i32 << bits)) as i16
    } else {
        raw as i16
    }
}

/// Decode a two-word cluster record, shared by both trigger bank generations.
///
/// Out-of-domain values are reported as warnings and the cluster is still
/// returned; the hardware occasionally emits malformed-but-parseable records
/// and the rest of the event must survive.
pub(crate) fn decode_cluster(word0: u32, word1: u32) -> Cluster {
    let energy_mev = (word0 >> CLUSTER_ENERGY_SHIFT) & CLUSTER_ENERGY_MASK;
    let y = sign_extend((word0 >> CLUSTER_Y_SHIFT) & ((1 << CLUSTER_Y_BITS) - 1), CLUSTER_Y_BITS);
    let x = sign_extend(word0 & ((1 << CLUSTER_X_BITS) - 1), CLUSTER_X_BITS);
    let ticks = ((word1 >> CLUSTER_TIME_SHIFT) & CLUSTER_TIME_MASK) as u64;
    let hit_count = (word1 & CLUSTER_HITS_MASK) as u8;

    if x == 0 || !(X_INDEX_MIN..=X_INDEX_MAX).contains(&x) {
        spdlog::warn!("Cluster x index {} is outside the physical detector", x);
    }
    if y == 0 || !(Y_INDEX_MIN..=Y_INDEX_MAX).contains(&y) {
        spdlog::warn!("Cluster y index {} is outside the physical detector", y);
    }
    if hit_count == 0 {
        spdlog::warn!("Cluster at ({}, {}) reports zero hits", x, y);
    }

    Cluster {
        x,
        y,
        energy_mev,
        hit_count,
        time_ns: ticks * CLOCK_NS_PER_TICK,
    }
}

/// Encode a cluster back into its two-word representation. Used by the round
/// trip tests and by the dump tooling.
pub fn encode_cluster(cluster: &Cluster) -> [u32; 2] {
    let word0 = DEFINING_WORD_BIT
        | (RECORD_CLUSTER << RECORD_TYPE_SHIFT)
        | ((cluster.energy_mev & CLUSTER_ENERGY_MASK) << CLUSTER_ENERGY_SHIFT)
        | (((cluster.y as u32) & ((1 << CLUSTER_Y_BITS) - 1)) << CLUSTER_Y_SHIFT)
        | ((cluster.x as u32) & ((1 << CLUSTER_X_BITS) - 1));
    let ticks = (cluster.time_ns / CLOCK_NS_PER_TICK) as u32;
    let word1 =
        ((ticks & CLUSTER_TIME_MASK) << CLUSTER_TIME_SHIFT) | (cluster.hit_count as u32 & CLUSTER_HITS_MASK);
    [word0, word1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend_boundaries() {
        assert_eq!(sign_extend(0b101010, 6), -22);
        assert_eq!(sign_extend(0b010111, 6), 23);
        assert_eq!(sign_extend(0b1011, 4), -5);
        assert_eq!(sign_extend(0b0101, 4), 5);
        assert_eq!(sign_extend(0, 6), 0);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut decoder = EventDecoder::new();
        let bank = RawBank::new(0xBEEF, 37, vec![0, 0, 0]);
        assert_eq!(
            decoder.decode(&bank),
            Err(BankError::UnknownTag(0xBEEF))
        );
    }

    #[test]
    fn test_cluster_round_trip_boundary_indices() {
        for (x, y) in [(-22i16, -5i16), (23, 5), (-1, 1), (1, -1)] {
            let cluster = Cluster {
                x,
                y,
                energy_mev: 3122,
                hit_count: 4,
                time_ns: 248,
            };
            let words = encode_cluster(&cluster);
            assert_eq!(decode_cluster(words[0], words[1]), cluster);
        }
    }
}
