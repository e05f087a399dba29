use std::fmt;

use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

/// A hardware cluster reported by either trigger processor generation.
///
/// The x and y indices are decoded from two's-complement bit fields and can
/// be negative; index zero does not exist on the physical detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub x: i16,
    pub y: i16,
    pub energy_mev: u32,
    pub hit_count: u8,
    pub time_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinglesTrigger {
    pub instance: u8,
    pub pass_bits: u16,
    pub is_top: bool,
    pub time_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairsTrigger {
    pub instance: u8,
    pub pass_bits: u16,
    pub time_ns: u64,
}

/// Source of a calibration trigger report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationKind {
    Cosmic,
    Led,
    Hodoscope,
    Pulser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationTrigger {
    pub kind: CalibrationKind,
    pub time_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplicityTrigger {
    pub top_count: u8,
    pub bot_count: u8,
    pub total_count: u8,
    pub instance: u8,
    pub time_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeTrigger {
    /// One bit per calorimeter region, region 0 in the least significant bit.
    pub region_bits: u8,
    pub time_ns: u64,
}

/// Run/event identity and wall-clock stamp from the event header bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampRecord {
    pub run: u32,
    pub event: u32,
    pub unix_time: u32,
}

impl fmt::Display for TimestampRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = OffsetDateTime::from_unix_timestamp(self.unix_time as i64)
            .ok()
            .and_then(|t| t.format(&Rfc2822).ok())
            .unwrap_or_else(|| String::from("unknown time"));
        write!(f, "run {} event {} at {}", self.run, self.event, stamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TdcHit {
    pub slot: u8,
    pub channel: u16,
    /// Raw TDC ticks; the TDC runs on its own clock.
    pub time: u16,
}

/// The decoded timing-summary bank: which trigger paths fired, plus the
/// 48-bit monotonic clock reading in nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingSummary {
    pub singles: [bool; 2],
    pub pairs: [bool; 2],
    pub calibration: bool,
    pub pulser: bool,
    pub trigger_number: u32,
    pub time_ns: u64,
}

/// Decoded legacy test-run trigger bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTriggerCounts {
    pub time_ns: u64,
    pub and_count: u32,
    pub or_count: u32,
    pub top_count: u32,
    pub bottom_count: u32,
    pub pair_count: u32,
}

/// One decoded trigger primitive.
///
/// The variant is fixed at decode time by the bank tag and the record's
/// type bits; consumers match on this exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPrimitive {
    Cluster(Cluster),
    Singles(SinglesTrigger),
    Pairs(PairsTrigger),
    Calibration(CalibrationTrigger),
    Multiplicity(MultiplicityTrigger),
    Fee(FeeTrigger),
    Timestamp(TimestampRecord),
    TdcHit(TdcHit),
    TimingSummary(TimingSummary),
    LegacyCounts(LegacyTriggerCounts),
}

impl DecodedPrimitive {
    /// Short label used in log output and the CLI summary.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DecodedPrimitive::Cluster(_) => "cluster",
            DecodedPrimitive::Singles(_) => "singles",
            DecodedPrimitive::Pairs(_) => "pairs",
            DecodedPrimitive::Calibration(_) => "calibration",
            DecodedPrimitive::Multiplicity(_) => "multiplicity",
            DecodedPrimitive::Fee(_) => "fee",
            DecodedPrimitive::Timestamp(_) => "timestamp",
            DecodedPrimitive::TdcHit(_) => "tdc",
            DecodedPrimitive::TimingSummary(_) => "timing",
            DecodedPrimitive::LegacyCounts(_) => "legacy",
        }
    }
}
