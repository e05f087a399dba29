use std::sync::{Arc, Mutex};

use fxhash::FxHashMap;

use super::bank::EventDecoder;
use super::channel_registry::ChannelRegistry;
use super::config_manager::ConfigurationManager;
use super::config_parser::{ConfigTableParser, REQUIRED_CRATES};
use super::daq_config::DaqConfig;
use super::dump_file::DumpFile;
use super::error::ProcessorError;
use super::job::JobConfig;
use super::primitives::{DecodedPrimitive, TimestampRecord};

// Each dump record carries three header words ahead of its payload.
const RECORD_HEADER_WORDS: u64 = 3;
const WORD_SIZE: u64 = 4;

/// What one decoding job produced, for reporting by the caller.
#[derive(Debug, Default)]
pub struct JobSummary {
    pub banks_read: u64,
    pub failed_banks: u64,
    pub primitive_counts: FxHashMap<&'static str, u64>,
    pub first_timestamp: Option<TimestampRecord>,
    pub config: Option<Arc<DaqConfig>>,
}

/// The main loop of trigbank.
///
/// Gathers the per-crate configuration tables, publishes the configuration
/// through the manager once the cycle completes, then decodes every bank in
/// the dump file. A bank that fails to decode is dropped with an error log;
/// the rest of the dump is unaffected.
pub fn process(job: JobConfig, progress: Arc<Mutex<f32>>) -> Result<JobSummary, ProcessorError> {
    let registry = ChannelRegistry::new(job.channel_map_path.as_deref())?;
    spdlog::info!("Channel registry holds {} channels", registry.len());

    let manager = ConfigurationManager::new();
    let mut parser = ConfigTableParser::new();
    for crate_id in REQUIRED_CRATES {
        let table_path = job.table_file(crate_id);
        if !table_path.exists() {
            spdlog::warn!(
                "No configuration table for crate {} at {}",
                crate_id,
                table_path.to_string_lossy()
            );
            continue;
        }
        let table = std::fs::read_to_string(&table_path)?;
        parser.ingest(crate_id, job.run_number, &[table.as_str()]);
        manager.update(&parser, &registry);
    }

    match manager.get() {
        Some(config) => {
            for line in config.to_string().lines() {
                spdlog::info!("{}", line);
            }
        }
        None => {
            spdlog::warn!("Configuration cycle never completed; decoding banks without one");
        }
    }

    let mut dump = DumpFile::new(&job.dump_path)?;
    let total_bytes = dump.size_bytes();
    spdlog::info!(
        "Decoding dump of size: {}",
        human_bytes::human_bytes(total_bytes as f64)
    );

    let mut decoder = EventDecoder::new();
    let mut summary = JobSummary {
        config: manager.get(),
        ..Default::default()
    };
    let mut bytes_read: u64 = 0;
    while let Some(bank) = dump.next_bank()? {
        bytes_read += (RECORD_HEADER_WORDS + bank.words.len() as u64) * WORD_SIZE;
        summary.banks_read += 1;
        match decoder.decode(&bank) {
            Ok(primitives) => {
                for primitive in &primitives {
                    *summary.primitive_counts.entry(primitive.kind_name()).or_insert(0) += 1;
                    if summary.first_timestamp.is_none() {
                        if let DecodedPrimitive::Timestamp(record) = primitive {
                            summary.first_timestamp = Some(record.clone());
                        }
                    }
                }
            }
            Err(e) => {
                summary.failed_banks += 1;
                spdlog::error!("Dropping bank 0x{:X} from crate {}: {}", bank.tag, bank.crate_id, e);
            }
        }
        if let Ok(mut frac) = progress.lock() {
            *frac = bytes_read as f32 / total_bytes as f32;
        }
    }

    if let Ok(mut frac) = progress.lock() {
        *frac = 1.0;
    }
    if let Some(record) = &summary.first_timestamp {
        spdlog::info!("First event header: {}", record);
    }
    spdlog::info!(
        "Decoded {} banks ({} dropped)",
        summary.banks_read,
        summary.failed_banks
    );
    Ok(summary)
}
