use std::sync::{Arc, Mutex};

use super::channel_registry::ChannelRegistry;
use super::config_builder;
use super::config_parser::{ConfigTableParser, REQUIRED_CRATES};
use super::daq_config::DaqConfig;

/// Gate holding the most recent complete configuration.
///
/// An explicit handle passed to every consumer; there is no ambient global.
/// One writer drives `update` while any number of readers call `get` from
/// other threads. The slot is replaced as a whole `Arc`, so a reader always
/// sees either the previous complete tree or the new one, never a mix. An
/// incomplete cycle simply never publishes; the prior value (or nothing)
/// stays visible indefinitely.
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    current: Mutex<Option<Arc<DaqConfig>>>,
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble and publish a new configuration if the parser has heard from
    /// every required source crate; otherwise leave the current one alone.
    pub fn update(&self, parser: &ConfigTableParser, registry: &ChannelRegistry) {
        if !parser.has_required_crates() {
            spdlog::info!(
                "Configuration cycle incomplete ({} of {} crates); keeping previous configuration",
                parser.crates_seen(),
                REQUIRED_CRATES.len()
            );
            return;
        }

        let config = Arc::new(config_builder::build(parser, registry));
        match self.current.lock() {
            Ok(mut slot) => {
                *slot = Some(config);
                spdlog::info!("Published new DAQ configuration");
            }
            Err(_) => {
                spdlog::error!("Configuration slot mutex is poisoned; update dropped");
            }
        }
    }

    /// The last published configuration, or None before the first complete
    /// cycle.
    pub fn get(&self) -> Option<Arc<DaqConfig>> {
        match self.current.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => {
                spdlog::error!("Configuration slot mutex is poisoned; returning no configuration");
                None
            }
        }
    }
}
