use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::JobError;

/// Structure representing one decoding job. Contains pathing and run information
/// Jobs are serializable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// The bank dump file to decode.
    pub dump_path: PathBuf,
    /// Directory holding one `crate_<N>.cnf` table per source crate.
    pub table_path: PathBuf,
    /// Channel map CSV; None uses the bundled default.
    pub channel_map_path: Option<PathBuf>,
    pub run_number: u32,
}

impl Default for JobConfig {
    /// Generate a new JobConfig object. All fields will be empty/invalid
    fn default() -> Self {
        Self {
            dump_path: PathBuf::from("None"),
            table_path: PathBuf::from("None"),
            channel_map_path: None,
            run_number: 0,
        }
    }
}

impl JobConfig {
    /// Read the job configuration in a YAML file
    /// Returns a JobConfig if successful
    pub fn read_job_file(job_path: &Path) -> Result<Self, JobError> {
        if !job_path.exists() {
            return Err(JobError::BadFilePath(job_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(job_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Path of the configuration table dumped by one crate.
    pub fn table_file(&self, crate_id: u8) -> PathBuf {
        self.table_path.join(format!("crate_{crate_id}.cnf"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_file_naming() {
        let job = JobConfig {
            table_path: PathBuf::from("/data/run_5772"),
            ..Default::default()
        };
        assert_eq!(
            job.table_file(37),
            PathBuf::from("/data/run_5772/crate_37.cnf")
        );
    }
}
