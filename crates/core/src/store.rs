//! External collaborators of the navigator: where protocols come from and where finished
//! answer logs go.
//!
//! The navigator itself never touches storage. Callers load a [`Protocol`] through a
//! [`ProtocolStore`], drive a run, then hand the [`CompletedRun`] to an [`AnswerSink`].
//!
//! File layout:
//! - protocols: `<protocol_dir>/<protocol_id>.yaml`
//! - answers: `<answer_dir>/<protocol_id>/<run_id>.json`

use crate::config::CoreConfig;
use crate::constants::{ANSWER_FILE_EXTENSION, PROTOCOL_FILE_EXTENSION};
use crate::navigator::CompletedRun;
use crate::{CoreError, CoreResult};
use protocol::{Identifier, Protocol, ProtocolFile};
use std::fs;
use std::path::PathBuf;

/// Supplies protocol definitions at run start.
pub trait ProtocolStore {
    fn load(&self, protocol_id: &Identifier) -> CoreResult<Protocol>;
}

/// Persists finished answer logs.
pub trait AnswerSink {
    fn persist(&self, run: &CompletedRun) -> CoreResult<()>;
}

/// Reads YAML protocol files from a directory.
#[derive(Clone, Debug)]
pub struct FileProtocolStore {
    protocol_dir: PathBuf,
}

impl FileProtocolStore {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            protocol_dir: cfg.protocol_dir().to_path_buf(),
        }
    }

    /// Path of the file holding `protocol_id`.
    ///
    /// [`Identifier`]s cannot contain path separators, so the result always stays inside
    /// the protocol directory.
    pub fn protocol_path(&self, protocol_id: &Identifier) -> PathBuf {
        self.protocol_dir
            .join(format!("{protocol_id}.{PROTOCOL_FILE_EXTENSION}"))
    }
}

impl ProtocolStore for FileProtocolStore {
    fn load(&self, protocol_id: &Identifier) -> CoreResult<Protocol> {
        let path = self.protocol_path(protocol_id);
        if !path.is_file() {
            return Err(CoreError::ProtocolNotFound(path));
        }

        let contents = fs::read_to_string(&path).map_err(CoreError::FileRead)?;
        let protocol = ProtocolFile::parse(&contents)?;

        if protocol.id() != protocol_id {
            tracing::warn!(
                "protocol file {} declares id {}",
                path.display(),
                protocol.id()
            );
        }

        Ok(protocol)
    }
}

/// Writes each completed run as a pretty-printed JSON file.
#[derive(Clone, Debug)]
pub struct JsonAnswerSink {
    answer_dir: PathBuf,
}

impl JsonAnswerSink {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            answer_dir: cfg.answer_dir().to_path_buf(),
        }
    }

    pub fn run_path(&self, run: &CompletedRun) -> PathBuf {
        self.answer_dir
            .join(run.protocol_id.as_str())
            .join(format!("{}.{ANSWER_FILE_EXTENSION}", run.run_id))
    }
}

impl AnswerSink for JsonAnswerSink {
    fn persist(&self, run: &CompletedRun) -> CoreResult<()> {
        let path = self.run_path(run);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(CoreError::StorageDirCreation)?;
        }

        let json = serde_json::to_string_pretty(run).map_err(CoreError::Serialization)?;
        fs::write(&path, json).map_err(CoreError::FileWrite)?;

        tracing::info!(
            "persisted {} answers for run {} to {}",
            run.answers.len(),
            run.run_id,
            path.display()
        );
        Ok(())
    }
}
