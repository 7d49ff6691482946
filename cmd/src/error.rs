/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read alert export {0}: {1}")]
    ReadExport(PathBuf, std::io::Error),
    #[error("failed to decode alert export {0}: {1}")]
    DecodeExport(PathBuf, serde_json::Error),
    #[error("failed to create output directory {0}: {1}")]
    CreateOutDir(PathBuf, std::io::Error),
    #[error("failed to write alert rule {0}: {1}")]
    WriteRule(PathBuf, std::io::Error),
    #[error("failed to encode alert rule: {0}")]
    EncodeRule(serde_json::Error),
}
