/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid dialect: {0}")]
    InvalidDialect(String),
    #[error("invalid severity: {0}")]
    InvalidSeverity(String),
    #[error("invalid comparison operator: {0}")]
    InvalidComparisonOp(String),
    #[error("invalid reducer function: {0}")]
    InvalidReducer(String),
    #[error("invalid ref id: {0}")]
    InvalidRefId(String),
    #[error("invalid sub-query name: {0}")]
    InvalidSubQueryName(String),
}
