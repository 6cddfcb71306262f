// SPDX-License-Identifier: Apache-2.0

/// Failure taxonomy for the export pipeline. Only `Config` ever surfaces to
/// the caller (synchronously, at construction); everything else is handled
/// on the flush path by requeueing into the capacity-bounded buffer.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("backend rejected {0} records")]
    PartialRejection(usize),

    #[error("credential error: {0}")]
    Credential(String),
}
