use std::path::PathBuf;

use crate::{model, parser::ParseError, projector::ProjectionError, validator};

/// Any error that aborts a compilation or validation run.
///
/// Conformance mismatches are not errors: they are collected into a
/// [`validator::ValidationReport`].
#[derive(Debug, thiserror::Error)]
pub enum PchorError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),
    #[error("binding error: {0}")]
    Binding(#[from] validator::Error),
    #[error("program model error: {0}")]
    Model(#[from] model::Error),
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output")]
    Output(#[from] std::io::Error),
}
