//! # Backend Selector

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    segmentation::{AcceleratedBackend, ReferenceBackend, SegmentationBackend},
    types::TokenType,
    vocab::PrefixIndex,
};

/// Which [`SegmentationBackend`] to build.
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::EnumIter,
    strum::Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum BackendSelector {
    /// See: [`ReferenceBackend`].
    Reference,

    /// See: [`AcceleratedBackend`].
    #[default]
    Accelerated,
}

impl BackendSelector {
    /// Select from an "accelerated" flag.
    pub fn from_accelerated(accelerated: bool) -> Self {
        if accelerated {
            Self::Accelerated
        } else {
            Self::Reference
        }
    }

    /// Build the selected backend.
    ///
    /// If the accelerated layout cannot be built, a warning is logged
    /// and the reference backend is returned.
    pub fn build<T: TokenType>(
        self,
        index: Arc<PrefixIndex<T>>,
    ) -> Arc<dyn SegmentationBackend<T>> {
        match self {
            Self::Reference => Arc::new(ReferenceBackend::new(index)),
            Self::Accelerated => match AcceleratedBackend::try_build(&index) {
                Ok(backend) => Arc::new(backend),
                Err(err) => {
                    log::warn!("accelerated backend unavailable, using reference: {err}");
                    Arc::new(ReferenceBackend::new(index))
                }
            },
        }
    }
}
