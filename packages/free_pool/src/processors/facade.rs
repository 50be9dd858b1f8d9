#![cfg_attr(coverage_nightly, coverage(off))]

use std::fmt::Debug;
use std::io;
use std::num::NonZero;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::processors::MockProcessors;
use crate::processors::{BuildTargetProcessors, Processors};

/// Enum to hide the real/mock choice behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum ProcessorsFacade {
    Target(&'static BuildTargetProcessors),

    #[cfg(test)]
    Mock(Arc<MockProcessors>),
}

impl ProcessorsFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BuildTargetProcessors)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockProcessors) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Processors for ProcessorsFacade {
    fn processor_count(&self) -> Result<NonZero<usize>, io::Error> {
        match self {
            Self::Target(processors) => processors.processor_count(),
            #[cfg(test)]
            Self::Mock(mock) => mock.processor_count(),
        }
    }

    #[inline]
    fn current_processor_id(&self) -> Option<usize> {
        match self {
            Self::Target(processors) => processors.current_processor_id(),
            #[cfg(test)]
            Self::Mock(mock) => mock.current_processor_id(),
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl Debug for ProcessorsFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
