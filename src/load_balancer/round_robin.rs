//! Round-robin backend registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::{BackendTarget, ConfigurationError};

/// Fixed, ordered set of backends plus the rotation cursor.
///
/// The target list never changes after construction; the cursor is the only
/// mutable state and is advanced with a single atomic increment-and-wrap, so
/// every call to [`select_next`](Self::select_next) sees a distinct index.
#[derive(Debug)]
pub struct BackendRegistry {
    targets: Vec<Arc<BackendTarget>>,
    cursor: AtomicUsize,
}

impl BackendRegistry {
    /// Build a registry from backend addresses, in rotation order.
    ///
    /// Fails on the first address that does not parse, or when `addresses`
    /// is empty. Nothing is constructed on failure.
    pub fn new<I, S>(addresses: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets = addresses
            .into_iter()
            .map(|address| BackendTarget::parse(address.as_ref()).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        if targets.is_empty() {
            return Err(ConfigurationError::NoBackends);
        }

        Ok(Self {
            targets,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Return the backend at the cursor and advance the cursor by one, wrapping.
    pub fn select_next(&self) -> Arc<BackendTarget> {
        let len = self.targets.len();
        // Closure always returns Some, so this never yields Err.
        let index = match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
        {
            Ok(prev) | Err(prev) => prev,
        };
        self.targets[index].clone()
    }

    /// Number of backends in rotation.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Always false for a constructed registry.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Backends in rotation order.
    pub fn targets(&self) -> impl Iterator<Item = &BackendTarget> {
        self.targets.iter().map(|t| t.as_ref())
    }
}
