use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MoldError, Result};

/// Run-scoped cancellation flag shared between the caller and the analysis.
///
/// Clones observe the same flag. The analysis polls it between faces,
/// direction candidates and refinement steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fails with [`MoldError::Cancelled`] once cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`MoldError::Cancelled`] if the token was cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MoldError::Cancelled)
        } else {
            Ok(())
        }
    }
}
