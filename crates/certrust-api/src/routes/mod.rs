//! # API Route Modules
//!
//! - `organizations`: eligible directory rows and public keys.
//! - `certificates`: payload submission, credential proofs,
//!   re-verification and per-subject listing.
//! - `signatures`: signing, credential signature export and checks.
//!
//! RSA operations and store I/O block, so handlers run the core on the
//! blocking pool through [`blocking`].

pub mod certificates;
pub mod organizations;
pub mod signatures;

use crate::error::AppError;

/// Run a synchronous core call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {e}")))?
}
