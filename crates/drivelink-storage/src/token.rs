use std::future::Future;

use crate::storage::{StorageError, StorageResult};

pub(crate) const MAX_TOKEN_ATTEMPTS: usize = 10;

pub(crate) fn random_link_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Draw candidates until one is not taken by a current row.
pub(crate) async fn pick_unused_token<N, F, Fut>(mut next: N, mut taken: F) -> StorageResult<String>
where
    N: FnMut() -> String,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = StorageResult<bool>>,
{
    for _ in 0..MAX_TOKEN_ATTEMPTS {
        let candidate = next();
        if !taken(candidate.clone()).await? {
            return Ok(candidate);
        }
        tracing::warn!(token = %candidate, "link token collision, regenerating");
    }
    Err(StorageError::TokenExhausted(MAX_TOKEN_ATTEMPTS))
}
