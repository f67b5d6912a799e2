//! Deletions that must respect references the schema does not enforce.

use drivelink_storage::{Storage, StorageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Still referenced by this many rows.
    InUse(usize),
}

/// Refuse while any link points at the account.
///
/// A redemption that already resolved the link may still be in flight when the
/// account goes away; the engine then reports the account as missing.
pub async fn delete_account_guarded(
    storage: &dyn Storage,
    account_id: i64,
) -> StorageResult<DeleteOutcome> {
    if storage.get_account(account_id).await?.is_none() {
        return Ok(DeleteOutcome::NotFound);
    }
    let links = storage.list_links_by_account(account_id).await?;
    if !links.is_empty() {
        tracing::info!(account_id, links = links.len(), "account delete refused");
        return Ok(DeleteOutcome::InUse(links.len()));
    }
    if storage.delete_account(account_id).await? {
        Ok(DeleteOutcome::Deleted)
    } else {
        Ok(DeleteOutcome::NotFound)
    }
}

/// Refuse while any account is bound to the template.
pub async fn delete_provider_guarded(
    storage: &dyn Storage,
    provider_name: &str,
) -> StorageResult<DeleteOutcome> {
    if storage.get_provider(provider_name).await?.is_none() {
        return Ok(DeleteOutcome::NotFound);
    }
    let accounts = storage.list_accounts_by_provider(provider_name).await?;
    if !accounts.is_empty() {
        tracing::info!(provider = provider_name, accounts = accounts.len(), "provider delete refused");
        return Ok(DeleteOutcome::InUse(accounts.len()));
    }
    if storage.delete_provider(provider_name).await? {
        Ok(DeleteOutcome::Deleted)
    } else {
        Ok(DeleteOutcome::NotFound)
    }
}
