//! In-memory repository adapter.
//!
//! Backed by `DashMap`s. Atomicity of key registration and status updates
//! comes from holding the shard guard of the affected entry for the whole
//! check-and-write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use gateway_types::{
    Account, AccountId, AccountRepository, ApiKey, DomainError, Invoice, InvoiceId,
    InvoiceRepository, InvoiceStatus, RepoError,
};

use crate::security::hash_api_key;

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryRepo {
    accounts: DashMap<AccountId, Account>,
    /// key hash -> key record
    api_keys: DashMap<String, ApiKey>,
    /// account -> hash of its active key
    account_keys: DashMap<AccountId, String>,
    invoices: DashMap<InvoiceId, Invoice>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryRepo {
    async fn create_account(&self, account: Account) -> Result<Account, RepoError> {
        match self.accounts.entry(account.id) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!(
                "account {} already exists",
                account.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(account.clone());
                Ok(account)
            }
        }
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        Ok(self.accounts.get(&id).map(|a| a.value().clone()))
    }

    async fn delete_account(&self, id: AccountId) -> Result<(), RepoError> {
        if let Some((_, key_hash)) = self.account_keys.remove(&id) {
            self.api_keys.remove(&key_hash);
        }
        self.accounts.remove(&id);
        Ok(())
    }

    async fn register_api_key(
        &self,
        account_id: AccountId,
        raw_key: &str,
    ) -> Result<(), RepoError> {
        if !self.accounts.contains_key(&account_id) {
            return Err(DomainError::AccountNotFound.into());
        }

        let key_hash = hash_api_key(raw_key);

        // Guard on the account's slot serialises registrations per account.
        let active = self.account_keys.entry(account_id);

        match self.api_keys.entry(key_hash.clone()) {
            Entry::Occupied(_) => return Err(DomainError::DuplicatedApiKey.into()),
            Entry::Vacant(slot) => {
                slot.insert(ApiKey::new(account_id, key_hash.clone()));
            }
        }

        match active {
            Entry::Occupied(mut slot) => {
                let previous = slot.insert(key_hash);
                self.api_keys.remove(&previous);
            }
            Entry::Vacant(slot) => {
                slot.insert(key_hash);
            }
        }

        Ok(())
    }

    async fn resolve_account_by_api_key(&self, raw_key: &str) -> Result<AccountId, RepoError> {
        self.api_keys
            .get(&hash_api_key(raw_key))
            .map(|k| k.account_id)
            .ok_or(RepoError::Domain(DomainError::AccountNotFound))
    }

    async fn generate_api_key(&self, account_id: AccountId) -> Result<String, RepoError> {
        crate::register_generated_key(self, account_id).await
    }
}

#[async_trait]
impl InvoiceRepository for MemoryRepo {
    async fn save(&self, invoice: &Invoice) -> Result<(), RepoError> {
        match self.invoices.entry(invoice.id()) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!(
                "invoice {} already exists",
                invoice.id()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(invoice.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepoError> {
        Ok(self.invoices.get(&id).map(|i| i.value().clone()))
    }

    async fn list_by_account(&self, account_id: AccountId) -> Result<Vec<Invoice>, RepoError> {
        let mut invoices: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|i| i.account_id() == account_id)
            .map(|i| i.value().clone())
            .collect();
        invoices.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(invoices)
    }

    async fn update_status(
        &self,
        id: InvoiceId,
        expected: InvoiceStatus,
        new_status: InvoiceStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let mut stored = self.invoices.get_mut(&id).ok_or(RepoError::NotFound)?;

        if stored.status() != expected {
            return Err(DomainError::InvalidStatus.into());
        }

        let current = stored.value();
        let updated = Invoice::from_parts(
            current.id(),
            current.account_id(),
            current.amount(),
            new_status,
            current.description().to_string(),
            current.payment_type().to_string(),
            current.card_last_digits().to_string(),
            current.created_at(),
            updated_at,
        );
        *stored = updated;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gateway_types::CardDetails;

    use super::*;

    async fn repo_with_account() -> (MemoryRepo, AccountId) {
        let repo = MemoryRepo::new();
        let account = Account::new("Acme".into(), "ops@acme.test".into()).unwrap();
        let account = repo.create_account(account).await.unwrap();
        (repo, account.id)
    }

    fn invoice_for(account_id: AccountId, amount: f64) -> Invoice {
        Invoice::new(
            account_id,
            amount,
            "test".into(),
            "credit_card".into(),
            CardDetails {
                number: "4111111111111111".into(),
                holder_name: "John Doe".into(),
                expiration_month: 12,
                expiration_year: 2099,
                cvv: "123".into(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_and_resolve_key() {
        let (repo, account_id) = repo_with_account().await;

        repo.register_api_key(account_id, "k1").await.unwrap();

        assert_eq!(repo.resolve_account_by_api_key("k1").await.unwrap(), account_id);
    }

    #[tokio::test]
    async fn test_unknown_key_is_account_not_found() {
        let repo = MemoryRepo::new();

        let err = repo.resolve_account_by_api_key("nope").await.unwrap_err();

        assert_eq!(err.domain(), Some(&DomainError::AccountNotFound));
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected_for_any_account() {
        let (repo, first) = repo_with_account().await;
        let second = repo
            .create_account(Account::new("Other".into(), "o@o.test".into()).unwrap())
            .await
            .unwrap()
            .id;

        repo.register_api_key(first, "k1").await.unwrap();

        let err = repo.register_api_key(first, "k1").await.unwrap_err();
        assert_eq!(err.domain(), Some(&DomainError::DuplicatedApiKey));

        let err = repo.register_api_key(second, "k1").await.unwrap_err();
        assert_eq!(err.domain(), Some(&DomainError::DuplicatedApiKey));

        assert_eq!(repo.resolve_account_by_api_key("k1").await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_new_key_replaces_previous() {
        let (repo, account_id) = repo_with_account().await;

        repo.register_api_key(account_id, "old").await.unwrap();
        repo.register_api_key(account_id, "new").await.unwrap();

        assert!(repo.resolve_account_by_api_key("old").await.is_err());
        assert_eq!(repo.resolve_account_by_api_key("new").await.unwrap(), account_id);
    }

    #[tokio::test]
    async fn test_delete_account_revokes_key() {
        let (repo, account_id) = repo_with_account().await;
        repo.register_api_key(account_id, "k1").await.unwrap();

        repo.delete_account(account_id).await.unwrap();
        repo.delete_account(account_id).await.unwrap();

        assert!(repo.get_account(account_id).await.unwrap().is_none());
        assert!(repo.resolve_account_by_api_key("k1").await.is_err());
    }

    #[tokio::test]
    async fn test_register_for_missing_account() {
        let repo = MemoryRepo::new();

        let err = repo.register_api_key(AccountId::new(), "k1").await.unwrap_err();

        assert_eq!(err.domain(), Some(&DomainError::AccountNotFound));
    }

    #[tokio::test]
    async fn test_generated_key_resolves() {
        let (repo, account_id) = repo_with_account().await;

        let raw = repo.generate_api_key(account_id).await.unwrap();

        assert_eq!(repo.resolve_account_by_api_key(&raw).await.unwrap(), account_id);
    }

    #[tokio::test]
    async fn test_save_find_and_list() {
        let (repo, account_id) = repo_with_account().await;
        let first = invoice_for(account_id, 10.0);
        let second = invoice_for(account_id, 20.0);
        repo.save(&first).await.unwrap();
        repo.save(&second).await.unwrap();
        repo.save(&invoice_for(AccountId::new(), 30.0)).await.unwrap();

        assert_eq!(repo.find_by_id(first.id()).await.unwrap(), Some(first.clone()));
        assert!(repo.find_by_id(InvoiceId::new()).await.unwrap().is_none());

        let listed = repo.list_by_account(account_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at() >= listed[1].created_at());
    }

    #[tokio::test]
    async fn test_update_status_compare_and_swap() {
        let (repo, account_id) = repo_with_account().await;
        let invoice = invoice_for(account_id, 10.0);
        repo.save(&invoice).await.unwrap();

        repo.update_status(
            invoice.id(),
            InvoiceStatus::Pending,
            InvoiceStatus::Approved,
            Utc::now(),
        )
        .await
        .unwrap();

        let err = repo
            .update_status(
                invoice.id(),
                InvoiceStatus::Pending,
                InvoiceStatus::Rejected,
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.domain(), Some(&DomainError::InvalidStatus));

        let stored = repo.find_by_id(invoice.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), InvoiceStatus::Approved);
    }

    #[tokio::test]
    async fn test_update_status_unknown_invoice() {
        let repo = MemoryRepo::new();

        let err = repo
            .update_status(
                InvoiceId::new(),
                InvoiceStatus::Pending,
                InvoiceStatus::Approved,
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transitions_have_one_winner() {
        let (repo, account_id) = repo_with_account().await;
        let repo = Arc::new(repo);
        let invoice = invoice_for(account_id, 10.0);
        repo.save(&invoice).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            let id = invoice.id();
            let target = if i % 2 == 0 {
                InvoiceStatus::Approved
            } else {
                InvoiceStatus::Rejected
            };
            handles.push(tokio::spawn(async move {
                repo.update_status(id, InvoiceStatus::Pending, target, Utc::now())
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => winners += 1,
                Err(e) => assert_eq!(e.domain(), Some(&DomainError::InvalidStatus)),
            }
        }
        assert_eq!(winners, 1);
    }
}
