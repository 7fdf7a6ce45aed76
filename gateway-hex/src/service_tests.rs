//! GatewayService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use gateway_repo::MemoryRepo;
    use gateway_types::{
        Account, AccountId, AccountRepository, AppError, CreateAccountRequest,
        CreateInvoiceRequest, Invoice, InvoiceId, InvoiceRepository, InvoiceStatus,
        RepoError,
    };

    use crate::GatewayService;

    /// Memory store with injectable failures: key issuance can be made to
    /// fail, and the next status compare-and-swap can be made to lose as if
    /// a concurrent decision committed first.
    #[derive(Default)]
    pub struct FaultyRepo {
        inner: MemoryRepo,
        fail_key_issuance: AtomicBool,
        lose_next_cas: AtomicBool,
        created: Mutex<Vec<AccountId>>,
    }

    #[async_trait]
    impl AccountRepository for FaultyRepo {
        async fn create_account(&self, account: Account) -> Result<Account, RepoError> {
            self.created.lock().unwrap().push(account.id);
            self.inner.create_account(account).await
        }

        async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
            self.inner.get_account(id).await
        }

        async fn delete_account(&self, id: AccountId) -> Result<(), RepoError> {
            self.inner.delete_account(id).await
        }

        async fn register_api_key(
            &self,
            account_id: AccountId,
            raw_key: &str,
        ) -> Result<(), RepoError> {
            self.inner.register_api_key(account_id, raw_key).await
        }

        async fn resolve_account_by_api_key(&self, raw_key: &str) -> Result<AccountId, RepoError> {
            self.inner.resolve_account_by_api_key(raw_key).await
        }

        async fn generate_api_key(&self, account_id: AccountId) -> Result<String, RepoError> {
            if self.fail_key_issuance.load(Ordering::SeqCst) {
                return Err(RepoError::Database("database is locked".into()));
            }
            self.inner.generate_api_key(account_id).await
        }
    }

    #[async_trait]
    impl InvoiceRepository for FaultyRepo {
        async fn save(&self, invoice: &Invoice) -> Result<(), RepoError> {
            self.inner.save(invoice).await
        }

        async fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepoError> {
            self.inner.find_by_id(id).await
        }

        async fn list_by_account(&self, account_id: AccountId) -> Result<Vec<Invoice>, RepoError> {
            self.inner.list_by_account(account_id).await
        }

        async fn update_status(
            &self,
            id: InvoiceId,
            expected: InvoiceStatus,
            new_status: InvoiceStatus,
            updated_at: DateTime<Utc>,
        ) -> Result<(), RepoError> {
            if self.lose_next_cas.swap(false, Ordering::SeqCst) {
                // The rival wins with the opposite decision.
                let rival = match new_status {
                    InvoiceStatus::Approved => InvoiceStatus::Rejected,
                    _ => InvoiceStatus::Approved,
                };
                self.inner
                    .update_status(id, expected, rival, updated_at)
                    .await?;
            }
            self.inner
                .update_status(id, expected, new_status, updated_at)
                .await
        }
    }

    fn create_service() -> GatewayService<MemoryRepo> {
        GatewayService::new(MemoryRepo::new())
    }

    fn account_request(name: &str) -> CreateAccountRequest {
        CreateAccountRequest {
            name: name.to_string(),
            email: format!("{name}@example.test"),
        }
    }

    fn invoice_request(api_key: &str, amount: f64) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            api_key: api_key.to_string(),
            amount,
            description: "Order #1".to_string(),
            payment_type: "credit_card".to_string(),
            card_number: "4111 1111 1111 1111".to_string(),
            holder_name: "John Doe".to_string(),
            expiration_month: 12,
            expiration_year: 2099,
            cvv: "123".to_string(),
        }
    }

    /// Creates an account and binds `key` to it in place of the generated one.
    async fn account_with_key<R: gateway_types::GatewayRepository>(
        service: &GatewayService<R>,
        name: &str,
        key: &str,
    ) -> AccountId {
        let (account, _) = service.create_account(account_request(name)).await.unwrap();
        service
            .repo()
            .register_api_key(account.id, key)
            .await
            .unwrap();
        account.id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_account_issues_working_key() {
        let service = create_service();

        let (account, api_key) = service
            .create_account(account_request("acme"))
            .await
            .unwrap();

        assert!(api_key.starts_with("gw_"));
        assert_eq!(service.authenticate(&api_key).await.unwrap(), account.id);
        assert_eq!(service.get_account(account.id).await.unwrap(), account);
    }

    #[tokio::test]
    async fn test_create_account_rejects_blank_name() {
        let service = create_service();

        let result = service
            .create_account(CreateAccountRequest {
                name: "  ".to_string(),
                email: "ops@acme.test".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_failed_key_issuance_leaves_no_account() {
        let service = GatewayService::new(FaultyRepo::default());
        service.repo().fail_key_issuance.store(true, Ordering::SeqCst);

        let result = service.create_account(account_request("acme")).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        let created = service.repo().created.lock().unwrap().clone();
        assert_eq!(created.len(), 1);
        assert!(
            service
                .repo()
                .get_account(created[0])
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_authenticate_unknown_key() {
        let service = create_service();

        let result = service.authenticate("nope").await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invoices
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_invoice_for_key_owner() {
        let service = create_service();
        let account_id = account_with_key(&service, "acme", "k1").await;

        let invoice = service
            .create_invoice(invoice_request("k1", 100.50))
            .await
            .unwrap();

        assert_eq!(invoice.account_id(), account_id);
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(invoice.card_last_digits(), "1111");
        assert_eq!(invoice.amount(), 100.50);

        let stored = service.get_invoice(invoice.id(), account_id).await.unwrap();
        assert_eq!(stored, invoice);
    }

    #[tokio::test]
    async fn test_create_invoice_zero_amount() {
        let service = create_service();
        account_with_key(&service, "acme", "k1").await;

        let result = service.create_invoice(invoice_request("k1", 0.0)).await;

        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == "invalid amount"));
    }

    #[tokio::test]
    async fn test_create_invoice_unknown_key_stores_nothing() {
        let service = create_service();
        let account_id = account_with_key(&service, "acme", "k1").await;

        let result = service.create_invoice(invoice_request("unknown", 10.0)).await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert!(service.list_invoices(account_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_invoice_expired_card() {
        let service = create_service();
        account_with_key(&service, "acme", "k1").await;
        let mut req = invoice_request("k1", 10.0);
        req.expiration_year = 2000;

        let result = service.create_invoice(req).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_get_invoice_not_found() {
        let service = create_service();
        let account_id = account_with_key(&service, "acme", "k1").await;

        let result = service.get_invoice(InvoiceId::new(), account_id).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cross_account_access_is_forbidden() {
        let service = create_service();
        account_with_key(&service, "owner", "k1").await;
        let intruder = account_with_key(&service, "intruder", "k2").await;
        let invoice = service
            .create_invoice(invoice_request("k1", 10.0))
            .await
            .unwrap();

        let read = service.get_invoice(invoice.id(), intruder).await;
        let write = service
            .transition_invoice(invoice.id(), intruder, InvoiceStatus::Approved)
            .await;

        assert!(matches!(read, Err(AppError::Forbidden(_))));
        assert!(matches!(write, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_list_invoices_is_scoped() {
        let service = create_service();
        let mine = account_with_key(&service, "mine", "k1").await;
        let theirs = account_with_key(&service, "theirs", "k2").await;
        service.create_invoice(invoice_request("k1", 1.0)).await.unwrap();
        service.create_invoice(invoice_request("k1", 2.0)).await.unwrap();
        service.create_invoice(invoice_request("k2", 3.0)).await.unwrap();

        let listed = service.list_invoices(mine).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|i| i.account_id() == mine));
        assert_eq!(service.list_invoices(theirs).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_approve_then_reject_fails() {
        let service = create_service();
        let account_id = account_with_key(&service, "acme", "k1").await;
        let invoice = service
            .create_invoice(invoice_request("k1", 10.0))
            .await
            .unwrap();

        let approved = service
            .transition_invoice(invoice.id(), account_id, InvoiceStatus::Approved)
            .await
            .unwrap();
        let second = service
            .transition_invoice(invoice.id(), account_id, InvoiceStatus::Rejected)
            .await;

        assert_eq!(approved.status(), InvoiceStatus::Approved);
        assert!(approved.updated_at() >= approved.created_at());
        assert!(matches!(second, Err(AppError::Conflict(_))));

        let stored = service.get_invoice(invoice.id(), account_id).await.unwrap();
        assert_eq!(stored.status(), InvoiceStatus::Approved);
    }

    #[tokio::test]
    async fn test_transition_to_pending_fails() {
        let service = create_service();
        let account_id = account_with_key(&service, "acme", "k1").await;
        let invoice = service
            .create_invoice(invoice_request("k1", 10.0))
            .await
            .unwrap();

        let result = service
            .transition_invoice(invoice.id(), account_id, InvoiceStatus::Pending)
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_lost_status_race_reports_invalid_status() {
        let service = GatewayService::new(FaultyRepo::default());
        let account_id = account_with_key(&service, "acme", "k1").await;
        let invoice = service
            .create_invoice(invoice_request("k1", 10.0))
            .await
            .unwrap();
        service.repo().lose_next_cas.store(true, Ordering::SeqCst);

        let result = service
            .transition_invoice(invoice.id(), account_id, InvoiceStatus::Approved)
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        let stored = service.get_invoice(invoice.id(), account_id).await.unwrap();
        assert_eq!(stored.status(), InvoiceStatus::Rejected);
    }
}
