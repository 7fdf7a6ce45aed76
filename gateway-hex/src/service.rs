//! Gateway Application Service
//!
//! Orchestrates domain operations through the repository ports.
//! Contains NO infrastructure logic - pure business orchestration.

use gateway_types::{
    Account, AccountId, AppError, CreateAccountRequest, CreateInvoiceRequest, DomainError,
    GatewayRepository, Invoice, InvoiceId, InvoiceStatus, RepoError, to_invoice,
};

/// Application service for accounts and invoices.
///
/// Generic over `R: GatewayRepository` - the adapter is injected at compile time.
pub struct GatewayService<R: GatewayRepository> {
    repo: R,
}

impl<R: GatewayRepository> GatewayService<R> {
    /// Creates a new gateway service with the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────────

    /// Registers an account and issues its API key.
    ///
    /// The raw key is returned once and cannot be retrieved again. If no key
    /// can be issued the account is removed again, so a failed registration
    /// leaves nothing behind.
    #[tracing::instrument(skip(self, req), fields(name = %req.name))]
    pub async fn create_account(
        &self,
        req: CreateAccountRequest,
    ) -> Result<(Account, String), AppError> {
        let account = Account::new(req.name, req.email)?;
        let account = self.repo.create_account(account).await?;

        let api_key = match self.repo.generate_api_key(account.id).await {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(
                    account_id = %account.id,
                    error = %e,
                    "key issuance failed, removing account"
                );
                if let Err(cleanup) = self.repo.delete_account(account.id).await {
                    tracing::error!(
                        account_id = %account.id,
                        error = %cleanup,
                        "failed to remove keyless account"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::info!(account_id = %account.id, "account registered");
        Ok((account, api_key))
    }

    /// Resolves an API key to the account it authenticates.
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, api_key: &str) -> Result<AccountId, AppError> {
        self.repo
            .resolve_account_by_api_key(api_key)
            .await
            .map_err(Into::into)
    }

    /// Gets an account by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| DomainError::AccountNotFound.into())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Invoices
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a pending invoice for the account owning `req.api_key`.
    #[tracing::instrument(
        skip(self, req),
        fields(amount = req.amount, payment_type = %req.payment_type)
    )]
    pub async fn create_invoice(&self, req: CreateInvoiceRequest) -> Result<Invoice, AppError> {
        let account_id = self.authenticate(&req.api_key).await?;
        let invoice = to_invoice(req, account_id)?;
        self.repo.save(&invoice).await?;

        tracing::info!(invoice_id = %invoice.id(), %account_id, "invoice created");
        Ok(invoice)
    }

    /// Gets an invoice owned by `caller`.
    #[tracing::instrument(skip(self))]
    pub async fn get_invoice(
        &self,
        id: InvoiceId,
        caller: AccountId,
    ) -> Result<Invoice, AppError> {
        let invoice = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::InvoiceNotFound)?;

        if !invoice.is_owned_by(caller) {
            tracing::warn!(invoice_id = %id, %caller, "cross-account invoice access denied");
            return Err(DomainError::UnauthorizedAccess.into());
        }

        Ok(invoice)
    }

    /// Lists the caller's invoices, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_invoices(&self, caller: AccountId) -> Result<Vec<Invoice>, AppError> {
        self.repo.list_by_account(caller).await.map_err(Into::into)
    }

    /// Applies an approval decision to a pending invoice owned by `caller`.
    ///
    /// The store update is a compare-and-swap on `Pending`; losing a race to
    /// a concurrent decision surfaces as `InvalidStatus`. Never retried.
    #[tracing::instrument(skip(self), fields(invoice_id = %id, status = %new_status))]
    pub async fn transition_invoice(
        &self,
        id: InvoiceId,
        caller: AccountId,
        new_status: InvoiceStatus,
    ) -> Result<Invoice, AppError> {
        let mut invoice = self.get_invoice(id, caller).await?;
        let expected = invoice.status();

        invoice.transition(new_status)?;

        self.repo
            .update_status(id, expected, invoice.status(), invoice.updated_at())
            .await
            .map_err(|e| match e {
                RepoError::NotFound => RepoError::Domain(DomainError::InvoiceNotFound),
                other => other,
            })?;

        tracing::info!(status = %invoice.status(), "invoice status updated");
        Ok(invoice)
    }
}
