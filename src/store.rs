use crate::errors::AppError;
use crate::models::{Customer, LoanRequest, LoanStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A keyed store with atomic per-key mutation.
///
/// `remove` returns the prior value, which is the consumption primitive for
/// single-read score results: whichever caller gets `Some` owns the result.
#[async_trait]
pub trait KeyValueStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V>;
    async fn put(&self, key: String, value: V);
    async fn remove(&self, key: &str) -> Option<V>;
}

/// A thread-safe in-memory key-value store.
///
/// Uses `Arc<RwLock<HashMap<String, V>>>` to allow shared concurrent access.
#[derive(Debug, Clone)]
pub struct MemoryStore<V> {
    entries: Arc<RwLock<HashMap<String, V>>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> KeyValueStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        entries.get(key).cloned()
    }

    async fn put(&self, key: String, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(key, value);
    }

    async fn remove(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().await;
        entries.remove(key)
    }
}

/// Repository for subscribed customers.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Inserts a new customer. Fails with `Conflict` when the customer number
    /// is already present; check and insert happen atomically.
    async fn insert_new(&self, customer: Customer) -> Result<(), AppError>;

    async fn get(&self, customer_number: &str) -> Option<Customer>;
}

/// Repository for loan requests.
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Creates a `Pending` loan with a fresh request id.
    ///
    /// The active-loan check and the insert run under a single write lock, so
    /// two concurrent requests for the same customer cannot both create a
    /// non-terminal loan. Fails with `Conflict` when one already exists.
    async fn create_pending(
        &self,
        customer_number: &str,
        amount: f64,
        scoring_token: &str,
    ) -> Result<LoanRequest, AppError>;

    /// True when the customer holds a `Pending` or `Approved` loan.
    ///
    /// Advisory pre-check only; `create_pending` re-enforces the constraint
    /// atomically.
    async fn has_active(&self, customer_number: &str) -> bool;

    /// Moves a `Pending` loan to a terminal state, exactly once.
    ///
    /// Fails with `NotFound` for an unknown request id and with `Conflict`
    /// when the loan is already terminal.
    async fn finalize(&self, request_id: &str, status: LoanStatus)
        -> Result<LoanRequest, AppError>;

    async fn get(&self, request_id: &str) -> Option<LoanRequest>;
}

/// Thread-safe in-memory customer repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerRepository {
    customers: Arc<RwLock<HashMap<String, Customer>>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn insert_new(&self, customer: Customer) -> Result<(), AppError> {
        let mut customers = self.customers.write().await;
        if customers.contains_key(&customer.customer_number) {
            return Err(AppError::Conflict("Customer already subscribed".to_string()));
        }
        customers.insert(customer.customer_number.clone(), customer);
        Ok(())
    }

    async fn get(&self, customer_number: &str) -> Option<Customer> {
        let customers = self.customers.read().await;
        customers.get(customer_number).cloned()
    }
}

/// Thread-safe in-memory loan repository keyed by request id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoanRepository {
    loans: Arc<RwLock<HashMap<String, LoanRequest>>>,
}

impl InMemoryLoanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanRepository for InMemoryLoanRepository {
    async fn create_pending(
        &self,
        customer_number: &str,
        amount: f64,
        scoring_token: &str,
    ) -> Result<LoanRequest, AppError> {
        let mut loans = self.loans.write().await;
        // Pending and approved both count as active; only a rejected loan
        // frees the customer for a new request.
        let active = loans.values().any(|l| {
            l.customer_number == customer_number
                && matches!(l.status, LoanStatus::Pending | LoanStatus::Approved)
        });
        if active {
            return Err(AppError::Conflict("Active loan exists".to_string()));
        }

        let loan = LoanRequest {
            request_id: Uuid::new_v4().to_string(),
            customer_number: customer_number.to_string(),
            amount,
            status: LoanStatus::Pending,
            scoring_token: scoring_token.to_string(),
        };
        loans.insert(loan.request_id.clone(), loan.clone());
        Ok(loan)
    }

    async fn has_active(&self, customer_number: &str) -> bool {
        let loans = self.loans.read().await;
        loans.values().any(|l| {
            l.customer_number == customer_number
                && matches!(l.status, LoanStatus::Pending | LoanStatus::Approved)
        })
    }

    async fn finalize(
        &self,
        request_id: &str,
        status: LoanStatus,
    ) -> Result<LoanRequest, AppError> {
        let mut loans = self.loans.write().await;
        let loan = loans
            .get_mut(request_id)
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", request_id)))?;
        if loan.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Loan {} already finalized",
                request_id
            )));
        }
        loan.status = status;
        Ok(loan.clone())
    }

    async fn get(&self, request_id: &str) -> Option<LoanRequest> {
        let loans = self.loans.read().await;
        loans.get(request_id).cloned()
    }
}
