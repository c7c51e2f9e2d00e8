use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{Account, NewAccount};
use super::errors::StoreError;

/// Persistence port for accounts.
///
/// Implementations must enforce email uniqueness themselves and report a
/// clash as [`StoreError::UniqueViolation`] from `create` and `update`.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
    async fn find_all(&self) -> Result<Vec<Account>, StoreError>;
    /// Persist a new account and return it with its assigned id.
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;
    /// Overwrite name and email of an existing account.
    async fn update(&self, account: &Account) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn count(&self) -> Result<u64, StoreError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, MutexGuard};

    #[derive(Default)]
    pub struct MockAccountRepository {
        accounts: Mutex<HashMap<Uuid, Account>>, // key: account id
        unavailable: AtomicBool,
    }

    impl MockAccountRepository {
        /// Make every subsequent call fail with [`StoreError::Unavailable`].
        pub fn set_unavailable(&self, down: bool) {
            self.unavailable.store(down, Ordering::SeqCst);
        }

        fn accounts(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Account>>, StoreError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("mock store is down".into()));
            }
            self.accounts
                .lock()
                .map_err(|_| StoreError::Unavailable("mock store lock poisoned".into()))
        }
    }

    fn email_taken(accounts: &HashMap<Uuid, Account>, email: &str, except: Option<Uuid>) -> bool {
        accounts.values().any(|a| a.email == email && Some(a.id) != except)
    }

    #[async_trait]
    impl AccountRepository for MockAccountRepository {
        async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
            let accounts = self.accounts()?;
            Ok(accounts.values().find(|a| a.email == email).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
            Ok(self.accounts()?.get(&id).cloned())
        }

        async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
            let mut all: Vec<Account> = self.accounts()?.values().cloned().collect();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(all)
        }

        async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
            let mut accounts = self.accounts()?;
            if email_taken(&accounts, &account.email, None) {
                return Err(StoreError::UniqueViolation("email".into()));
            }
            let created = Account {
                id: Uuid::new_v4(),
                name: account.name,
                email: account.email,
                password_hash: account.password_hash,
                created_at: account.created_at,
            };
            accounts.insert(created.id, created.clone());
            Ok(created)
        }

        async fn update(&self, account: &Account) -> Result<(), StoreError> {
            let mut accounts = self.accounts()?;
            if email_taken(&accounts, &account.email, Some(account.id)) {
                return Err(StoreError::UniqueViolation("email".into()));
            }
            let existing = accounts.get_mut(&account.id).ok_or(StoreError::NotFound)?;
            existing.name = account.name.clone();
            existing.email = account.email.clone();
            Ok(())
        }

        async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
            self.accounts()?.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
        }

        async fn count(&self) -> Result<u64, StoreError> {
            Ok(self.accounts()?.len() as u64)
        }
    }
}
