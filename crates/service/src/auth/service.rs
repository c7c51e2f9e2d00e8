use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::domain::{Account, AuthSession, LoginInput, NewAccount, RegisterInput, Subject, UpdateInput};
use super::errors::AuthError;
use super::password::CredentialHasher;
use super::repository::AccountRepository;
use super::token::TokenManager;

/// Who may update or delete an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnershipPolicy {
    /// Any authenticated subject may mutate any account.
    #[default]
    Unrestricted,
    /// The acting subject must be the account itself.
    SelfOnly,
}

/// Auth service configuration, built once at startup.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub hash_work_factor: u32,
    pub hash_memory_kib: u32,
    pub ownership: OwnershipPolicy,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("hash_work_factor", &self.hash_work_factor)
            .field("hash_memory_kib", &self.hash_memory_kib)
            .field("ownership", &self.ownership)
            .finish()
    }
}

/// Account use cases independent of web framework
pub struct AccountService<R: AccountRepository + ?Sized> {
    repo: Arc<R>,
    hasher: CredentialHasher,
    tokens: Arc<TokenManager>,
    ownership: OwnershipPolicy,
}

impl<R: AccountRepository + ?Sized> AccountService<R> {
    pub fn new(repo: Arc<R>, hasher: CredentialHasher, tokens: Arc<TokenManager>, ownership: OwnershipPolicy) -> Self {
        Self { repo, hasher, tokens, ownership }
    }

    pub fn from_config(repo: Arc<R>, cfg: &AuthConfig) -> Result<Self, AuthError> {
        let hasher = CredentialHasher::new(cfg.hash_work_factor, cfg.hash_memory_kib)?;
        let tokens = Arc::new(TokenManager::new(&cfg.jwt_secret, cfg.token_ttl));
        Ok(Self::new(repo, hasher, tokens, cfg.ownership))
    }

    /// Token manager shared with the request gate.
    pub fn tokens(&self) -> Arc<TokenManager> {
        Arc::clone(&self.tokens)
    }

    pub fn ownership(&self) -> OwnershipPolicy {
        self.ownership
    }

    /// Register a new account with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AccountService, CredentialHasher, OwnershipPolicy, TokenManager};
    /// use service::auth::repository::mock::MockAccountRepository;
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAccountRepository::default());
    /// let hasher = CredentialHasher::new(1, 1024).unwrap();
    /// let tokens = Arc::new(TokenManager::new("secret", chrono::Duration::minutes(15)));
    /// let svc = AccountService::new(repo, hasher, tokens, OwnershipPolicy::Unrestricted);
    /// let input = RegisterInput { name: "John".into(), email: "john@test.com".into(), password: "secret".into() };
    /// let account = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(account.email, "john@test.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<Account, AuthError> {
        let RegisterInput { name, email, password } = input;
        let (name, email) = validate_profile(&name, &email)?;
        if password.is_empty() {
            return Err(AuthError::Validation("password required".into()));
        }

        // Fast path only; the store's unique index decides.
        if self.repo.find_by_email(&email).await?.is_some() {
            debug!("email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash_blocking(password).await?;
        let account = self
            .repo
            .create(NewAccount { name, email, password_hash, created_at: Utc::now() })
            .await?;
        info!(account_id = %account.id, "account_registered");
        Ok(account)
    }

    /// Authenticate and issue a session token.
    ///
    /// Unknown email and wrong password are the same error and cost one
    /// hash verification each.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let LoginInput { email, password } = input;
        let account = self.repo.find_by_email(email.trim()).await?;

        let stored_hash = account.as_ref().map(|a| a.password_hash.clone());
        let verified = self.hasher.verify_blocking(password, stored_hash).await?;
        let account = match account {
            Some(a) if verified => a,
            _ => {
                debug!("login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = self.tokens.issue(&account.id.to_string())?;
        info!(account_id = %account.id, "login_succeeded");
        Ok(AuthSession { account_id: account.id, token })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Account, AuthError> {
        self.repo.find_by_id(id).await?.ok_or(AuthError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<Account>, AuthError> {
        Ok(self.repo.find_all().await?)
    }

    /// Overwrite name and email. The credential hash is untouched.
    #[instrument(skip(self, actor, input), fields(actor = %actor))]
    pub async fn update(&self, actor: &Subject, id: Uuid, input: UpdateInput) -> Result<Account, AuthError> {
        let (name, email) = validate_profile(&input.name, &input.email)?;
        self.authorize(actor, id)?;

        let mut account = self.repo.find_by_id(id).await?.ok_or(AuthError::NotFound)?;
        account.name = name;
        account.email = email;
        self.repo.update(&account).await?;
        info!(account_id = %id, "account_updated");
        Ok(account)
    }

    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn delete(&self, actor: &Subject, id: Uuid) -> Result<(), AuthError> {
        self.authorize(actor, id)?;
        self.repo.delete(id).await?;
        info!(account_id = %id, "account_deleted");
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, AuthError> {
        Ok(self.repo.count().await?)
    }

    fn authorize(&self, actor: &Subject, id: Uuid) -> Result<(), AuthError> {
        match self.ownership {
            OwnershipPolicy::Unrestricted => Ok(()),
            OwnershipPolicy::SelfOnly if actor.owns(id) => Ok(()),
            OwnershipPolicy::SelfOnly => {
                warn!(account_id = %id, "subject is not the account owner");
                Err(AuthError::Forbidden)
            }
        }
    }
}

fn validate_profile(name: &str, email: &str) -> Result<(String, String), AuthError> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() {
        return Err(AuthError::Validation("name required".into()));
    }
    if !email.contains('@') {
        return Err(AuthError::Validation("invalid email".into()));
    }
    Ok((name.to_string(), email.to_string()))
}
