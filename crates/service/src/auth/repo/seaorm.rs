use chrono::Utc;
use models::{account, errors::ModelError};
use sea_orm::DatabaseConnection;
use tracing::error;
use uuid::Uuid;

use crate::auth::domain::{Account, NewAccount};
use crate::auth::errors::StoreError;
use crate::auth::repository::AccountRepository;

pub struct SeaOrmAccountRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAccountRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(m: account::Model) -> Account {
    Account {
        id: m.id,
        name: m.name,
        email: m.email,
        password_hash: m.password_hash,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

fn store_err(e: ModelError) -> StoreError {
    match e {
        ModelError::NotFound => StoreError::NotFound,
        ModelError::UniqueViolation(msg) => StoreError::UniqueViolation(msg),
        ModelError::Validation(msg) | ModelError::Db(msg) => {
            error!(error = %msg, "account store failure");
            StoreError::Unavailable(msg)
        }
    }
}

#[async_trait::async_trait]
impl AccountRepository for SeaOrmAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let res = account::find_by_email(&self.db, email).await.map_err(store_err)?;
        Ok(res.map(to_domain))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let res = account::find_by_id(&self.db, id).await.map_err(store_err)?;
        Ok(res.map(to_domain))
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        let all = account::list(&self.db).await.map_err(store_err)?;
        Ok(all.into_iter().map(to_domain).collect())
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let created = account::create(&self.db, &new.name, &new.email, &new.password_hash, new.created_at)
            .await
            .map_err(store_err)?;
        Ok(to_domain(created))
    }

    async fn update(&self, acc: &Account) -> Result<(), StoreError> {
        account::update_profile(&self.db, acc.id, &acc.name, &acc.email)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        account::hard_delete(&self.db, id).await.map_err(store_err)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        account::count(&self.db).await.map_err(store_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::MigratorTrait;

    async fn repo() -> Option<SeaOrmAccountRepository> {
        if std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err() {
            return None;
        }
        let db = models::db::connect().await.ok()?;
        migration::Migrator::up(&db, None).await.ok()?;
        Some(SeaOrmAccountRepository::new(db))
    }

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            name: "Repo".into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unique_email_enforced_by_store() -> anyhow::Result<()> {
        let Some(repo) = repo().await else { return Ok(()) };
        let email = format!("repo_{}@example.com", Uuid::new_v4());

        let created = repo.create(new_account(&email)).await?;
        let dup = repo.create(new_account(&email)).await;
        assert!(matches!(dup, Err(StoreError::UniqueViolation(_))));

        repo.delete(created.id).await?;
        assert!(matches!(repo.delete(created.id).await, Err(StoreError::NotFound)));
        Ok(())
    }

    #[tokio::test]
    async fn update_keeps_hash() -> anyhow::Result<()> {
        let Some(repo) = repo().await else { return Ok(()) };
        let email = format!("repo_{}@example.com", Uuid::new_v4());
        let mut acc = repo.create(new_account(&email)).await?;

        acc.name = "Changed".into();
        repo.update(&acc).await?;
        let found = repo.find_by_id(acc.id).await?.expect("account exists");
        assert_eq!(found.name, "Changed");
        assert_eq!(found.password_hash, "$argon2id$stub");
        assert!(repo.count().await? >= 1);

        repo.delete(acc.id).await?;
        Ok(())
    }
}
