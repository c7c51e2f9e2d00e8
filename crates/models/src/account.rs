use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, DatabaseConnection, PaginatorTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Insert a new account. The id is generated here and never reused.
pub async fn create(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password_hash: &str,
    created_at: DateTime<Utc>,
) -> Result<Model, ModelError> {
    if password_hash.trim().is_empty() {
        return Err(ModelError::Validation("password hash required".into()));
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash.to_string()),
        created_at: Set(created_at.into()),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Email.eq(email)).one(db).await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// All accounts, newest first.
pub async fn list(db: &DatabaseConnection) -> Result<Vec<Model>, ModelError> {
    Ok(Entity::find().order_by_desc(Column::CreatedAt).all(db).await?)
}

/// Overwrite name and email; the password hash is left alone.
pub async fn update_profile(db: &DatabaseConnection, id: Uuid, name: &str, email: &str) -> Result<Model, ModelError> {
    let mut am: ActiveModel = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ModelError::NotFound)?
        .into();
    am.name = Set(name.to_string());
    am.email = Set(email.to_string());
    Ok(am.update(db).await?)
}

pub async fn hard_delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ModelError> {
    let res = Entity::delete_by_id(id).exec(db).await?;
    if res.rows_affected == 0 {
        return Err(ModelError::NotFound);
    }
    Ok(())
}

pub async fn count(db: &DatabaseConnection) -> Result<u64, ModelError> {
    Ok(Entity::find().count(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::MigratorTrait;

    async fn test_db() -> Option<DatabaseConnection> {
        if std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err() {
            return None;
        }
        let db = crate::db::connect().await.ok()?;
        migration::Migrator::up(&db, None).await.ok()?;
        Some(db)
    }

    #[tokio::test]
    async fn account_crud_roundtrip() -> anyhow::Result<()> {
        let Some(db) = test_db().await else { return Ok(()) };

        let email = format!("model_{}@example.com", Uuid::new_v4());
        let created = create(&db, "Model", &email, "$argon2id$stub", Utc::now()).await?;
        assert_eq!(find_by_email(&db, &email).await?.map(|m| m.id), Some(created.id));

        let dup = create(&db, "Other", &email, "$argon2id$stub", Utc::now()).await;
        assert!(matches!(dup, Err(ModelError::UniqueViolation(_))));

        let updated = update_profile(&db, created.id, "Renamed", &email).await?;
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.password_hash, "$argon2id$stub");

        hard_delete(&db, created.id).await?;
        assert!(find_by_id(&db, created.id).await?.is_none());
        assert!(matches!(hard_delete(&db, created.id).await, Err(ModelError::NotFound)));
        Ok(())
    }
}
