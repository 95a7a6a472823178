use chrono::Utc;
use sqlx::{Row, SqliteConnection};

use zeroclick_core::domain::contact::{Contact, ContactId, NewContact};

use super::{decode_error, decode_timestamp, encode_timestamp, ContactRepository, RepositoryError};
use crate::DbPool;

pub struct SqlContactRepository {
    pool: DbPool,
}

impl SqlContactRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_contact(row: &sqlx::sqlite::SqliteRow) -> Result<Contact, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let company: Option<String> = row.try_get("company").map_err(decode_error)?;
    let email: Option<String> = row.try_get("email").map_err(decode_error)?;
    let phone: Option<String> = row.try_get("phone").map_err(decode_error)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(Contact {
        id: ContactId(id),
        name,
        company,
        email,
        phone,
        created_at: decode_timestamp("contacts.created_at", &created_at_str)?,
    })
}

/// Runs contact resolution on an existing connection so it can share a
/// transaction with the rest of an ingest.
pub(crate) async fn find_or_insert(
    conn: &mut SqliteConnection,
    contact: &NewContact,
) -> Result<ContactId, RepositoryError> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM contacts
         WHERE name = ? AND (? IS NULL OR company = ?)
         ORDER BY id ASC
         LIMIT 1",
    )
    .bind(&contact.name)
    .bind(&contact.company)
    .bind(&contact.company)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        return Ok(ContactId(id));
    }

    let result = sqlx::query(
        "INSERT INTO contacts (name, company, email, phone, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&contact.name)
    .bind(&contact.company)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(encode_timestamp(&Utc::now()))
    .execute(&mut *conn)
    .await?;

    Ok(ContactId(result.last_insert_rowid()))
}

#[async_trait::async_trait]
impl ContactRepository for SqlContactRepository {
    async fn find_or_create(&self, contact: NewContact) -> Result<ContactId, RepositoryError> {
        let contact = contact.normalized();
        let mut conn = self.pool.acquire().await?;
        find_or_insert(&mut conn, &contact).await
    }

    async fn find_by_id(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, company, email, phone, created_at FROM contacts WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_contact(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, company, email, phone, created_at
             FROM contacts
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_contact).collect()
    }
}

#[cfg(test)]
mod tests {
    use zeroclick_core::domain::contact::{ContactId, NewContact};

    use super::SqlContactRepository;
    use crate::repositories::ContactRepository;
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlContactRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlContactRepository::new(pool)
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent_for_same_name_and_company() {
        let repo = repository().await;
        let sarah = NewContact::new("Sarah Johnson").with_company("Acme Corp");

        let first = repo.find_or_create(sarah.clone()).await.expect("first");
        let second = repo.find_or_create(sarah).await.expect("second");

        assert_eq!(first, second);
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn name_only_lookup_matches_any_company() {
        let repo = repository().await;
        let with_company = repo
            .find_or_create(NewContact::new("Michael Chen").with_company("TechStart Inc"))
            .await
            .expect("create");

        let by_name = repo.find_or_create(NewContact::new("Michael Chen")).await.expect("lookup");
        assert_eq!(by_name, with_company);
    }

    #[tokio::test]
    async fn different_company_creates_new_contact() {
        let repo = repository().await;
        let acme = repo
            .find_or_create(NewContact::new("Sarah Johnson").with_company("Acme Corp"))
            .await
            .expect("acme");
        let globex = repo
            .find_or_create(NewContact::new("Sarah Johnson").with_company("Globex"))
            .await
            .expect("globex");

        assert_ne!(acme, globex);
    }

    #[tokio::test]
    async fn find_by_id_round_trips_optional_fields() {
        let repo = repository().await;
        let id = repo
            .find_or_create(
                NewContact::new("Emily Rodriguez")
                    .with_company("Global Solutions")
                    .with_email("emily.r@globalsol.com")
                    .with_phone(""),
            )
            .await
            .expect("create");

        let contact = repo.find_by_id(id).await.expect("find").expect("present");
        assert_eq!(contact.email.as_deref(), Some("emily.r@globalsol.com"));
        assert_eq!(contact.phone, None);
        assert!(repo.find_by_id(ContactId(999)).await.expect("find missing").is_none());
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let repo = repository().await;
        let older = repo.find_or_create(NewContact::new("First")).await.expect("first");
        let newer = repo.find_or_create(NewContact::new("Second")).await.expect("second");

        let ids: Vec<ContactId> =
            repo.list().await.expect("list").into_iter().map(|contact| contact.id).collect();
        assert_eq!(ids, vec![newer, older]);
    }
}
