use chrono::Utc;
use sqlx::{Row, SqliteConnection};

use zeroclick_core::domain::contact::{Contact, ContactId};
use zeroclick_core::domain::deal::{Deal, DealId, DealRecord, NewDeal};

use super::{decode_error, decode_timestamp, encode_timestamp, DealRepository, RepositoryError};
use crate::DbPool;

const DEAL_WITH_CONTACT: &str = "SELECT d.id, d.contact_id, d.deal_value, d.stage, d.next_step,
        d.follow_up_date, d.notes, d.created_at,
        c.id AS owner_id, c.name AS owner_name, c.company AS owner_company,
        c.email AS owner_email, c.phone AS owner_phone, c.created_at AS owner_created_at
 FROM deals d
 LEFT JOIN contacts c ON c.id = d.contact_id";

pub struct SqlDealRepository {
    pool: DbPool,
}

impl SqlDealRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_deal(row: &sqlx::sqlite::SqliteRow) -> Result<Deal, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let contact_id: i64 = row.try_get("contact_id").map_err(decode_error)?;
    let deal_value: Option<f64> = row.try_get("deal_value").map_err(decode_error)?;
    let stage: String = row.try_get("stage").map_err(decode_error)?;
    let next_step: Option<String> = row.try_get("next_step").map_err(decode_error)?;
    let follow_up_date: Option<String> = row.try_get("follow_up_date").map_err(decode_error)?;
    let notes: Option<String> = row.try_get("notes").map_err(decode_error)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(Deal {
        id: DealId(id),
        contact_id: ContactId(contact_id),
        deal_value,
        stage,
        next_step,
        follow_up_date,
        notes,
        created_at: decode_timestamp("deals.created_at", &created_at_str)?,
    })
}

fn row_to_deal_record(row: &sqlx::sqlite::SqliteRow) -> Result<DealRecord, RepositoryError> {
    let deal = row_to_deal(row)?;
    let owner_id: Option<i64> = row.try_get("owner_id").map_err(decode_error)?;

    let contacts = match owner_id {
        Some(owner_id) => {
            let created_at_str: String = row.try_get("owner_created_at").map_err(decode_error)?;
            Some(Contact {
                id: ContactId(owner_id),
                name: row.try_get("owner_name").map_err(decode_error)?,
                company: row.try_get("owner_company").map_err(decode_error)?,
                email: row.try_get("owner_email").map_err(decode_error)?,
                phone: row.try_get("owner_phone").map_err(decode_error)?,
                created_at: decode_timestamp("contacts.created_at", &created_at_str)?,
            })
        }
        None => None,
    };

    Ok(DealRecord { deal, contacts })
}

pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    deal: &NewDeal,
) -> Result<Deal, RepositoryError> {
    let created_at = Utc::now();
    let result = sqlx::query(
        "INSERT INTO deals (contact_id, deal_value, stage, next_step, follow_up_date, notes,
                            created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(deal.contact_id.0)
    .bind(deal.deal_value)
    .bind(&deal.stage)
    .bind(&deal.next_step)
    .bind(&deal.follow_up_date)
    .bind(&deal.notes)
    .bind(encode_timestamp(&created_at))
    .execute(&mut *conn)
    .await?;

    Ok(Deal {
        id: DealId(result.last_insert_rowid()),
        contact_id: deal.contact_id,
        deal_value: deal.deal_value,
        stage: deal.stage.clone(),
        next_step: deal.next_step.clone(),
        follow_up_date: deal.follow_up_date.clone(),
        notes: deal.notes.clone(),
        created_at,
    })
}

#[async_trait::async_trait]
impl DealRepository for SqlDealRepository {
    async fn create(&self, deal: NewDeal) -> Result<Deal, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, &deal).await
    }

    async fn list(&self) -> Result<Vec<DealRecord>, RepositoryError> {
        let sql = format!("{DEAL_WITH_CONTACT} ORDER BY d.created_at DESC, d.id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(row_to_deal_record).collect()
    }

    async fn list_for_contact(&self, contact_id: ContactId) -> Result<Vec<Deal>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, contact_id, deal_value, stage, next_step, follow_up_date, notes, created_at
             FROM deals
             WHERE contact_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(contact_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_deal).collect()
    }
}
