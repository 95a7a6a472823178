use chrono::Utc;
use sqlx::{Row, SqliteConnection};

use zeroclick_core::domain::activity::{
    Activity, ActivityId, ActivityRecord, ActivityType, NewActivity,
};
use zeroclick_core::domain::contact::{Contact, ContactId};

use super::{
    decode_error, decode_timestamp, encode_timestamp, ActivityRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlActivityRepository {
    pool: DbPool,
}

impl SqlActivityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_activity(row: &sqlx::sqlite::SqliteRow) -> Result<Activity, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let type_str: String = row.try_get("type").map_err(decode_error)?;
    let transcript: Option<String> = row.try_get("transcript").map_err(decode_error)?;
    let summary: Option<String> = row.try_get("summary").map_err(decode_error)?;
    let contact_id: Option<i64> = row.try_get("contact_id").map_err(decode_error)?;
    let timestamp_str: String = row.try_get("timestamp").map_err(decode_error)?;

    let activity_type = type_str
        .parse::<ActivityType>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(Activity {
        id: ActivityId(id),
        activity_type,
        transcript,
        summary,
        contact_id: contact_id.map(ContactId),
        timestamp: decode_timestamp("activities.timestamp", &timestamp_str)?,
    })
}

fn row_to_activity_record(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ActivityRecord, RepositoryError> {
    let activity = row_to_activity(row)?;
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

    Ok(ActivityRecord { activity, contacts })
}

pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    activity: &NewActivity,
) -> Result<Activity, RepositoryError> {
    let timestamp = Utc::now();
    let result = sqlx::query(
        "INSERT INTO activities (type, transcript, summary, contact_id, timestamp)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(activity.activity_type.as_str())
    .bind(&activity.transcript)
    .bind(&activity.summary)
    .bind(activity.contact_id.map(|id| id.0))
    .bind(encode_timestamp(&timestamp))
    .execute(&mut *conn)
    .await?;

    Ok(Activity {
        id: ActivityId(result.last_insert_rowid()),
        activity_type: activity.activity_type,
        transcript: activity.transcript.clone(),
        summary: activity.summary.clone(),
        contact_id: activity.contact_id,
        timestamp,
    })
}

#[async_trait::async_trait]
impl ActivityRepository for SqlActivityRepository {
    async fn create(&self, activity: NewActivity) -> Result<Activity, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, &activity).await
    }

    async fn list(&self) -> Result<Vec<ActivityRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT a.id, a.type, a.transcript, a.summary, a.contact_id, a.timestamp,
                    c.id AS owner_id, c.name AS owner_name, c.company AS owner_company,
                    c.email AS owner_email, c.phone AS owner_phone,
                    c.created_at AS owner_created_at
             FROM activities a
             LEFT JOIN contacts c ON c.id = a.contact_id
             ORDER BY a.timestamp DESC, a.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_activity_record).collect()
    }

    async fn list_for_contact(
        &self,
        contact_id: ContactId,
    ) -> Result<Vec<Activity>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, type, transcript, summary, contact_id, timestamp
             FROM activities
             WHERE contact_id = ?
             ORDER BY timestamp DESC, id DESC",
        )
        .bind(contact_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_activity).collect()
    }
}
