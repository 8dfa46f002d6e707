use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::contacts::birthday::BirthdayWindow;
use crate::contacts::dto::{ContactCreate, ContactPatch, ListQuery};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub birthday: Date,
    pub note: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const CONTACT_COLUMNS: &str =
    "id, user_id, name, surname, email, phone, birthday, note, created_at, updated_at";

impl Contact {
    /// Email and phone are globally unique; a duplicate surfaces as a
    /// database unique violation and maps to Conflict at the error layer.
    pub async fn create(db: &PgPool, user_id: Uuid, body: &ContactCreate) -> sqlx::Result<Contact> {
        sqlx::query_as::<_, Contact>(&format!(
            "INSERT INTO contacts (user_id, name, surname, email, phone, birthday, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&body.name)
        .bind(&body.surname)
        .bind(&body.email)
        .bind(&body.phone)
        .bind(body.birthday)
        .bind(&body.note)
        .fetch_one(db)
        .await
    }

    pub async fn list(db: &PgPool, user_id: Uuid, q: &ListQuery) -> sqlx::Result<Vec<Contact>> {
        sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS}
             FROM contacts
             WHERE user_id = $1
               AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
               AND ($3::text IS NULL OR surname ILIKE '%' || $3 || '%')
               AND ($4::text IS NULL OR email ILIKE '%' || $4 || '%')
             ORDER BY created_at DESC
             LIMIT $5 OFFSET $6"
        ))
        .bind(user_id)
        .bind(&q.name)
        .bind(&q.surname)
        .bind(&q.email)
        .bind(q.limit.clamp(1, 100))
        .bind(q.offset.max(0))
        .fetch_all(db)
        .await
    }

    pub async fn get(db: &PgPool, user_id: Uuid, id: Uuid) -> sqlx::Result<Option<Contact>> {
        sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// Field-by-field partial update; absent fields keep their stored value.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        patch: &ContactPatch,
    ) -> sqlx::Result<Option<Contact>> {
        sqlx::query_as::<_, Contact>(&format!(
            "UPDATE contacts SET
                 name = COALESCE($3, name),
                 surname = COALESCE($4, surname),
                 email = COALESCE($5, email),
                 phone = COALESCE($6, phone),
                 birthday = COALESCE($7, birthday),
                 note = COALESCE($8, note),
                 updated_at = now()
             WHERE id = $1 AND user_id = $2
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&patch.name)
        .bind(&patch.surname)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(patch.birthday)
        .bind(&patch.note)
        .fetch_optional(db)
        .await
    }

    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> sqlx::Result<Option<Contact>> {
        sqlx::query_as::<_, Contact>(&format!(
            "DELETE FROM contacts WHERE id = $1 AND user_id = $2 RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// SQL mirror of [`BirthdayWindow::matches`]. A single SELECT evaluates
    /// each row once, so overlapping clauses cannot duplicate a contact.
    /// Ordered by (month, day), ties broken by id.
    pub async fn upcoming_birthdays(
        db: &PgPool,
        user_id: Uuid,
        window: &BirthdayWindow,
    ) -> sqlx::Result<Vec<Contact>> {
        let order = "ORDER BY EXTRACT(MONTH FROM birthday), EXTRACT(DAY FROM birthday), id";
        if window.crosses_month() {
            sqlx::query_as::<_, Contact>(&format!(
                "SELECT {CONTACT_COLUMNS}
                 FROM contacts
                 WHERE user_id = $1
                   AND ((EXTRACT(MONTH FROM birthday) = $2::int
                         AND EXTRACT(DAY FROM birthday) >= $3::int)
                     OR (EXTRACT(MONTH FROM birthday) = $4::int
                         AND EXTRACT(DAY FROM birthday) <= $5::int))
                 {order}"
            ))
            .bind(user_id)
            .bind(window.start_month() as i32)
            .bind(window.start_day() as i32)
            .bind(window.end_month() as i32)
            .bind(window.end_day() as i32)
            .fetch_all(db)
            .await
        } else {
            sqlx::query_as::<_, Contact>(&format!(
                "SELECT {CONTACT_COLUMNS}
                 FROM contacts
                 WHERE user_id = $1
                   AND EXTRACT(MONTH FROM birthday) = $2::int
                   AND EXTRACT(DAY FROM birthday) >= $3::int
                   AND EXTRACT(DAY FROM birthday) <= $4::int
                 {order}"
            ))
            .bind(user_id)
            .bind(window.start_month() as i32)
            .bind(window.start_day() as i32)
            .bind(window.end_day() as i32)
            .fetch_all(db)
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_serialization_hides_owner() {
        let contact = Contact {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Ann".into(),
            surname: "Lee".into(),
            email: "ann@example.com".into(),
            phone: "+1555".into(),
            birthday: Date::from_calendar_date(1990, time::Month::June, 15).unwrap(),
            note: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&contact).unwrap();
        assert!(json.contains("ann@example.com"));
        assert!(!json.contains("user_id"));
    }
}
