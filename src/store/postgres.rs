use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgArguments, query::Query, PgPool, Postgres};

use super::{Stat, StoreError, TicketStore};
use crate::models::{Staff, Ticket, TicketSummary};

/* ---------- statements ---------- */

const GET_CREDENTIALS: &str =
    "SELECT username, password, admin FROM fdp_staff WHERE username = $1";
const GET_ATTENDEES: &str =
    "SELECT ticket_num, ticket_type, sold, entered FROM attendees ORDER BY ticket_num";
const GET_ATTENDEE: &str = r#"
    SELECT ticket_num, first_name, last_name, ticket_type, sold, vendor, resp_vendor, entered
    FROM attendees
    WHERE ticket_num = $1
"#;
const IS_SOLD_ENTERED: &str = "SELECT sold, entered FROM attendees WHERE ticket_num = $1";
const GET_ENTRANCE: &str = "SELECT entered FROM attendees WHERE ticket_num = $1";
const GET_VENDOR: &str = "SELECT vendor FROM attendees WHERE ticket_num = $1";

const COUNT_INSIDE: &str = "SELECT COUNT(*) FROM attendees WHERE entered IS NOT NULL";
const COUNT_SOLD: &str = "SELECT COUNT(*) FROM attendees WHERE sold = TRUE";
const COUNT_PAYING_ENTERED: &str = r#"
    SELECT COUNT(*) FROM attendees
    WHERE entered IS NOT NULL AND sold = TRUE AND ticket_type > 0
"#;

// Guards live in the WHERE clause so check and write are one statement.
const SET_ENTERED: &str = r#"
    UPDATE attendees
    SET entered = NOW()
    WHERE ticket_num = $1 AND sold = TRUE AND entered IS NULL
"#;
const ROLLBACK_ENTRANCE: &str = r#"
    UPDATE attendees
    SET entered = NULL
    WHERE ticket_num = $1 AND entered IS NOT NULL
"#;
const SELL_TICKET: &str = r#"
    UPDATE attendees
    SET first_name = $2,
        last_name = $3,
        sold = TRUE,
        vendor = $4,
        resp_vendor = 'Entrance',
        entered = NOW()
    WHERE ticket_num = $1 AND sold = FALSE AND first_name IS NULL
"#;
const RESET_TICKET: &str = r#"
    UPDATE attendees
    SET first_name = NULL,
        last_name = NULL,
        sold = FALSE,
        vendor = NULL,
        resp_vendor = 'Generator',
        entered = NULL
    WHERE ticket_num = $1
"#;

impl Stat {
    fn statement(self) -> &'static str {
        match self {
            Stat::Inside => COUNT_INSIDE,
            Stat::Sold => COUNT_SOLD,
            Stat::PayingEntered => COUNT_PAYING_ENTERED,
        }
    }
}

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// PostgreSQL backed store. sqlx prepares each statement once per pooled
/// connection and reuses it afterwards.
#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn update(&self, query: PgQuery<'_>) -> Result<u64, StoreError> {
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn sold_entered(
        &self,
        ticket_num: i32,
    ) -> Result<Option<(bool, Option<DateTime<Utc>>)>, StoreError> {
        let row = sqlx::query_as::<_, (bool, Option<DateTime<Utc>>)>(IS_SOLD_ENTERED)
            .bind(ticket_num)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn when_entered(
        &self,
        ticket_num: i32,
    ) -> Result<Option<Option<DateTime<Utc>>>, StoreError> {
        let entered = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(GET_ENTRANCE)
            .bind(ticket_num)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entered)
    }

    async fn ticket(&self, ticket_num: i32) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(GET_ATTENDEE)
            .bind(ticket_num)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn tickets(&self) -> Result<Vec<TicketSummary>, StoreError> {
        let tickets = sqlx::query_as::<_, TicketSummary>(GET_ATTENDEES)
            .fetch_all(&self.pool)
            .await?;
        Ok(tickets)
    }

    async fn vendor(&self, ticket_num: i32) -> Result<Option<Option<String>>, StoreError> {
        let vendor = sqlx::query_scalar::<_, Option<String>>(GET_VENDOR)
            .bind(ticket_num)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vendor)
    }

    async fn mark_entered(&self, ticket_num: i32) -> Result<u64, StoreError> {
        self.update(sqlx::query(SET_ENTERED).bind(ticket_num)).await
    }

    async fn clear_entrance(&self, ticket_num: i32) -> Result<u64, StoreError> {
        self.update(sqlx::query(ROLLBACK_ENTRANCE).bind(ticket_num)).await
    }

    async fn sell(
        &self,
        ticket_num: i32,
        first_name: &str,
        last_name: &str,
        vendor: &str,
    ) -> Result<u64, StoreError> {
        self.update(
            sqlx::query(SELL_TICKET)
                .bind(ticket_num)
                .bind(first_name)
                .bind(last_name)
                .bind(vendor),
        )
        .await
    }

    async fn reset(&self, ticket_num: i32) -> Result<u64, StoreError> {
        self.update(sqlx::query(RESET_TICKET).bind(ticket_num)).await
    }

    async fn count(&self, stat: Stat) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(stat.statement())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn staff(&self, username: &str) -> Result<Option<Staff>, StoreError> {
        let staff = sqlx::query_as::<_, Staff>(GET_CREDENTIALS)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }
}
