use crate::database::error::{DatabaseError, DbResult};
use crate::error::{AppError, AppResult};
use crate::payments::traits::OrderFulfillment;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

/// Order payment state.
///
/// ```sql
/// CREATE TABLE orders (
///     id           TEXT PRIMARY KEY,
///     status       TEXT NOT NULL DEFAULT 'pending',
///     paid_gateway TEXT,
///     paid_at      TIMESTAMPTZ
/// );
/// ```
#[derive(Debug, Clone, FromRow)]
pub struct OrderRecord {
    pub id: String,
    pub status: String,
    pub paid_gateway: Option<String>,
    pub paid_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl OrderRecord {
    pub fn is_paid(&self) -> bool {
        self.status == PAID
    }
}

const PAID: &str = "paid";

/// Postgres-backed order fulfillment
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<OrderRecord>> {
        sqlx::query_as::<_, OrderRecord>(
            "SELECT id, status, paid_gateway, paid_at FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Create a pending order if it does not exist yet
    pub async fn ensure_pending(&self, id: &str) -> DbResult<OrderRecord> {
        sqlx::query(
            "INSERT INTO orders (id, status) VALUES ($1, 'pending') ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::OrderNotFound {
                order_id: id.to_string(),
            })
    }

    /// Move an order to `paid`. Returns `false` when it already was.
    ///
    /// The conditional update makes concurrent and repeated deliveries
    /// converge on a single transition.
    pub async fn mark_paid_once(&self, id: &str, gateway: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = $3, paid_gateway = $2, paid_at = NOW()
             WHERE id = $1 AND status <> $3",
        )
        .bind(id)
        .bind(gateway)
        .bind(PAID)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        match self.find_by_id(id).await? {
            Some(order) if order.is_paid() => Ok(false),
            Some(order) => Err(DatabaseError::UnexpectedStatus {
                order_id: order.id,
                status: order.status,
            }),
            None => Err(DatabaseError::OrderNotFound {
                order_id: id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl OrderFulfillment for PgOrderRepository {
    async fn mark_paid(&self, order_id: &str, gateway: &str) -> AppResult<()> {
        match self.mark_paid_once(order_id, gateway).await {
            Ok(true) => {
                info!("Order {} marked paid via {}", order_id, gateway);
                Ok(())
            }
            Ok(false) => {
                debug!("Order {} already paid, ignoring repeat delivery", order_id);
                Ok(())
            }
            Err(e) => Err(AppError::fulfillment(order_id, e.to_string())),
        }
    }
}
