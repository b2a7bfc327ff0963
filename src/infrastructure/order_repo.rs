use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, Order, OrderHeader, OrderLine};
use crate::domain::ports::{OrderStore, OrderTransaction};
use crate::schema::{order_lines, orders};

use super::models::{NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow};

type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

fn header_from_row(row: OrderRow) -> Result<OrderHeader, DomainError> {
    Ok(OrderHeader {
        id: row.id,
        customer_ref: row.customer_ref,
        status: row.status.parse()?,
        placed_at: row.placed_at,
    })
}

// ── Transaction handle ───────────────────────────────────────────────────────

/// A database transaction pinned to one pooled connection.
///
/// `BEGIN` is issued on construction. Unless `commit` succeeds, the
/// transaction is rolled back, either explicitly or when the handle drops,
/// before the connection returns to the pool.
pub struct DieselOrderTransaction {
    conn: PgPooled,
    open: bool,
    next_position: i32,
}

impl DieselOrderTransaction {
    fn begin(mut conn: PgPooled) -> Result<Self, DomainError> {
        AnsiTransactionManager::begin_transaction(&mut *conn)?;
        Ok(Self {
            conn,
            open: true,
            next_position: 0,
        })
    }

    fn abort(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = AnsiTransactionManager::rollback_transaction(&mut *self.conn) {
            log::warn!("rollback of order transaction failed: {}", e);
        }
    }
}

impl OrderTransaction for DieselOrderTransaction {
    fn insert_order(&mut self, header: &OrderHeader) -> Result<(), DomainError> {
        diesel::insert_into(orders::table)
            .values(&NewOrderRow {
                id: header.id,
                customer_ref: &header.customer_ref,
                status: header.status.as_str(),
                placed_at: header.placed_at,
            })
            .execute(&mut *self.conn)?;
        Ok(())
    }

    fn insert_line_item(&mut self, order_id: Uuid, line: &OrderLine) -> Result<(), DomainError> {
        diesel::insert_into(order_lines::table)
            .values(&NewOrderLineRow {
                id: Uuid::new_v4(),
                order_id,
                product_id: line.product_id,
                product_name: &line.product_name,
                quantity: line.quantity,
                unit_price: &line.unit_price,
                line_cost: &line.line_cost,
                position: self.next_position,
            })
            .execute(&mut *self.conn)?;
        self.next_position += 1;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), DomainError> {
        // A failed COMMIT already ends the transaction; Drop must not roll back again.
        self.open = false;
        AnsiTransactionManager::commit_transaction(&mut *self.conn)?;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) {
        self.abort();
    }
}

impl Drop for DieselOrderTransaction {
    fn drop(&mut self) {
        self.abort();
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderStore for DieselOrderRepository {
    fn begin(&self) -> Result<Box<dyn OrderTransaction + '_>, DomainError> {
        let conn = self.pool.get()?;
        Ok(Box::new(DieselOrderTransaction::begin(conn)?))
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let order: Option<OrderRow> = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines: Vec<OrderLineRow> = OrderLineRow::belonging_to(&order)
            .select(OrderLineRow::as_select())
            .order(order_lines::position.asc())
            .load(&mut conn)?;

        let header = header_from_row(order)?;
        Ok(Some(Order::from_parts(
            header,
            lines
                .into_iter()
                .map(|l| OrderLine {
                    order_id: l.order_id,
                    product_id: l.product_id,
                    product_name: l.product_name,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                    line_cost: l.line_cost,
                })
                .collect(),
        )))
    }

    fn list(&self, offset: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows: Vec<OrderRow> = orders::table
                .select(OrderRow::as_select())
                .order((orders::placed_at.desc(), orders::id.asc()))
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ListResult {
                items: rows
                    .into_iter()
                    .map(header_from_row)
                    .collect::<Result<Vec<_>, DomainError>>()?,
                total,
            })
        })
    }
}
