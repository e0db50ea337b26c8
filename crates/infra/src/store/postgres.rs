//! Postgres-backed market store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Concurrency` | Two writers created the same cart concurrently |
//! | Database (check constraint violation) | `23514` | `Database` | Stock would go negative, invalid stage text |
//! | Database (other) | Any other | `Database` | Other database errors |
//! | PoolClosed / other | N/A | `Database` | Connection failures etc. |
//!
//! ## Locking
//!
//! Checkout locks the buyer's cart row and every product row it touches
//! (`SELECT ... FOR UPDATE`, in id order) and re-validates stock under those locks.
//! Order updates lock the order row and compare versions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use marketplace_cart::{Cart, CartItem};
use marketplace_catalog::{Contact, Distributor, Product};
use marketplace_core::{AggregateRoot, CartId, ExpectedVersion, OrderId, ProductId, StageId, UserId};
use marketplace_orders::{
    ActingParty, CheckoutInput, Delivery, Order, OrderDetails, OrderStatus, StageRecord, StageState,
    plan_checkout,
};

use super::query::ListQuery;
use super::{CartStore, CatalogStore, OrderStore, StoreError};
use crate::config::DatabaseConfig;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

const PRODUCT_COLUMNS: &str = "id, distributor_id, product_name, product_description, price, \
     minimum_quantity, stock, city, category, img_urls";

const ORDER_SELECT: &str = r#"
    SELECT
        o.id, o.store_id, o.distributor_id, o.product_id, o.product_name, o.unit_price,
        o.quantity, o.total_price, o.created_at, o.city, o.address, o.store_email,
        o.distributor_email, o.status, o.version, s.id AS stage_id, s.stage, s.status AS stage_status
    FROM orders o
    JOIN stages s ON s.order_id = o.id
"#;

/// Postgres-backed store. `Send + Sync`; clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresMarketStore {
    pool: Arc<PgPool>,
}

impl PostgresMarketStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool with the configured size.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes.
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
        Ok(())
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, StoreError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))
    }
}

#[async_trait::async_trait]
impl CatalogStore for PostgresMarketStore {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product", e))?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn distributor(&self, user_id: UserId) -> Result<Option<Distributor>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, name, company_name, details, phone_number, city, img_url
            FROM distributors
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("distributor", e))?;

        row.map(|r| -> Result<Distributor, StoreError> {
            Ok(Distributor {
                user_id: UserId::from_uuid(get(&r, "user_id")?),
                name: get(&r, "name")?,
                company_name: get(&r, "company_name")?,
                details: get(&r, "details")?,
                phone_number: get(&r, "phone_number")?,
                city: get(&r, "city")?,
                img_url: get(&r, "img_url")?,
            })
        })
        .transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn contact(&self, user_id: UserId) -> Result<Option<Contact>, StoreError> {
        let mut conn = self.acquire().await?;
        let mut contacts = load_contacts(&mut *conn, &[*user_id.as_uuid()]).await?;
        Ok(contacts.pop())
    }
}

#[async_trait::async_trait]
impl CartStore for PostgresMarketStore {
    #[instrument(skip(self), fields(buyer_id = %buyer_id), err)]
    async fn load_cart(&self, buyer_id: UserId) -> Result<Option<Cart>, StoreError> {
        let mut conn = self.acquire().await?;
        load_cart(&mut *conn, buyer_id, false).await
    }

    #[instrument(
        skip(self, cart),
        fields(buyer_id = %cart.buyer_id(), items = cart.items().len(), expected = ?expected),
        err
    )]
    async fn save_cart(&self, cart: &Cart, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let existing = sqlx::query("SELECT id, version FROM carts WHERE store_id = $1 FOR UPDATE")
            .bind(cart.buyer_id().as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_cart", e))?;

        let (existing_id, current) = match existing {
            Some(row) => (Some(get::<Uuid>(&row, "id")?), get::<i64>(&row, "version")? as u64),
            None => (None, 0),
        };

        if !expected.matches(current) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::Concurrency(format!(
                "cart: expected {expected:?}, found {current}"
            )));
        }

        if cart.is_empty() {
            sqlx::query("DELETE FROM carts WHERE store_id = $1")
                .bind(cart.buyer_id().as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_cart", e))?;
        } else {
            let cart_id = match existing_id {
                Some(id) => {
                    sqlx::query("UPDATE carts SET version = $2 WHERE id = $1")
                        .bind(id)
                        .bind(cart.version() as i64)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error("update_cart", e))?;
                    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error("clear_cart_items", e))?;
                    id
                }
                None => {
                    let id = *cart.id().as_uuid();
                    sqlx::query("INSERT INTO carts (id, store_id, version) VALUES ($1, $2, $3)")
                        .bind(id)
                        .bind(cart.buyer_id().as_uuid())
                        .bind(cart.version() as i64)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error("insert_cart", e))?;
                    id
                }
            };

            for item in cart.items() {
                sqlx::query(
                    r#"
                    INSERT INTO cart_items (cart_id, product_id, distributor_id, quantity, unit_price)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(cart_id)
                .bind(item.product_id.as_uuid())
                .bind(item.distributor_id.as_uuid())
                .bind(item.quantity)
                .bind(item.unit_price)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_cart_item", e))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(buyer_id = %buyer_id), err)]
    async fn delete_cart(&self, buyer_id: UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM carts WHERE store_id = $1")
            .bind(buyer_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_cart", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderStore for PostgresMarketStore {
    #[instrument(
        skip(self, delivery),
        fields(buyer_id = %buyer_id, orders = tracing::field::Empty),
        err
    )]
    async fn checkout(
        &self,
        buyer_id: UserId,
        delivery: &Delivery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        let span = Span::current();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let cart = load_cart(&mut *tx, buyer_id, true).await?;

        let mut product_ids: Vec<Uuid> = cart
            .iter()
            .flat_map(|c| c.items().iter().map(|i| *i.product_id.as_uuid()))
            .collect();
        product_ids.sort();

        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_products", e))?;
        let products = rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let mut user_ids: Vec<Uuid> = products.iter().map(|p| *p.distributor_id.as_uuid()).collect();
        user_ids.push(*buyer_id.as_uuid());
        let contacts = load_contacts(&mut *tx, &user_ids).await?;
        let buyer = contacts
            .iter()
            .find(|c| c.user_id == buyer_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("contact {buyer_id}")))?;

        let plan = match plan_checkout(CheckoutInput {
            cart: cart.as_ref(),
            products: &products,
            buyer: &buyer,
            sellers: &contacts,
            delivery,
            now,
        }) {
            Ok(plan) => plan,
            Err(e) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(e.into());
            }
        };

        for decrement in &plan.decrements {
            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
                .bind(decrement.product_id.as_uuid())
                .bind(decrement.quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("decrement_stock", e))?;
        }

        for order in &plan.orders {
            insert_order(&mut *tx, order).await?;
        }

        sqlx::query("DELETE FROM carts WHERE store_id = $1")
            .bind(buyer_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_cart", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        span.record("orders", plan.orders.len());
        Ok(plan.orders)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn load_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_order", e))?;

        row.map(|r| order_from_row(&r)).transpose()
    }

    #[instrument(
        skip(self, order),
        fields(order_id = %order.id(), expected = ?expected, release = ?release),
        err
    )]
    async fn commit_order(
        &self,
        order: &Order,
        expected: ExpectedVersion,
        release: Option<(ProductId, i64)>,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query("SELECT version FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order.id().as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_order", e))?
            .ok_or_else(|| StoreError::NotFound(format!("order {}", order.id())))?;
        let current = get::<i64>(&row, "version")? as u64;

        if !expected.matches(current) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::Concurrency(format!(
                "order {}: expected {expected:?}, found {current}",
                order.id()
            )));
        }

        if let Some((product_id, quantity)) = release {
            let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
                .bind(product_id.as_uuid())
                .bind(quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("release_stock", e))?;
            if result.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::NotFound(format!("product {product_id}")));
            }
        }

        let stage = order.stage();
        sqlx::query("UPDATE stages SET stage = $2, status = $3 WHERE id = $1")
            .bind(stage.id.as_uuid())
            .bind(stage.state.stage.as_str())
            .bind(stage.state.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_stage", e))?;

        sqlx::query("UPDATE orders SET status = $2, version = $3 WHERE id = $1")
            .bind(order.id().as_uuid())
            .bind(order.status().as_str())
            .bind(order.version() as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_order", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self, query), fields(party = ?party, page = query.page), err)]
    async fn list_orders(
        &self,
        party: ActingParty,
        query: &ListQuery,
    ) -> Result<(Vec<Order>, u64), StoreError> {
        let column = party_column(party);

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) AS total FROM orders WHERE {column} = $1"))
            .bind(party.user_id().as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_orders", e))
            .and_then(|row| get(&row, "total"))?;

        let rows = sqlx::query(&format!(
            "{ORDER_SELECT} WHERE o.{column} = $1 ORDER BY o.{sort} {dir}, o.id ASC LIMIT $2 OFFSET $3",
            sort = query.sort.field.column(),
            dir = query.sort.direction(),
        ))
        .bind(party.user_id().as_uuid())
        .bind(i64::from(query.limit()))
        .bind(query.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let orders = rows.iter().map(order_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((orders, total as u64))
    }

    #[instrument(skip(self), fields(party = ?party), err)]
    async fn list_fulfilled_orders(&self, party: ActingParty) -> Result<Vec<Order>, StoreError> {
        let column = party_column(party);
        let rows = sqlx::query(&format!(
            "{ORDER_SELECT} WHERE o.{column} = $1 AND o.status = 'closed' \
             AND s.stage = 'success' AND s.status = 'success' \
             ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(party.user_id().as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_fulfilled_orders", e))?;

        rows.iter().map(order_from_row).collect()
    }
}

fn party_column(party: ActingParty) -> &'static str {
    match party {
        ActingParty::Buyer(_) => "store_id",
        ActingParty::Seller(_) => "distributor_id",
    }
}

async fn load_cart(
    conn: &mut PgConnection,
    buyer_id: UserId,
    for_update: bool,
) -> Result<Option<Cart>, StoreError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let Some(row) = sqlx::query(&format!("SELECT id, version FROM carts WHERE store_id = $1{lock}"))
        .bind(buyer_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("load_cart", e))?
    else {
        return Ok(None);
    };
    let cart_id: Uuid = get(&row, "id")?;
    let version: i64 = get(&row, "version")?;

    let rows = sqlx::query(
        r#"
        SELECT product_id, distributor_id, quantity, unit_price
        FROM cart_items
        WHERE cart_id = $1
        ORDER BY product_id
        "#,
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_cart_items", e))?;

    let items = rows
        .iter()
        .map(|r| -> Result<CartItem, StoreError> {
            Ok(CartItem {
                product_id: ProductId::from_uuid(get(r, "product_id")?),
                distributor_id: UserId::from_uuid(get(r, "distributor_id")?),
                quantity: get(r, "quantity")?,
                unit_price: get(r, "unit_price")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let cart = Cart::restore(CartId::from_uuid(cart_id), buyer_id, items, version as u64)?;
    Ok(Some(cart))
}

async fn load_contacts(conn: &mut PgConnection, user_ids: &[Uuid]) -> Result<Vec<Contact>, StoreError> {
    let rows = sqlx::query("SELECT id, email FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("load_contacts", e))?;

    rows.iter()
        .map(|r| -> Result<Contact, StoreError> {
            Ok(Contact {
                user_id: UserId::from_uuid(get(r, "id")?),
                email: get(r, "email")?,
            })
        })
        .collect()
}

async fn insert_order(conn: &mut PgConnection, order: &Order) -> Result<(), StoreError> {
    let d = order.details();
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, store_id, distributor_id, product_id, product_name, unit_price, quantity,
            total_price, created_at, city, address, store_email, distributor_email,
            status, version
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(order.id().as_uuid())
    .bind(d.buyer_id.as_uuid())
    .bind(d.seller_id.as_uuid())
    .bind(d.product_id.as_uuid())
    .bind(&d.product_name)
    .bind(d.unit_price)
    .bind(d.quantity)
    .bind(d.total_price)
    .bind(d.created_at)
    .bind(&d.city)
    .bind(&d.address)
    .bind(&d.buyer_email)
    .bind(&d.seller_email)
    .bind(order.status().as_str())
    .bind(order.version() as i64)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_order", e))?;

    let stage = order.stage();
    sqlx::query("INSERT INTO stages (id, order_id, stage, status) VALUES ($1, $2, $3, $4)")
        .bind(stage.id.as_uuid())
        .bind(order.id().as_uuid())
        .bind(stage.state.stage.as_str())
        .bind(stage.state.status.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("insert_stage", e))?;

    Ok(())
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: ProductId::from_uuid(get(row, "id")?),
        distributor_id: UserId::from_uuid(get(row, "distributor_id")?),
        product_name: get(row, "product_name")?,
        product_description: get(row, "product_description")?,
        price: get::<Decimal>(row, "price")?,
        minimum_quantity: get(row, "minimum_quantity")?,
        stock: get(row, "stock")?,
        city: get(row, "city")?,
        category: get(row, "category")?,
        img_urls: get(row, "img_urls")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let parse_err = |e: marketplace_core::DomainError| StoreError::Database(format!("corrupt order row: {e}"));

    let details = OrderDetails {
        buyer_id: UserId::from_uuid(get(row, "store_id")?),
        seller_id: UserId::from_uuid(get(row, "distributor_id")?),
        product_id: ProductId::from_uuid(get(row, "product_id")?),
        product_name: get(row, "product_name")?,
        unit_price: get(row, "unit_price")?,
        quantity: get(row, "quantity")?,
        total_price: get(row, "total_price")?,
        created_at: get(row, "created_at")?,
        city: get(row, "city")?,
        address: get(row, "address")?,
        buyer_email: get(row, "store_email")?,
        seller_email: get(row, "distributor_email")?,
    };
    let status: OrderStatus = get::<String>(row, "status")?.parse().map_err(parse_err)?;
    let state = StageState::new(
        get::<String>(row, "stage")?.parse().map_err(parse_err)?,
        get::<String>(row, "stage_status")?.parse().map_err(parse_err)?,
    );
    let stage = StageRecord::new(StageId::from_uuid(get(row, "stage_id")?), state);
    let version: i64 = get(row, "version")?;

    Ok(Order::restore(
        OrderId::from_uuid(get(row, "id")?),
        details,
        status,
        stage,
        version as u64,
    ))
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Database(format!("failed to read column {column}: {e}")))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Concurrency(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(operation.to_string()),
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}
