use std::str::FromStr;

use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::config::AppConfig;
use crate::models::{
    ChatRecord, NewOffer, NewProduct, NewWarranty, Offer, Product, ProductPage, Warranty,
};
use crate::query::{MatchMode, ProductField, ProductQuery};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;
        Self::connect(&config.sqlite_dsn()).await
    }

    pub async fn connect(dsn: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(dsn)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category TEXT,
                price REAL NOT NULL DEFAULT 0,
                description TEXT,
                specs TEXT NOT NULL DEFAULT 'null',
                stock INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS offers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL,
                discount_percentage REAL NOT NULL DEFAULT 0,
                coupon_code TEXT NOT NULL DEFAULT '',
                valid_till TEXT,
                FOREIGN KEY (product_id) REFERENCES products(id)
            );

            CREATE TABLE IF NOT EXISTS warranty_info (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL,
                warranty_period TEXT NOT NULL,
                claim_process TEXT,
                FOREIGN KEY (product_id) REFERENCES products(id)
            );

            CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                query TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_product(&self, product: &NewProduct) -> Result<Product> {
        let specs = serde_json::to_string(&product.specs).unwrap_or_else(|_| "null".to_string());
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, category, price, description, specs, stock)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, name, category, price, description, specs, stock
            "#,
        )
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(&product.description)
        .bind(specs)
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_product(row))
    }

    pub async fn insert_offer(&self, offer: &NewOffer) -> Result<Offer> {
        let row = sqlx::query(
            r#"
            INSERT INTO offers (product_id, discount_percentage, coupon_code, valid_till)
            VALUES (?, ?, ?, ?)
            RETURNING id, product_id, discount_percentage, coupon_code, valid_till
            "#,
        )
        .bind(offer.product_id)
        .bind(offer.discount_percentage)
        .bind(&offer.coupon_code)
        .bind(&offer.valid_till)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_offer(row))
    }

    pub async fn insert_warranty(&self, warranty: &NewWarranty) -> Result<Warranty> {
        let row = sqlx::query(
            r#"
            INSERT INTO warranty_info (product_id, warranty_period, claim_process)
            VALUES (?, ?, ?)
            RETURNING id, product_id, warranty_period, claim_process
            "#,
        )
        .bind(warranty.product_id)
        .bind(&warranty.warranty_period)
        .bind(&warranty.claim_process)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_warranty(row))
    }

    pub async fn find_product(&self, id: i64) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, category, price, description, specs, stock
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_product))
    }

    /// Execute a retrieval spec from the query builder. Keywords match as
    /// case-insensitive substrings; a warranty period narrows via a join.
    pub async fn search_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT p.id, p.name, p.category, p.price, p.description, p.specs, p.stock FROM products p",
        );

        if query.warranty_period.is_some() {
            qb.push(" JOIN warranty_info w ON w.product_id = p.id");
        }

        let mut has_where = false;
        if !query.keywords.is_empty() {
            qb.push(" WHERE ");
            has_where = true;
            match query.mode {
                MatchMode::All => {
                    for (idx, keyword) in query.keywords.iter().enumerate() {
                        if idx > 0 {
                            qb.push(" AND ");
                        }
                        push_field_conditions(&mut qb, keyword, &query.fields);
                    }
                }
                MatchMode::Any => {
                    for (idx, keyword) in query.keywords.iter().enumerate() {
                        if idx > 0 {
                            qb.push(" OR ");
                        }
                        push_field_conditions(&mut qb, keyword, &query.fields);
                    }
                }
            }
        }

        if let Some(period) = &query.warranty_period {
            qb.push(if has_where { " AND " } else { " WHERE " });
            qb.push("lower(w.warranty_period) LIKE ");
            qb.push_bind(format!("%{}%", period.to_lowercase()));
        }

        qb.push(" LIMIT ");
        qb.push_bind(query.limit);

        let rows: Vec<SqliteRow> = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_product).collect())
    }

    pub async fn products_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, name, category, price, description, specs, stock FROM products WHERE id IN (",
        );
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows: Vec<SqliteRow> = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_product).collect())
    }

    pub async fn list_products(&self, page: i64, per_page: i64) -> Result<ProductPage> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM products")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        let offset = (page.max(1) - 1) * per_page;
        let rows = sqlx::query(
            r#"
            SELECT id, name, category, price, description, specs, stock
            FROM products
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(ProductPage {
            products: rows.into_iter().map(row_to_product).collect(),
            total,
            current_page: page.max(1),
            per_page,
        })
    }

    pub async fn offers_for_products(&self, product_ids: &[i64]) -> Result<Vec<Offer>> {
        if product_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, product_id, discount_percentage, coupon_code, valid_till FROM offers WHERE product_id IN (",
        );
        let mut separated = qb.separated(",");
        for id in product_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows: Vec<SqliteRow> = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_offer).collect())
    }

    pub async fn sample_offers(&self, limit: i64) -> Result<Vec<Offer>> {
        let rows = sqlx::query(
            "SELECT id, product_id, discount_percentage, coupon_code, valid_till FROM offers LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_offer).collect())
    }

    pub async fn list_offers(&self) -> Result<Vec<Offer>> {
        let rows = sqlx::query(
            "SELECT id, product_id, discount_percentage, coupon_code, valid_till FROM offers",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_offer).collect())
    }

    pub async fn warranties_for_products(&self, product_ids: &[i64]) -> Result<Vec<Warranty>> {
        if product_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, product_id, warranty_period, claim_process FROM warranty_info WHERE product_id IN (",
        );
        let mut separated = qb.separated(",");
        for id in product_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows: Vec<SqliteRow> = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_warranty).collect())
    }

    pub async fn sample_warranties(&self, limit: i64) -> Result<Vec<Warranty>> {
        let rows = sqlx::query(
            "SELECT id, product_id, warranty_period, claim_process FROM warranty_info LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_warranty).collect())
    }

    pub async fn list_warranties(&self) -> Result<Vec<Warranty>> {
        let rows =
            sqlx::query("SELECT id, product_id, warranty_period, claim_process FROM warranty_info")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(row_to_warranty).collect())
    }

    pub async fn warranty_for_product(&self, product_id: i64) -> Result<Option<Warranty>> {
        let row = sqlx::query(
            r#"
            SELECT id, product_id, warranty_period, claim_process
            FROM warranty_info
            WHERE product_id = ?
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_warranty))
    }

    pub async fn save_chat(&self, user_id: Option<i64>, query: &str, response: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO chat_history (user_id, query, response, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(query)
        .bind(response)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn recent_chats(&self, user_id: i64, limit: i64) -> Result<Vec<ChatRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, query, response, created_at
            FROM chat_history
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_chat).collect())
    }

    pub async fn clear_chats(&self, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM chat_history WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn push_field_conditions(qb: &mut QueryBuilder<'_, Sqlite>, keyword: &str, fields: &[ProductField]) {
    let pattern = format!("%{}%", keyword.to_lowercase());
    qb.push("(");
    for (idx, field) in fields.iter().enumerate() {
        if idx > 0 {
            qb.push(" OR ");
        }
        qb.push(format!("lower(p.{}) LIKE ", field.column()));
        qb.push_bind(pattern.clone());
    }
    qb.push(")");
}

fn row_to_product(row: SqliteRow) -> Product {
    let specs = serde_json::from_str(&row.get::<String, _>("specs"))
        .unwrap_or(serde_json::Value::Null);
    Product {
        id: row.get("id"),
        name: row.get("name"),
        category: row.get("category"),
        price: row.get("price"),
        description: row.get("description"),
        specs,
        stock: row.get("stock"),
    }
}

fn row_to_offer(row: SqliteRow) -> Offer {
    Offer {
        id: row.get("id"),
        product_id: row.get("product_id"),
        discount_percentage: row.get("discount_percentage"),
        coupon_code: row.get("coupon_code"),
        valid_till: row.get("valid_till"),
    }
}

fn row_to_warranty(row: SqliteRow) -> Warranty {
    Warranty {
        id: row.get("id"),
        product_id: row.get("product_id"),
        warranty_period: row.get("warranty_period"),
        claim_process: row.get("claim_process"),
    }
}

fn row_to_chat(row: SqliteRow) -> ChatRecord {
    ChatRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        query: row.get("query"),
        response: row.get("response"),
        created_at: row.get("created_at"),
    }
}
