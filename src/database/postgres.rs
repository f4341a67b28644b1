use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgQueryResult},
    Pool, Postgres, Transaction,
};

use crate::{
    config::Config,
    error::{QueryError, ServiceError},
    schema::{Ingredient, Receipt, ReceiptTagLink, Tag, Uuid, Workstep},
    store::{EntityStore, StoreTransaction},
};

/// Postgres-backed entity store.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Opens the pool and brings the schema up to date.
    pub async fn connect(config: &Config) -> Result<Self, ServiceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(QueryError::from)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| QueryError::from(sqlx::Error::from(e)))?;

        log::info!("Connected to database, migrations applied");
        Ok(Self::new(pool))
    }
}

pub struct PgTransaction {
    tr: Transaction<'static, Postgres>,
}

#[async_trait]
impl EntityStore for PgStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<Self::Tx, ServiceError> {
        let tr = self
            .pool
            .begin()
            .await
            .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

        Ok(PgTransaction { tr })
    }
}

fn not_found(entity: &str, id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("{entity} with id \"{id}\" not found"))
}

fn expect_row(result: PgQueryResult, entity: &str, id: Uuid) -> Result<(), ServiceError> {
    match result.rows_affected() {
        0 => Err(not_found(entity, id)),
        _ => Ok(()),
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn lock_receipt(&mut self, id: Uuid) -> Result<Receipt, ServiceError> {
        let row: Option<Receipt> = sqlx::query_as("SELECT * FROM receipts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        row.ok_or_else(|| not_found("Receipt", id))
    }

    async fn insert_receipt(&mut self, receipt: &Receipt) -> Result<Receipt, ServiceError> {
        let row: Receipt = sqlx::query_as(
            "
            INSERT INTO receipts (id, title, description, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
        ",
        )
        .bind(receipt.id)
        .bind(&receipt.title)
        .bind(&receipt.description)
        .bind(receipt.owner_id)
        .fetch_one(&mut *self.tr)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn update_receipt(&mut self, receipt: &Receipt) -> Result<Receipt, ServiceError> {
        let row: Option<Receipt> = sqlx::query_as(
            "UPDATE receipts SET title = $2, description = $3 WHERE id = $1 RETURNING *",
        )
        .bind(receipt.id)
        .bind(&receipt.title)
        .bind(&receipt.description)
        .fetch_optional(&mut *self.tr)
        .await
        .map_err(QueryError::from)?;

        row.ok_or_else(|| not_found("Receipt", receipt.id))
    }

    async fn read_receipt(&mut self, id: Uuid) -> Result<Receipt, ServiceError> {
        let row: Option<Receipt> = sqlx::query_as("SELECT * FROM receipts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        row.ok_or_else(|| not_found("Receipt", id))
    }

    async fn read_receipts_by_owner(
        &mut self,
        owner_id: Uuid,
    ) -> Result<Vec<Receipt>, ServiceError> {
        let rows: Vec<Receipt> =
            sqlx::query_as("SELECT * FROM receipts WHERE owner_id = $1 ORDER BY title")
                .bind(owner_id)
                .fetch_all(&mut *self.tr)
                .await
                .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn delete_receipt(&mut self, receipt: &Receipt) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM receipts WHERE id = $1")
            .bind(receipt.id)
            .execute(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        expect_row(result, "Receipt", receipt.id)
    }

    async fn insert_ingredient(
        &mut self,
        ingredient: &Ingredient,
    ) -> Result<Ingredient, ServiceError> {
        let row: Ingredient = sqlx::query_as(
            "
            INSERT INTO ingredients (id, amount, unit, ingredient, receipt_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(ingredient.id)
        .bind(ingredient.amount)
        .bind(&ingredient.unit)
        .bind(&ingredient.ingredient)
        .bind(ingredient.receipt_id)
        .fetch_one(&mut *self.tr)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn update_ingredient(
        &mut self,
        ingredient: &Ingredient,
    ) -> Result<Ingredient, ServiceError> {
        let row: Option<Ingredient> = sqlx::query_as(
            "
            UPDATE ingredients SET amount = $2, unit = $3, ingredient = $4
            WHERE id = $1
            RETURNING *
        ",
        )
        .bind(ingredient.id)
        .bind(ingredient.amount)
        .bind(&ingredient.unit)
        .bind(&ingredient.ingredient)
        .fetch_optional(&mut *self.tr)
        .await
        .map_err(QueryError::from)?;

        row.ok_or_else(|| not_found("Ingredient", ingredient.id))
    }

    async fn read_ingredient(&mut self, id: Uuid) -> Result<Ingredient, ServiceError> {
        let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        row.ok_or_else(|| not_found("Ingredient", id))
    }

    async fn read_ingredients_by_receipt(
        &mut self,
        receipt_id: Uuid,
    ) -> Result<Vec<Ingredient>, ServiceError> {
        let rows: Vec<Ingredient> =
            sqlx::query_as("SELECT * FROM ingredients WHERE receipt_id = $1")
                .bind(receipt_id)
                .fetch_all(&mut *self.tr)
                .await
                .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn delete_ingredient(&mut self, ingredient: &Ingredient) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(ingredient.id)
            .execute(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        expect_row(result, "Ingredient", ingredient.id)
    }

    async fn insert_workstep(&mut self, workstep: &Workstep) -> Result<Workstep, ServiceError> {
        let row: Workstep = sqlx::query_as(
            "
            INSERT INTO worksteps (id, order_number, workstep, receipt_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
        ",
        )
        .bind(workstep.id)
        .bind(workstep.order_number)
        .bind(&workstep.workstep)
        .bind(workstep.receipt_id)
        .fetch_one(&mut *self.tr)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn update_workstep(&mut self, workstep: &Workstep) -> Result<Workstep, ServiceError> {
        let row: Option<Workstep> =
            sqlx::query_as("UPDATE worksteps SET workstep = $2 WHERE id = $1 RETURNING *")
                .bind(workstep.id)
                .bind(&workstep.workstep)
                .fetch_optional(&mut *self.tr)
                .await
                .map_err(QueryError::from)?;

        row.ok_or_else(|| not_found("Workstep", workstep.id))
    }

    async fn renumber_workstep(
        &mut self,
        id: Uuid,
        order_number: i32,
    ) -> Result<Workstep, ServiceError> {
        let row: Option<Workstep> =
            sqlx::query_as("UPDATE worksteps SET order_number = $2 WHERE id = $1 RETURNING *")
                .bind(id)
                .bind(order_number)
                .fetch_optional(&mut *self.tr)
                .await
                .map_err(QueryError::from)?;

        row.ok_or_else(|| not_found("Workstep", id))
    }

    async fn read_workstep(&mut self, id: Uuid) -> Result<Workstep, ServiceError> {
        let row: Option<Workstep> = sqlx::query_as("SELECT * FROM worksteps WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        row.ok_or_else(|| not_found("Workstep", id))
    }

    async fn read_worksteps_by_receipt(
        &mut self,
        receipt_id: Uuid,
    ) -> Result<Vec<Workstep>, ServiceError> {
        let rows: Vec<Workstep> = sqlx::query_as("SELECT * FROM worksteps WHERE receipt_id = $1")
            .bind(receipt_id)
            .fetch_all(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn delete_workstep(&mut self, workstep: &Workstep) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM worksteps WHERE id = $1")
            .bind(workstep.id)
            .execute(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        expect_row(result, "Workstep", workstep.id)
    }

    async fn lock_tag(&mut self, id: Uuid) -> Result<Tag, ServiceError> {
        let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        row.ok_or_else(|| not_found("Tag", id))
    }

    async fn insert_tag(&mut self, tag: &Tag) -> Result<Option<Tag>, ServiceError> {
        let row: Option<Tag> = sqlx::query_as(
            "INSERT INTO tags (id, tag) VALUES ($1, $2) ON CONFLICT (tag) DO NOTHING RETURNING *",
        )
        .bind(tag.id)
        .bind(&tag.tag)
        .fetch_optional(&mut *self.tr)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn read_tag(&mut self, id: Uuid) -> Result<Tag, ServiceError> {
        let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        row.ok_or_else(|| not_found("Tag", id))
    }

    async fn find_tag(&mut self, name: &str) -> Result<Option<Tag>, ServiceError> {
        let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE tag = $1")
            .bind(name)
            .fetch_optional(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn read_tags(&mut self) -> Result<Vec<Tag>, ServiceError> {
        let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY tag")
            .fetch_all(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn delete_tag(&mut self, tag: &Tag) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(tag.id)
            .execute(&mut *self.tr)
            .await
            .map_err(QueryError::from)?;

        expect_row(result, "Tag", tag.id)
    }

    async fn save_link(&mut self, link: &ReceiptTagLink) -> Result<ReceiptTagLink, ServiceError> {
        sqlx::query(
            "INSERT INTO receipt_tag_links (receipt_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(link.receipt_id)
        .bind(link.tag_id)
        .execute(&mut *self.tr)
        .await
        .map_err(QueryError::from)?;

        Ok(*link)
    }

    async fn read_link(
        &mut self,
        receipt_id: Uuid,
        tag_id: Uuid,
    ) -> Result<ReceiptTagLink, ServiceError> {
        let row: Option<ReceiptTagLink> = sqlx::query_as(
            "SELECT * FROM receipt_tag_links WHERE receipt_id = $1 AND tag_id = $2",
        )
        .bind(receipt_id)
        .bind(tag_id)
        .fetch_optional(&mut *self.tr)
        .await
        .map_err(QueryError::from)?;

        row.ok_or_else(|| ServiceError::NotFound("No Link found".to_owned()))
    }

    async fn read_links_by_receipt(
        &mut self,
        receipt_id: Uuid,
    ) -> Result<Vec<ReceiptTagLink>, ServiceError> {
        let rows: Vec<ReceiptTagLink> =
            sqlx::query_as("SELECT * FROM receipt_tag_links WHERE receipt_id = $1")
                .bind(receipt_id)
                .fetch_all(&mut *self.tr)
                .await
                .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn read_links_by_tag(
        &mut self,
        tag_id: Uuid,
    ) -> Result<Vec<ReceiptTagLink>, ServiceError> {
        let rows: Vec<ReceiptTagLink> =
            sqlx::query_as("SELECT * FROM receipt_tag_links WHERE tag_id = $1")
                .bind(tag_id)
                .fetch_all(&mut *self.tr)
                .await
                .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn delete_link(&mut self, link: &ReceiptTagLink) -> Result<(), ServiceError> {
        let result =
            sqlx::query("DELETE FROM receipt_tag_links WHERE receipt_id = $1 AND tag_id = $2")
                .bind(link.receipt_id)
                .bind(link.tag_id)
                .execute(&mut *self.tr)
                .await
                .map_err(QueryError::from)?;

        match result.rows_affected() {
            0 => Err(ServiceError::NotFound("No Link found".to_owned())),
            _ => Ok(()),
        }
    }

    async fn commit(self) -> Result<(), ServiceError> {
        self.tr
            .commit()
            .await
            .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

        Ok(())
    }
}
