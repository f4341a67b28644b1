use async_trait::async_trait;

use crate::{
    error::ServiceError,
    schema::{Ingredient, Receipt, ReceiptTagLink, Tag, Uuid, Workstep},
};

/// Source of transactions. Every service operation opens exactly one.
#[async_trait]
pub trait EntityStore: Send + Sync {
    type Tx: StoreTransaction;

    async fn begin(&self) -> Result<Self::Tx, ServiceError>;
}

/// A scoped unit of work over the entity tables.
///
/// Nothing is visible to other transactions until [`StoreTransaction::commit`]
/// succeeds; dropping the handle without committing rolls everything back.
/// `insert_*` only creates rows. `update_*`, `delete_*` and `read_*` by id fail
/// with [`ServiceError::NotFound`] when no row matches, so a row deleted by a
/// concurrent transaction is never written back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads a receipt and holds it locked until the transaction ends.
    /// Serializes every change under the receipt.
    async fn lock_receipt(&mut self, id: Uuid) -> Result<Receipt, ServiceError>;
    async fn insert_receipt(&mut self, receipt: &Receipt) -> Result<Receipt, ServiceError>;
    /// Writes title and description.
    async fn update_receipt(&mut self, receipt: &Receipt) -> Result<Receipt, ServiceError>;
    async fn read_receipt(&mut self, id: Uuid) -> Result<Receipt, ServiceError>;
    async fn read_receipts_by_owner(&mut self, owner_id: Uuid)
        -> Result<Vec<Receipt>, ServiceError>;
    async fn delete_receipt(&mut self, receipt: &Receipt) -> Result<(), ServiceError>;

    async fn insert_ingredient(&mut self, ingredient: &Ingredient)
        -> Result<Ingredient, ServiceError>;
    /// Writes amount, unit and name.
    async fn update_ingredient(&mut self, ingredient: &Ingredient)
        -> Result<Ingredient, ServiceError>;
    async fn read_ingredient(&mut self, id: Uuid) -> Result<Ingredient, ServiceError>;
    async fn read_ingredients_by_receipt(
        &mut self,
        receipt_id: Uuid,
    ) -> Result<Vec<Ingredient>, ServiceError>;
    async fn delete_ingredient(&mut self, ingredient: &Ingredient) -> Result<(), ServiceError>;

    async fn insert_workstep(&mut self, workstep: &Workstep) -> Result<Workstep, ServiceError>;
    /// Writes the text only, the order number is left as stored.
    async fn update_workstep(&mut self, workstep: &Workstep) -> Result<Workstep, ServiceError>;
    /// Writes the order number only.
    async fn renumber_workstep(
        &mut self,
        id: Uuid,
        order_number: i32,
    ) -> Result<Workstep, ServiceError>;
    async fn read_workstep(&mut self, id: Uuid) -> Result<Workstep, ServiceError>;
    /// Fetch order is unspecified.
    async fn read_worksteps_by_receipt(
        &mut self,
        receipt_id: Uuid,
    ) -> Result<Vec<Workstep>, ServiceError>;
    async fn delete_workstep(&mut self, workstep: &Workstep) -> Result<(), ServiceError>;

    /// Reads a tag and holds it locked until the transaction ends.
    /// Serializes the orphan check against concurrent link changes.
    async fn lock_tag(&mut self, id: Uuid) -> Result<Tag, ServiceError>;
    /// Returns `None` when a tag with the same name already exists.
    async fn insert_tag(&mut self, tag: &Tag) -> Result<Option<Tag>, ServiceError>;
    async fn read_tag(&mut self, id: Uuid) -> Result<Tag, ServiceError>;
    async fn find_tag(&mut self, name: &str) -> Result<Option<Tag>, ServiceError>;
    async fn read_tags(&mut self) -> Result<Vec<Tag>, ServiceError>;
    async fn delete_tag(&mut self, tag: &Tag) -> Result<(), ServiceError>;

    /// Inserting an existing link is a no-op.
    async fn save_link(&mut self, link: &ReceiptTagLink) -> Result<ReceiptTagLink, ServiceError>;
    async fn read_link(
        &mut self,
        receipt_id: Uuid,
        tag_id: Uuid,
    ) -> Result<ReceiptTagLink, ServiceError>;
    async fn read_links_by_receipt(
        &mut self,
        receipt_id: Uuid,
    ) -> Result<Vec<ReceiptTagLink>, ServiceError>;
    async fn read_links_by_tag(&mut self, tag_id: Uuid)
        -> Result<Vec<ReceiptTagLink>, ServiceError>;
    async fn delete_link(&mut self, link: &ReceiptTagLink) -> Result<(), ServiceError>;

    async fn commit(self) -> Result<(), ServiceError>;
}
