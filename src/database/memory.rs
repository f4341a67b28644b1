use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{QueryError, ServiceError},
    schema::{Ingredient, Receipt, ReceiptTagLink, Tag, Uuid, Workstep},
    store::{EntityStore, StoreTransaction},
};

#[derive(Clone, Debug, Default)]
struct Tables {
    receipts: HashMap<Uuid, Receipt>,
    ingredients: HashMap<Uuid, Ingredient>,
    worksteps: HashMap<Uuid, Workstep>,
    tags: HashMap<Uuid, Tag>,
    links: Vec<ReceiptTagLink>,
}

/// Process-local entity store with the same constraints as the Postgres schema.
///
/// Transactions are fully serialized: `begin` waits for the previous one to
/// finish and works on a private copy that `commit` publishes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl EntityStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, ServiceError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTransaction { guard, working })
    }
}

fn constraint(info: &str) -> ServiceError {
    QueryError::new(info.to_owned()).into()
}

fn not_found(entity: &str, id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("{entity} with id \"{id}\" not found"))
}

impl Tables {
    fn require_receipt(&self, id: Uuid) -> Result<(), ServiceError> {
        if self.receipts.contains_key(&id) {
            Ok(())
        } else {
            Err(constraint("foreign key violation: receipt does not exist"))
        }
    }

    fn check_workstep_order(&self) -> Result<(), ServiceError> {
        let mut seen = HashSet::new();
        for workstep in self.worksteps.values() {
            if workstep.order_number < 1 {
                return Err(constraint("check violation: order_number must be positive"));
            }
            if !seen.insert((workstep.receipt_id, workstep.order_number)) {
                return Err(constraint("unique violation: worksteps_order_unique"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_receipt(&mut self, id: Uuid) -> Result<Receipt, ServiceError> {
        self.read_receipt(id).await
    }

    async fn insert_receipt(&mut self, receipt: &Receipt) -> Result<Receipt, ServiceError> {
        if self.working.receipts.contains_key(&receipt.id) {
            return Err(constraint("unique violation: receipts_pkey"));
        }

        self.working.receipts.insert(receipt.id, receipt.clone());
        Ok(receipt.clone())
    }

    async fn update_receipt(&mut self, receipt: &Receipt) -> Result<Receipt, ServiceError> {
        let stored = self
            .working
            .receipts
            .get_mut(&receipt.id)
            .ok_or_else(|| not_found("Receipt", receipt.id))?;
        stored.title = receipt.title.clone();
        stored.description = receipt.description.clone();

        Ok(stored.clone())
    }

    async fn read_receipt(&mut self, id: Uuid) -> Result<Receipt, ServiceError> {
        self.working
            .receipts
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("Receipt", id))
    }

    async fn read_receipts_by_owner(
        &mut self,
        owner_id: Uuid,
    ) -> Result<Vec<Receipt>, ServiceError> {
        let mut receipts: Vec<Receipt> = self
            .working
            .receipts
            .values()
            .filter(|receipt| receipt.owner_id == owner_id)
            .cloned()
            .collect();
        receipts.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(receipts)
    }

    async fn delete_receipt(&mut self, receipt: &Receipt) -> Result<(), ServiceError> {
        let tables = &self.working;
        let referenced = tables
            .ingredients
            .values()
            .any(|i| i.receipt_id == receipt.id)
            || tables.worksteps.values().any(|w| w.receipt_id == receipt.id)
            || tables.links.iter().any(|l| l.receipt_id == receipt.id);

        if referenced {
            return Err(constraint("foreign key violation: receipt is still referenced"));
        }

        self.working
            .receipts
            .remove(&receipt.id)
            .map(|_| ())
            .ok_or_else(|| not_found("Receipt", receipt.id))
    }

    async fn insert_ingredient(
        &mut self,
        ingredient: &Ingredient,
    ) -> Result<Ingredient, ServiceError> {
        self.working.require_receipt(ingredient.receipt_id)?;
        if self.working.ingredients.contains_key(&ingredient.id) {
            return Err(constraint("unique violation: ingredients_pkey"));
        }

        self.working
            .ingredients
            .insert(ingredient.id, ingredient.clone());
        Ok(ingredient.clone())
    }

    async fn update_ingredient(
        &mut self,
        ingredient: &Ingredient,
    ) -> Result<Ingredient, ServiceError> {
        let stored = self
            .working
            .ingredients
            .get_mut(&ingredient.id)
            .ok_or_else(|| not_found("Ingredient", ingredient.id))?;
        stored.amount = ingredient.amount;
        stored.unit = ingredient.unit.clone();
        stored.ingredient = ingredient.ingredient.clone();

        Ok(stored.clone())
    }

    async fn read_ingredient(&mut self, id: Uuid) -> Result<Ingredient, ServiceError> {
        self.working
            .ingredients
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("Ingredient", id))
    }

    async fn read_ingredients_by_receipt(
        &mut self,
        receipt_id: Uuid,
    ) -> Result<Vec<Ingredient>, ServiceError> {
        Ok(self
            .working
            .ingredients
            .values()
            .filter(|ingredient| ingredient.receipt_id == receipt_id)
            .cloned()
            .collect())
    }

    async fn delete_ingredient(&mut self, ingredient: &Ingredient) -> Result<(), ServiceError> {
        self.working
            .ingredients
            .remove(&ingredient.id)
            .map(|_| ())
            .ok_or_else(|| not_found("Ingredient", ingredient.id))
    }

    async fn insert_workstep(&mut self, workstep: &Workstep) -> Result<Workstep, ServiceError> {
        self.working.require_receipt(workstep.receipt_id)?;
        if self.working.worksteps.contains_key(&workstep.id) {
            return Err(constraint("unique violation: worksteps_pkey"));
        }

        self.working.worksteps.insert(workstep.id, workstep.clone());
        Ok(workstep.clone())
    }

    async fn update_workstep(&mut self, workstep: &Workstep) -> Result<Workstep, ServiceError> {
        let stored = self
            .working
            .worksteps
            .get_mut(&workstep.id)
            .ok_or_else(|| not_found("Workstep", workstep.id))?;
        stored.workstep = workstep.workstep.clone();

        Ok(stored.clone())
    }

    async fn renumber_workstep(
        &mut self,
        id: Uuid,
        order_number: i32,
    ) -> Result<Workstep, ServiceError> {
        let stored = self
            .working
            .worksteps
            .get_mut(&id)
            .ok_or_else(|| not_found("Workstep", id))?;
        stored.order_number = order_number;

        Ok(stored.clone())
    }

    async fn read_workstep(&mut self, id: Uuid) -> Result<Workstep, ServiceError> {
        self.working
            .worksteps
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("Workstep", id))
    }

    async fn read_worksteps_by_receipt(
        &mut self,
        receipt_id: Uuid,
    ) -> Result<Vec<Workstep>, ServiceError> {
        Ok(self
            .working
            .worksteps
            .values()
            .filter(|workstep| workstep.receipt_id == receipt_id)
            .cloned()
            .collect())
    }

    async fn delete_workstep(&mut self, workstep: &Workstep) -> Result<(), ServiceError> {
        self.working
            .worksteps
            .remove(&workstep.id)
            .map(|_| ())
            .ok_or_else(|| not_found("Workstep", workstep.id))
    }

    async fn lock_tag(&mut self, id: Uuid) -> Result<Tag, ServiceError> {
        self.read_tag(id).await
    }

    async fn insert_tag(&mut self, tag: &Tag) -> Result<Option<Tag>, ServiceError> {
        if self.working.tags.values().any(|other| other.tag == tag.tag) {
            return Ok(None);
        }
        if self.working.tags.contains_key(&tag.id) {
            return Err(constraint("unique violation: tags_pkey"));
        }

        self.working.tags.insert(tag.id, tag.clone());
        Ok(Some(tag.clone()))
    }

    async fn read_tag(&mut self, id: Uuid) -> Result<Tag, ServiceError> {
        self.working
            .tags
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("Tag", id))
    }

    async fn find_tag(&mut self, name: &str) -> Result<Option<Tag>, ServiceError> {
        Ok(self
            .working
            .tags
            .values()
            .find(|tag| tag.tag == name)
            .cloned())
    }

    async fn read_tags(&mut self) -> Result<Vec<Tag>, ServiceError> {
        let mut tags: Vec<Tag> = self.working.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.tag.cmp(&b.tag));
        Ok(tags)
    }

    async fn delete_tag(&mut self, tag: &Tag) -> Result<(), ServiceError> {
        if self.working.links.iter().any(|link| link.tag_id == tag.id) {
            return Err(constraint("foreign key violation: tag is still referenced"));
        }

        self.working
            .tags
            .remove(&tag.id)
            .map(|_| ())
            .ok_or_else(|| not_found("Tag", tag.id))
    }

    async fn save_link(&mut self, link: &ReceiptTagLink) -> Result<ReceiptTagLink, ServiceError> {
        self.working.require_receipt(link.receipt_id)?;
        if !self.working.tags.contains_key(&link.tag_id) {
            return Err(constraint("foreign key violation: tag does not exist"));
        }

        if !self.working.links.contains(link) {
            self.working.links.push(*link);
        }
        Ok(*link)
    }

    async fn read_link(
        &mut self,
        receipt_id: Uuid,
        tag_id: Uuid,
    ) -> Result<ReceiptTagLink, ServiceError> {
        self.working
            .links
            .iter()
            .find(|link| link.receipt_id == receipt_id && link.tag_id == tag_id)
            .copied()
            .ok_or_else(|| ServiceError::NotFound("No Link found".to_owned()))
    }

    async fn read_links_by_receipt(
        &mut self,
        receipt_id: Uuid,
    ) -> Result<Vec<ReceiptTagLink>, ServiceError> {
        Ok(self
            .working
            .links
            .iter()
            .filter(|link| link.receipt_id == receipt_id)
            .copied()
            .collect())
    }

    async fn read_links_by_tag(
        &mut self,
        tag_id: Uuid,
    ) -> Result<Vec<ReceiptTagLink>, ServiceError> {
        Ok(self
            .working
            .links
            .iter()
            .filter(|link| link.tag_id == tag_id)
            .copied()
            .collect())
    }

    async fn delete_link(&mut self, link: &ReceiptTagLink) -> Result<(), ServiceError> {
        let before = self.working.links.len();
        self.working.links.retain(|other| other != link);
        if self.working.links.len() == before {
            return Err(ServiceError::NotFound("No Link found".to_owned()));
        }
        Ok(())
    }

    async fn commit(mut self) -> Result<(), ServiceError> {
        self.working.check_workstep_order()?;
        *self.guard = self.working;
        Ok(())
    }
}
