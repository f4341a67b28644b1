use crate::{
    error::ServiceError,
    jwt::SessionData,
    schema::{Ingredient, IngredientCreate, IngredientUpdate, Uuid},
    store::{EntityStore, StoreTransaction},
};

use super::receipts::{get_receipt_mut, lock_receipt_mut};

/// Locks the parent receipt, then reads the ingredient again under that lock.
async fn lock_ingredient_mut<T: StoreTransaction>(
    tr: &mut T,
    id: Uuid,
    session: &SessionData,
) -> Result<Ingredient, ServiceError> {
    let ingredient = tr.read_ingredient(id).await?;
    lock_receipt_mut(tr, ingredient.receipt_id, session).await?;
    tr.read_ingredient(id).await
}

pub async fn create_ingredient<S: EntityStore>(
    receipt_id: Uuid,
    body: IngredientCreate,
    session: &SessionData,
    store: &S,
) -> Result<Ingredient, ServiceError> {
    body.validate()?;

    let mut tr = store.begin().await?;
    let receipt = lock_receipt_mut(&mut tr, receipt_id, session).await?;
    let ingredient = tr
        .insert_ingredient(&Ingredient {
            id: Uuid::new_v4(),
            amount: body.amount,
            unit: body.unit,
            ingredient: body.ingredient,
            receipt_id: receipt.id,
        })
        .await?;
    tr.commit().await?;

    Ok(ingredient)
}

pub async fn get_ingredient<S: EntityStore>(
    id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<Ingredient, ServiceError> {
    let mut tr = store.begin().await?;
    let ingredient = tr.read_ingredient(id).await?;
    get_receipt_mut(&mut tr, ingredient.receipt_id, session).await?;
    tr.commit().await?;

    Ok(ingredient)
}

pub async fn list_ingredients<S: EntityStore>(
    receipt_id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<Vec<Ingredient>, ServiceError> {
    let mut tr = store.begin().await?;
    let receipt = get_receipt_mut(&mut tr, receipt_id, session).await?;
    let ingredients = tr.read_ingredients_by_receipt(receipt.id).await?;
    tr.commit().await?;

    Ok(ingredients)
}

pub async fn update_ingredient<S: EntityStore>(
    id: Uuid,
    body: IngredientUpdate,
    session: &SessionData,
    store: &S,
) -> Result<Ingredient, ServiceError> {
    body.validate()?;

    let mut tr = store.begin().await?;
    let mut ingredient = lock_ingredient_mut(&mut tr, id, session).await?;

    body.apply(&mut ingredient);
    let ingredient = tr.update_ingredient(&ingredient).await?;
    tr.commit().await?;

    Ok(ingredient)
}

pub async fn delete_ingredient<S: EntityStore>(
    id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<(), ServiceError> {
    let mut tr = store.begin().await?;
    let ingredient = lock_ingredient_mut(&mut tr, id, session).await?;
    tr.delete_ingredient(&ingredient).await?;
    tr.commit().await?;

    Ok(())
}
