use crate::{
    authentication::permissions::authorize,
    error::ServiceError,
    jwt::SessionData,
    schema::{Receipt, ReceiptCreate, ReceiptUpdate, Uuid},
    store::{EntityStore, StoreTransaction},
};

use super::links::remove_link;

/// Reads a receipt the caller is allowed to work on.
pub(crate) async fn get_receipt_mut<T: StoreTransaction>(
    tr: &mut T,
    id: Uuid,
    session: &SessionData,
) -> Result<Receipt, ServiceError> {
    let receipt = tr.read_receipt(id).await?;
    authorize(session.user_id, &receipt)?;
    Ok(receipt)
}

/// Same as [`get_receipt_mut`] but keeps the receipt locked until commit.
pub(crate) async fn lock_receipt_mut<T: StoreTransaction>(
    tr: &mut T,
    id: Uuid,
    session: &SessionData,
) -> Result<Receipt, ServiceError> {
    let receipt = tr.lock_receipt(id).await?;
    authorize(session.user_id, &receipt)?;
    Ok(receipt)
}

pub async fn create_receipt<S: EntityStore>(
    body: ReceiptCreate,
    session: &SessionData,
    store: &S,
) -> Result<Receipt, ServiceError> {
    body.validate()?;

    let mut tr = store.begin().await?;
    let receipt = tr
        .insert_receipt(&Receipt {
            id: Uuid::new_v4(),
            title: body.title,
            description: body.description,
            owner_id: session.user_id,
        })
        .await?;
    tr.commit().await?;

    log::info!("User {} created receipt {}", session.user_id, receipt.id);
    Ok(receipt)
}

/// Lists the caller's own receipts.
pub async fn list_receipts<S: EntityStore>(
    session: &SessionData,
    store: &S,
) -> Result<Vec<Receipt>, ServiceError> {
    let mut tr = store.begin().await?;
    let receipts = tr.read_receipts_by_owner(session.user_id).await?;
    tr.commit().await?;

    Ok(receipts)
}

pub async fn get_receipt<S: EntityStore>(
    id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<Receipt, ServiceError> {
    let mut tr = store.begin().await?;
    let receipt = get_receipt_mut(&mut tr, id, session).await?;
    tr.commit().await?;

    Ok(receipt)
}

pub async fn update_receipt<S: EntityStore>(
    id: Uuid,
    body: ReceiptUpdate,
    session: &SessionData,
    store: &S,
) -> Result<Receipt, ServiceError> {
    body.validate()?;

    let mut tr = store.begin().await?;
    let mut receipt = lock_receipt_mut(&mut tr, id, session).await?;
    body.apply(&mut receipt);
    let receipt = tr.update_receipt(&receipt).await?;
    tr.commit().await?;

    Ok(receipt)
}

/// Deletes a receipt together with its ingredients, worksteps and tag links.
/// Tags left without any link are deleted as well.
pub async fn delete_receipt<S: EntityStore>(
    id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<(), ServiceError> {
    let mut tr = store.begin().await?;
    let receipt = lock_receipt_mut(&mut tr, id, session).await?;

    let ingredients = tr.read_ingredients_by_receipt(receipt.id).await?;
    for ingredient in &ingredients {
        tr.delete_ingredient(ingredient).await?;
    }

    let worksteps = tr.read_worksteps_by_receipt(receipt.id).await?;
    for workstep in &worksteps {
        tr.delete_workstep(workstep).await?;
    }

    let links = tr.read_links_by_receipt(receipt.id).await?;
    for link in &links {
        remove_link(&mut tr, link).await?;
    }

    tr.delete_receipt(&receipt).await?;
    tr.commit().await?;

    log::info!(
        "Deleted receipt {} ({} ingredients, {} worksteps, {} tag links)",
        receipt.id,
        ingredients.len(),
        worksteps.len(),
        links.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        actions::{create_ingredient, create_tag, create_workstep, get_tag, link_tag, testing},
        memory::MemoryStore,
        schema::{IngredientCreate, TagCreate, WorkstepCreate},
    };

    use super::*;

    #[tokio::test]
    async fn owner_is_the_creator() {
        let store = MemoryStore::new();
        let user = testing::user();

        let receipt = create_receipt(
            ReceiptCreate {
                title: "Pasta".to_owned(),
                description: Some("Weeknight".to_owned()),
            },
            &user,
            &store,
        )
        .await
        .unwrap();

        assert_eq!(receipt.owner_id, user.user_id);
        assert_eq!(get_receipt(receipt.id, &user, &store).await.unwrap(), receipt);
    }

    #[tokio::test]
    async fn invalid_receipt_is_rejected_before_storage() {
        let store = MemoryStore::new();
        let user = testing::user();

        let result = create_receipt(
            ReceiptCreate {
                title: String::new(),
                description: None,
            },
            &user,
            &store,
        )
        .await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert!(list_receipts(&user, &store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_only_returns_own_receipts() {
        let store = MemoryStore::new();
        let alice = testing::user();
        let bob = testing::user();

        let pasta = testing::receipt("Pasta", &alice, &store).await;
        testing::receipt("Pancakes", &bob, &store).await;

        assert_eq!(list_receipts(&alice, &store).await.unwrap(), vec![pasta]);
    }

    #[tokio::test]
    async fn other_users_are_forbidden() {
        let store = MemoryStore::new();
        let alice = testing::user();
        let bob = testing::user();
        let receipt = testing::receipt("Pasta", &alice, &store).await;

        assert_eq!(
            get_receipt(receipt.id, &bob, &store).await,
            Err(ServiceError::not_owner())
        );

        let patch = ReceiptUpdate {
            title: Some("Stolen".to_owned()),
            description: None,
        };
        assert_eq!(
            update_receipt(receipt.id, patch, &bob, &store).await,
            Err(ServiceError::not_owner())
        );
        assert_eq!(
            delete_receipt(receipt.id, &bob, &store).await,
            Err(ServiceError::not_owner())
        );

        assert_eq!(get_receipt(receipt.id, &alice, &store).await.unwrap(), receipt);
    }

    #[tokio::test]
    async fn missing_receipt_is_not_found() {
        let store = MemoryStore::new();
        let user = testing::user();

        assert!(matches!(
            get_receipt(Uuid::new_v4(), &user, &store).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_is_partial() {
        let store = MemoryStore::new();
        let user = testing::user();
        let receipt = create_receipt(
            ReceiptCreate {
                title: "Pasta".to_owned(),
                description: Some("Weeknight".to_owned()),
            },
            &user,
            &store,
        )
        .await
        .unwrap();

        let updated = update_receipt(
            receipt.id,
            ReceiptUpdate {
                title: Some("Penne".to_owned()),
                description: None,
            },
            &user,
            &store,
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "Penne");
        assert_eq!(updated.description.as_deref(), Some("Weeknight"));
        assert_eq!(updated.owner_id, user.user_id);
    }

    #[tokio::test]
    async fn delete_cascades_to_children_and_orphan_tags() {
        let store = MemoryStore::new();
        let user = testing::user();
        let pasta = testing::receipt("Pasta", &user, &store).await;
        let salad = testing::receipt("Salad", &user, &store).await;

        create_ingredient(
            pasta.id,
            IngredientCreate {
                amount: 200,
                unit: "g".to_owned(),
                ingredient: "Spaghetti".to_owned(),
                receipt_id: None,
            },
            &user,
            &store,
        )
        .await
        .unwrap();
        create_workstep(
            pasta.id,
            WorkstepCreate {
                workstep: "Boil water".to_owned(),
                receipt_id: None,
            },
            &user,
            &store,
        )
        .await
        .unwrap();

        let (italian, _) = create_tag(TagCreate { tag: "italian".to_owned() }, &store)
            .await
            .unwrap();
        let (quick, _) = create_tag(TagCreate { tag: "quick".to_owned() }, &store)
            .await
            .unwrap();
        link_tag(pasta.id, italian.id, &user, &store).await.unwrap();
        link_tag(pasta.id, quick.id, &user, &store).await.unwrap();
        link_tag(salad.id, quick.id, &user, &store).await.unwrap();

        delete_receipt(pasta.id, &user, &store).await.unwrap();

        assert!(matches!(
            get_receipt(pasta.id, &user, &store).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            get_tag(italian.id, &store).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(get_tag(quick.id, &store).await.unwrap(), quick);

        let mut tr = store.begin().await.unwrap();
        assert!(tr.read_ingredients_by_receipt(pasta.id).await.unwrap().is_empty());
        assert!(tr.read_worksteps_by_receipt(pasta.id).await.unwrap().is_empty());
    }
}
