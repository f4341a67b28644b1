use crate::{
    error::ServiceError,
    jwt::SessionData,
    schema::{ReceiptAggregate, Uuid},
    store::{EntityStore, StoreTransaction},
};

use super::receipts::get_receipt_mut;

/// Collects a receipt with its ingredients and ordered worksteps from one snapshot.
pub async fn assemble_receipt<S: EntityStore>(
    id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<ReceiptAggregate, ServiceError> {
    let mut tr = store.begin().await?;
    let receipt = get_receipt_mut(&mut tr, id, session).await?;
    let ingredients = tr.read_ingredients_by_receipt(receipt.id).await?;
    let mut worksteps = tr.read_worksteps_by_receipt(receipt.id).await?;
    tr.commit().await?;

    worksteps.sort_by_key(|workstep| workstep.order_number);

    Ok(ReceiptAggregate {
        receipt,
        ingredients,
        worksteps,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        actions::{create_ingredient, create_workstep, delete_workstep, testing},
        memory::MemoryStore,
        schema::{IngredientCreate, WorkstepCreate},
    };

    use super::*;

    #[tokio::test]
    async fn aggregate_contains_everything_in_order() {
        let store = MemoryStore::new();
        let user = testing::user();
        let receipt = testing::receipt("Pasta", &user, &store).await;

        create_ingredient(
            receipt.id,
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

        let mut steps = vec![];
        for text in ["Boil water", "Add pasta", "Drain", "Serve"] {
            let body = WorkstepCreate {
                workstep: text.to_owned(),
                receipt_id: None,
            };
            steps.push(create_workstep(receipt.id, body, &user, &store).await.unwrap());
        }
        delete_workstep(steps[1].id, &user, &store).await.unwrap();

        let aggregate = assemble_receipt(receipt.id, &user, &store).await.unwrap();
        assert_eq!(aggregate.receipt, receipt);
        assert_eq!(aggregate.ingredients.len(), 1);
        assert_eq!(
            aggregate
                .worksteps
                .iter()
                .map(|w| (w.order_number, w.workstep.as_str()))
                .collect::<Vec<_>>(),
            vec![(1, "Boil water"), (2, "Drain"), (3, "Serve")]
        );

        let json = serde_json::to_value(&aggregate).unwrap();
        assert_eq!(json["title"], "Pasta");
        assert_eq!(json["worksteps"][0]["orderNumber"], 1);
    }

    #[tokio::test]
    async fn export_is_owner_scoped() {
        let store = MemoryStore::new();
        let alice = testing::user();
        let receipt = testing::receipt("Pasta", &alice, &store).await;

        assert_eq!(
            assemble_receipt(receipt.id, &testing::user(), &store).await,
            Err(ServiceError::not_owner())
        );
    }
}
