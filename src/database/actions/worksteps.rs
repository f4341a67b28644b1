use crate::{
    error::ServiceError,
    jwt::SessionData,
    schema::{Uuid, Workstep, WorkstepCreate, WorkstepUpdate},
    store::{EntityStore, StoreTransaction},
};

use super::receipts::{get_receipt_mut, lock_receipt_mut};

fn sort_by_order(worksteps: &mut [Workstep]) {
    worksteps.sort_by_key(|workstep| workstep.order_number);
}

/// Locks the parent receipt, then reads the workstep again under that lock.
/// The returned order number is current for the rest of the transaction.
async fn lock_workstep_mut<T: StoreTransaction>(
    tr: &mut T,
    id: Uuid,
    session: &SessionData,
) -> Result<Workstep, ServiceError> {
    let workstep = tr.read_workstep(id).await?;
    lock_receipt_mut(tr, workstep.receipt_id, session).await?;
    tr.read_workstep(id).await
}

/// Appends a workstep to the end of the receipt's sequence.
pub async fn create_workstep<S: EntityStore>(
    receipt_id: Uuid,
    body: WorkstepCreate,
    session: &SessionData,
    store: &S,
) -> Result<Workstep, ServiceError> {
    body.validate()?;

    let mut tr = store.begin().await?;
    let receipt = lock_receipt_mut(&mut tr, receipt_id, session).await?;
    let count = tr.read_worksteps_by_receipt(receipt.id).await?.len();

    let order_number = i32::try_from(count + 1)
        .map_err(|_| ServiceError::Validation("Too many worksteps".to_owned()))?;

    let workstep = tr
        .insert_workstep(&Workstep {
            id: Uuid::new_v4(),
            order_number,
            workstep: body.workstep,
            receipt_id: receipt.id,
        })
        .await?;
    tr.commit().await?;

    log::debug!(
        "Appended workstep {} to receipt {} as #{}",
        workstep.id,
        receipt.id,
        workstep.order_number
    );
    Ok(workstep)
}

pub async fn get_workstep<S: EntityStore>(
    id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<Workstep, ServiceError> {
    let mut tr = store.begin().await?;
    let workstep = tr.read_workstep(id).await?;
    get_receipt_mut(&mut tr, workstep.receipt_id, session).await?;
    tr.commit().await?;

    Ok(workstep)
}

/// Worksteps of a receipt, ascending by order number.
pub async fn list_worksteps<S: EntityStore>(
    receipt_id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<Vec<Workstep>, ServiceError> {
    let mut tr = store.begin().await?;
    let receipt = get_receipt_mut(&mut tr, receipt_id, session).await?;
    let mut worksteps = tr.read_worksteps_by_receipt(receipt.id).await?;
    tr.commit().await?;

    sort_by_order(&mut worksteps);
    Ok(worksteps)
}

pub async fn update_workstep<S: EntityStore>(
    id: Uuid,
    body: WorkstepUpdate,
    session: &SessionData,
    store: &S,
) -> Result<Workstep, ServiceError> {
    body.validate()?;

    let mut tr = store.begin().await?;
    let mut workstep = lock_workstep_mut(&mut tr, id, session).await?;

    body.apply(&mut workstep);
    let workstep = tr.update_workstep(&workstep).await?;
    tr.commit().await?;

    Ok(workstep)
}

/// Deletes a workstep and closes the gap it leaves in the sequence.
pub async fn delete_workstep<S: EntityStore>(
    id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<(), ServiceError> {
    let mut tr = store.begin().await?;
    let workstep = lock_workstep_mut(&mut tr, id, session).await?;
    tr.delete_workstep(&workstep).await?;

    let mut remaining = tr.read_worksteps_by_receipt(workstep.receipt_id).await?;
    sort_by_order(&mut remaining);

    let mut renumbered = 0;
    for (position, step) in (1..).zip(remaining) {
        if step.order_number != position {
            tr.renumber_workstep(step.id, position).await?;
            renumbered += 1;
        }
    }
    tr.commit().await?;

    log::debug!(
        "Deleted workstep {} from receipt {}, renumbered {}",
        workstep.id,
        workstep.receipt_id,
        renumbered
    );
    Ok(())
}
