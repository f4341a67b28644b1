use crate::{
    error::ServiceError,
    schema::{Receipt, Uuid},
};

/// Only the creator of a receipt may see or change it, or anything under it.
pub fn authorize(caller_id: Uuid, receipt: &Receipt) -> Result<(), ServiceError> {
    if receipt.owner_id != caller_id {
        log::warn!(
            "User {} denied access to receipt {} owned by {}",
            caller_id,
            receipt.id,
            receipt.owner_id
        );
        return Err(ServiceError::not_owner());
    }
    Ok(())
}
