use crate::{
    error::ServiceError,
    jwt::SessionData,
    schema::{ReceiptTagLink, Tag, Uuid},
    store::{EntityStore, StoreTransaction},
};

use super::receipts::{get_receipt_mut, lock_receipt_mut};

/// Deletes a link and the tag with it when this was the tag's last link.
/// The caller must already hold the lock on the link's receipt.
pub(crate) async fn remove_link<T: StoreTransaction>(
    tr: &mut T,
    link: &ReceiptTagLink,
) -> Result<(), ServiceError> {
    let tag = tr.lock_tag(link.tag_id).await?;
    tr.delete_link(link).await?;

    if tr.read_links_by_tag(tag.id).await?.is_empty() {
        tr.delete_tag(&tag).await?;
        log::info!("Tag {} has no receipts left, deleted", tag.tag);
    }
    Ok(())
}

pub async fn link_tag<S: EntityStore>(
    receipt_id: Uuid,
    tag_id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<ReceiptTagLink, ServiceError> {
    let mut tr = store.begin().await?;
    let receipt = lock_receipt_mut(&mut tr, receipt_id, session).await?;
    let tag = tr.lock_tag(tag_id).await?;

    let link = tr
        .save_link(&ReceiptTagLink {
            receipt_id: receipt.id,
            tag_id: tag.id,
        })
        .await?;
    tr.commit().await?;

    log::debug!("Linked tag {} to receipt {}", tag.tag, receipt.id);
    Ok(link)
}

pub async fn unlink_tag<S: EntityStore>(
    receipt_id: Uuid,
    tag_id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<(), ServiceError> {
    let mut tr = store.begin().await?;
    let receipt = lock_receipt_mut(&mut tr, receipt_id, session).await?;
    let link = tr.read_link(receipt.id, tag_id).await?;

    remove_link(&mut tr, &link).await?;
    tr.commit().await?;

    Ok(())
}

/// Tags of a receipt, in link order.
pub async fn list_receipt_tags<S: EntityStore>(
    receipt_id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<Vec<Tag>, ServiceError> {
    let mut tr = store.begin().await?;
    let receipt = get_receipt_mut(&mut tr, receipt_id, session).await?;

    let links = tr.read_links_by_receipt(receipt.id).await?;
    let mut tags = Vec::with_capacity(links.len());
    for link in links {
        tags.push(tr.read_tag(link.tag_id).await?);
    }
    tr.commit().await?;

    Ok(tags)
}
