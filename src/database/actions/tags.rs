use crate::{
    constants::TAG_MAX_LENGTH,
    error::{QueryError, ServiceError},
    jwt::SessionData,
    schema::{Tag, TagCreate, Uuid},
    store::{EntityStore, StoreTransaction},
};

use super::receipts::get_receipt_mut;

/// Checks a tag name and returns its stored, upper-cased form.
pub fn normalize_tag(name: &str) -> Result<String, ServiceError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ServiceError::Validation(
            "Tag must consist of letters only".to_owned(),
        ));
    }
    if name.len() > TAG_MAX_LENGTH {
        return Err(ServiceError::Validation(format!(
            "tag must be at most {TAG_MAX_LENGTH} characters"
        )));
    }
    Ok(name.to_ascii_uppercase())
}

/// Returns the tag with the given name, creating it if needed.
/// The flag tells whether the tag was created by this call.
pub async fn create_tag<S: EntityStore>(
    body: TagCreate,
    store: &S,
) -> Result<(Tag, bool), ServiceError> {
    let name = normalize_tag(&body.tag)?;

    let mut tr = store.begin().await?;
    if let Some(existing) = tr.find_tag(&name).await? {
        return Ok((existing, false));
    }

    let candidate = Tag {
        id: Uuid::new_v4(),
        tag: name,
    };
    match tr.insert_tag(&candidate).await? {
        Some(tag) => {
            tr.commit().await?;
            log::info!("Created tag {} ({})", tag.tag, tag.id);
            Ok((tag, true))
        }
        // Lost the race against a concurrent insert of the same name.
        None => {
            let existing = tr.find_tag(&candidate.tag).await?.ok_or_else(|| {
                QueryError::new(format!("Tag {} vanished after conflict", candidate.tag))
            })?;
            tr.commit().await?;
            Ok((existing, false))
        }
    }
}

pub async fn get_tag<S: EntityStore>(id: Uuid, store: &S) -> Result<Tag, ServiceError> {
    let mut tr = store.begin().await?;
    let tag = tr.read_tag(id).await?;
    tr.commit().await?;

    Ok(tag)
}

pub async fn list_tags<S: EntityStore>(store: &S) -> Result<Vec<Tag>, ServiceError> {
    let mut tr = store.begin().await?;
    let tags = tr.read_tags().await?;
    tr.commit().await?;

    Ok(tags)
}

/// Deletes a tag and unlinks it from every receipt.
///
/// Only allowed while every linked receipt belongs to the caller, so nobody
/// can strip tags off someone else's receipts.
pub async fn delete_tag<S: EntityStore>(
    id: Uuid,
    session: &SessionData,
    store: &S,
) -> Result<(), ServiceError> {
    let mut tr = store.begin().await?;
    let tag = tr.lock_tag(id).await?;

    let links = tr.read_links_by_tag(tag.id).await?;
    for link in &links {
        get_receipt_mut(&mut tr, link.receipt_id, session).await?;
    }
    for link in &links {
        tr.delete_link(link).await?;
    }
    tr.delete_tag(&tag).await?;
    tr.commit().await?;

    log::info!("Deleted tag {} and {} links", tag.tag, links.len());
    Ok(())
}
