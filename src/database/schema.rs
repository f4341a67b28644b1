use serde::{Deserialize, Deserializer, Serialize};

pub use uuid::Uuid;

use crate::{
    constants::{
        DESCRIPTION_MAX_LENGTH, INGREDIENT_MAX_LENGTH, TITLE_MAX_LENGTH, UNIT_MAX_LENGTH,
        WORKSTEP_MAX_LENGTH,
    },
    error::ServiceError,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: Uuid,
    pub amount: i32,
    pub unit: String,
    #[serde(rename = "ingredientName")]
    pub ingredient: String,
    pub receipt_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workstep {
    pub id: Uuid,
    pub order_number: i32,
    pub workstep: String,
    pub receipt_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub tag: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptTagLink {
    pub receipt_id: Uuid,
    pub tag_id: Uuid,
}

/// A receipt together with everything needed to render it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReceiptAggregate {
    #[serde(flatten)]
    pub receipt: Receipt,
    pub ingredients: Vec<Ingredient>,
    /// Always ascending by order number
    pub worksteps: Vec<Workstep>,
}

// Request bodies

#[derive(Clone, Debug, Deserialize)]
pub struct ReceiptCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of a receipt. `owner_id` is not patchable.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReceiptUpdate {
    #[serde(default)]
    pub title: Option<String>,
    /// `Some(None)` clears the description, `None` keeps it
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientCreate {
    pub amount: i32,
    pub unit: String,
    #[serde(rename = "ingredientName", alias = "ingredient")]
    pub ingredient: String,
    /// Only read by routes that don't carry the receipt in their path
    #[serde(default, alias = "receipt_id")]
    pub receipt_id: Option<Uuid>,
}

/// Partial update of an ingredient. `receipt_id` is not patchable.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IngredientUpdate {
    #[serde(default)]
    pub amount: Option<i32>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, rename = "ingredientName", alias = "ingredient")]
    pub ingredient: Option<String>,
}

/// Order numbers sent by clients are ignored, new worksteps are always appended.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkstepCreate {
    pub workstep: String,
    #[serde(default, alias = "receipt_id")]
    pub receipt_id: Option<Uuid>,
}

/// Partial update of a workstep, content only.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WorkstepUpdate {
    #[serde(default)]
    pub workstep: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TagCreate {
    pub tag: String,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_length(
    field: &str,
    value: &str,
    max: usize,
    required: bool,
) -> Result<(), ServiceError> {
    let length = value.chars().count();
    if required && value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{field} must not be empty")));
    }
    if length > max {
        return Err(ServiceError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

impl ReceiptCreate {
    pub fn validate(&self) -> Result<(), ServiceError> {
        check_length("title", &self.title, TITLE_MAX_LENGTH, true)?;
        if let Some(description) = &self.description {
            check_length("description", description, DESCRIPTION_MAX_LENGTH, false)?;
        }
        Ok(())
    }
}

impl ReceiptUpdate {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(title) = &self.title {
            check_length("title", title, TITLE_MAX_LENGTH, true)?;
        }
        if let Some(Some(description)) = &self.description {
            check_length("description", description, DESCRIPTION_MAX_LENGTH, false)?;
        }
        Ok(())
    }

    pub fn apply(self, receipt: &mut Receipt) {
        let ReceiptUpdate { title, description } = self;
        if let Some(title) = title {
            receipt.title = title;
        }
        if let Some(description) = description {
            receipt.description = description;
        }
    }
}

impl IngredientCreate {
    pub fn validate(&self) -> Result<(), ServiceError> {
        check_length("unit", &self.unit, UNIT_MAX_LENGTH, true)?;
        check_length("ingredientName", &self.ingredient, INGREDIENT_MAX_LENGTH, true)
    }
}

impl IngredientUpdate {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(unit) = &self.unit {
            check_length("unit", unit, UNIT_MAX_LENGTH, true)?;
        }
        if let Some(ingredient) = &self.ingredient {
            check_length("ingredientName", ingredient, INGREDIENT_MAX_LENGTH, true)?;
        }
        Ok(())
    }

    pub fn apply(self, ingredient: &mut Ingredient) {
        let IngredientUpdate {
            amount,
            unit,
            ingredient: name,
        } = self;
        if let Some(amount) = amount {
            ingredient.amount = amount;
        }
        if let Some(unit) = unit {
            ingredient.unit = unit;
        }
        if let Some(name) = name {
            ingredient.ingredient = name;
        }
    }
}

impl WorkstepCreate {
    pub fn validate(&self) -> Result<(), ServiceError> {
        check_length("workstep", &self.workstep, WORKSTEP_MAX_LENGTH, true)
    }
}

impl WorkstepUpdate {
    pub fn validate(&self) -> Result<(), ServiceError> {
        match &self.workstep {
            Some(workstep) => check_length("workstep", workstep, WORKSTEP_MAX_LENGTH, true),
            None => Ok(()),
        }
    }

    pub fn apply(self, workstep: &mut Workstep) {
        let WorkstepUpdate { workstep: text } = self;
        if let Some(text) = text {
            workstep.workstep = text;
        }
    }
}
