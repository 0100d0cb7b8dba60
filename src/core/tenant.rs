//! Tenant scoping.
//!
//! Every ledger operation takes a [`Tenant`] naming the organization it acts for.
//! Lookups by id check ownership through the organization and report rows of other
//! tenants as not found, so one pharmacy can never touch another's books.

use crate::{
    entities::{Organization, organization},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::info;

/// The organization on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenant {
    /// Owning organization id
    pub organization_id: i64,
}

impl Tenant {
    /// Scopes operations to the given organization.
    #[must_use]
    pub const fn new(organization_id: i64) -> Self {
        Self { organization_id }
    }

    /// Returns `Ok` when `owner_id` is this tenant's organization, `NotFound` otherwise.
    pub fn ensure_owns(&self, entity: &'static str, id: i64, owner_id: i64) -> Result<()> {
        if self.organization_id == owner_id {
            Ok(())
        } else {
            Err(Error::not_found(entity, id))
        }
    }
}

impl From<&organization::Model> for Tenant {
    fn from(org: &organization::Model) -> Self {
        Self::new(org.id)
    }
}

/// Builds the URL slug of an organization from its name and contact number.
#[must_use]
pub fn slugify(name: &str, contact_number: Option<&str>) -> String {
    let source = match contact_number {
        Some(contact) => format!("{name} {contact}"),
        None => name.to_string(),
    };

    let mut slug = String::with_capacity(source.len());
    for ch in source.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Onboards a new organization.
pub async fn create_organization(
    db: &DatabaseConnection,
    name: String,
    address: String,
    contact_number: Option<String>,
) -> Result<organization::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("Organization name cannot be empty"));
    }

    let name = name.trim().to_string();
    let slug = slugify(&name, contact_number.as_deref());
    let existing = Organization::find()
        .filter(organization::Column::Slug.eq(slug.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::validation(format!(
            "Organization '{name}' with this contact number already exists"
        )));
    }

    let org = organization::ActiveModel {
        name: Set(name),
        address: Set(address),
        slug: Set(slug),
        contact_number: Set(contact_number),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(organization_id = org.id, slug = %org.slug, "Organization created");
    Ok(org)
}

/// All organizations, oldest first.
pub async fn list_organizations(db: &DatabaseConnection) -> Result<Vec<organization::Model>> {
    Organization::find()
        .order_by_asc(organization::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
