//! Seed the catalog from a file.
//!
//! The file is a list of products in JSON or YAML, picked by extension:
//!
//! ```yaml
//! - id: blue-mug          # optional; omitted ids get a fresh key
//!   name: Blue Mug
//!   category: mugs
//!   price: 1200
//!   discount: 10
//!   stock: 25
//!   featured: true
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use shopfront_core::ProductId;
use shopfront_core::db::{Database, ProductRepository, paths};
use shopfront_core::models::{Product, ProductDraft};

use super::CliError;

/// One product entry in a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub draft: ProductDraft,
}

/// Counts reported after seeding.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub created: usize,
    pub written: usize,
}

/// Parse and validate a seed file's contents. Every entry is checked before
/// anything is written.
///
/// # Errors
///
/// Returns `CliError::Parse` for syntax errors and for the first entry that
/// fails validation.
pub fn parse_products(file_name: &str, content: &str) -> Result<Vec<Product>, CliError> {
    let parse_err = |e: String| CliError::Parse(file_name.to_owned(), e);

    let is_yaml = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let entries: Vec<SeedProduct> = if is_yaml {
        serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))?
    } else {
        serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let id = match entry.id.as_deref().map(str::trim) {
                Some(raw) if !raw.is_empty() => ProductId::parse(raw)
                    .map_err(|e| parse_err(format!("entry {}: {e}", index + 1)))?,
                _ => ProductId::default(),
            };
            entry
                .draft
                .into_product(id)
                .map_err(|e| parse_err(format!("entry {}: {e}", index + 1)))
        })
        .collect()
}

/// Write parsed products. Products with an id replace whatever is stored
/// under it; the rest are inserted under fresh keys.
///
/// # Errors
///
/// Returns `CliError::Database` if a write fails.
pub async fn write_products(
    db: &dyn Database,
    products: Vec<Product>,
    replace: bool,
) -> Result<SeedSummary, CliError> {
    if replace {
        db.delete(paths::PRODUCTS).await?;
        info!("Deleted existing products");
    }

    let repo = ProductRepository::new(db);
    let mut summary = SeedSummary::default();
    for product in products {
        if product.id.is_empty() {
            let created = repo.create(product).await?;
            info!(id = %created.id, name = %created.name, "Created product");
            summary.created += 1;
        } else {
            repo.save(&product).await?;
            info!(id = %product.id, name = %product.name, "Wrote product");
            summary.written += 1;
        }
    }
    Ok(summary)
}

/// Seed products from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a write fails.
pub async fn products(db: &dyn Database, file_path: &str, replace: bool) -> Result<(), CliError> {
    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|e| CliError::Io(file_path.to_owned(), e))?;

    let products = parse_products(file_path, &content)?;
    info!(count = products.len(), "Parsed products");

    let summary = write_products(db, products, replace).await?;
    info!(
        created = summary.created,
        written = summary.written,
        "Seeding complete"
    );
    Ok(())
}
