//! Product management route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::ProductId;
use shopfront_core::db::{ProductRepository, RepositoryError};
use shopfront_core::models::{Product, ProductDraft};

use super::{AdminUserView, render};
use crate::{
    error::{AppError, Result},
    filters,
    middleware::{RequireAdminAuth, flash, take_flash},
    models::{CurrentAdmin, Flash},
    state::AppState,
};

const CURRENT_PATH: &str = "/products";

/// Product row for the listing.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: String,
    pub effective_price: String,
    pub discount: u8,
    pub stock: u32,
    pub stock_class: &'static str,
    pub featured: bool,
    pub is_new: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        let stock_class = if !product.in_stock() {
            "stock stock-out"
        } else if product.is_low_stock() {
            "stock stock-low"
        } else {
            "stock"
        };
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price.to_string(),
            effective_price: product.effective_price().to_string(),
            discount: product.discount.value(),
            stock: product.stock,
            stock_class,
            featured: product.featured,
            is_new: product.is_new,
        }
    }
}

/// Products list template.
#[derive(Template)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<Flash>,
    pub products: Vec<ProductView>,
}

/// Create and edit form template.
#[derive(Template)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<Flash>,
    /// `None` when creating.
    pub product_id: Option<String>,
    pub form: ProductForm,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn new(admin: &CurrentAdmin, product_id: Option<String>, form: ProductForm) -> Self {
        Self {
            admin_user: AdminUserView::from(admin),
            current_path: CURRENT_PATH.to_string(),
            flash: None,
            product_id,
            form,
            error: None,
        }
    }

    /// Where the form posts to.
    #[must_use]
    pub fn action(&self) -> String {
        self.product_id
            .as_ref()
            .map_or_else(|| "/products".to_string(), |id| format!("/products/{id}"))
    }
}

/// Form input for creating/updating products.
///
/// Numbers arrive as text so a bad value re-renders the form instead of
/// failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub category: String,
    pub description: String,
    pub price: String,
    pub discount: String,
    pub stock: String,
    pub image: String,
    pub featured: Option<String>,
    pub is_new: Option<String>,
}

fn parse_number<T: std::str::FromStr>(raw: &str, field: &str, blank: Option<T>) -> std::result::Result<T, String> {
    let raw = raw.trim();
    match (raw.is_empty(), blank) {
        (true, Some(default)) => Ok(default),
        (true, None) => Err(format!("{field} is required")),
        _ => raw
            .parse()
            .map_err(|_| format!("{field} must be a whole number")),
    }
}

impl ProductForm {
    /// Parse the numeric fields into a draft. Name, category and discount
    /// range are checked when the draft becomes a product.
    ///
    /// # Errors
    ///
    /// Returns a message naming the field that did not parse.
    pub fn to_draft(&self) -> std::result::Result<ProductDraft, String> {
        Ok(ProductDraft {
            name: self.name.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            price: parse_number(&self.price, "Price", None)?,
            discount: parse_number(&self.discount, "Discount", Some(0))?,
            stock: parse_number(&self.stock, "Stock", Some(0))?,
            image: Some(self.image.clone()),
            featured: self.featured.is_some(),
            is_new: self.is_new.is_some(),
        })
    }

    fn validated(&self, id: ProductId) -> std::result::Result<Product, String> {
        self.to_draft()?
            .into_product(id)
            .map_err(|e| capitalize(&e.to_string()))
    }

    #[must_use]
    pub const fn is_featured(&self) -> bool {
        self.featured.is_some()
    }

    #[must_use]
    pub const fn is_marked_new(&self) -> bool {
        self.is_new.is_some()
    }
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        let draft = ProductDraft::from(product);
        let checked = |on: bool| on.then(|| "on".to_string());
        Self {
            name: draft.name,
            category: draft.category,
            description: draft.description,
            price: draft.price.to_string(),
            discount: draft.discount.to_string(),
            stock: draft.stock.to_string(),
            image: draft.image.unwrap_or_default(),
            featured: checked(draft.featured),
            is_new: checked(draft.is_new),
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn parse_id(raw: &str) -> Result<ProductId> {
    ProductId::parse(raw).map_err(|_| AppError::NotFound("product".to_string()))
}

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/new", get(new_product))
        .route("/{id}", post(update))
        .route("/{id}/edit", get(edit))
        .route("/{id}/delete", post(delete))
}

/// Products list page handler.
#[instrument(skip_all)]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let mut products = ProductRepository::new(state.db()).list().await?;
    products.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    Ok(render(&ProductsIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: CURRENT_PATH.to_string(),
        flash: take_flash(&session).await,
        products: products.iter().map(ProductView::from).collect(),
    }))
}

/// New product form handler.
pub async fn new_product(RequireAdminAuth(admin): RequireAdminAuth) -> Html<String> {
    let form = ProductForm {
        stock: "0".to_string(),
        discount: "0".to_string(),
        ..ProductForm::default()
    };
    render(&ProductFormTemplate::new(&admin, None, form))
}

/// Create product handler.
#[instrument(skip_all, fields(name = %form.name))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let product = match form.validated(ProductId::default()) {
        Ok(product) => product,
        Err(error) => {
            let mut template = ProductFormTemplate::new(&admin, None, form);
            template.error = Some(error);
            return Ok(render(&template).into_response());
        }
    };

    let product = ProductRepository::new(state.db()).create(product).await?;
    tracing::info!(product_id = %product.id, "Product created");
    flash(&session, Flash::info(format!("Created {}", product.name))).await;
    Ok(Redirect::to(CURRENT_PATH).into_response())
}

/// Edit product form handler.
#[instrument(skip(admin, state))]
pub async fn edit(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let id = parse_id(&id)?;
    let product = ProductRepository::new(state.db())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_string()))?;

    Ok(render(&ProductFormTemplate::new(
        &admin,
        Some(id.to_string()),
        ProductForm::from(&product),
    )))
}

/// Update product handler.
#[instrument(skip(admin, state, session, form))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = parse_id(&id)?;
    let product = match form.validated(id.clone()) {
        Ok(product) => product,
        Err(error) => {
            let mut template = ProductFormTemplate::new(&admin, Some(id.to_string()), form);
            template.error = Some(error);
            return Ok(render(&template).into_response());
        }
    };

    match ProductRepository::new(state.db()).update(&product).await {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => {
            return Err(AppError::NotFound("product".to_string()));
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!(product_id = %id, stock = product.stock, "Product updated");
    flash(&session, Flash::info(format!("Saved {}", product.name))).await;
    Ok(Redirect::to(CURRENT_PATH).into_response())
}

/// Delete product handler. Carts and orders keep their own copies.
#[instrument(skip(_admin, state, session))]
pub async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = parse_id(&id)?;
    ProductRepository::new(state.db()).delete(&id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    flash(&session, Flash::info("Product deleted")).await;
    Ok(Redirect::to(CURRENT_PATH))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: "Blue Mug".to_string(),
            category: "mugs".to_string(),
            price: "1200".to_string(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_blank_stock_and_discount_default_to_zero() {
        let product = form().validated(ProductId::default()).unwrap();
        assert_eq!(product.stock, 0);
        assert!(product.discount.is_zero());
        assert_eq!(product.image, None);
    }

    #[test]
    fn test_bad_numbers_name_the_field() {
        let bad_price = ProductForm {
            price: "12.50".to_string(),
            ..form()
        };
        assert_eq!(
            bad_price.validated(ProductId::default()).unwrap_err(),
            "Price must be a whole number"
        );

        let missing_price = ProductForm {
            price: " ".to_string(),
            ..form()
        };
        assert_eq!(
            missing_price.validated(ProductId::default()).unwrap_err(),
            "Price is required"
        );
    }

    #[test]
    fn test_discount_over_hundred_rejected() {
        let f = ProductForm {
            discount: "150".to_string(),
            ..form()
        };
        assert!(f.validated(ProductId::default()).is_err());
    }

    #[test]
    fn test_edit_form_round_trips_flags() {
        let product = ProductForm {
            featured: Some("on".to_string()),
            stock: "7".to_string(),
            ..form()
        }
        .validated(ProductId::new("p1"))
        .unwrap();
        let back = ProductForm::from(&product);
        assert!(back.is_featured());
        assert!(!back.is_marked_new());
        assert_eq!(back.stock, "7");
    }
}
