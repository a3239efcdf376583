//! Product listing and detail pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::catalog::{self, BrowseQuery, SortOrder};
use shopfront_core::models::Product;
use shopfront_core::{Money, Percent, ProductId};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::Page;
use crate::services::cart_store;
use crate::state::AppState;

/// Price brackets offered in the filter sidebar.
const PRICE_BRACKETS: &[(&str, &str)] = &[
    ("-500", "Under $500"),
    ("500-1000", "$500 to $1,000"),
    ("1000-5000", "$1,000 to $5,000"),
    ("5000-", "$5,000 and up"),
];

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    /// What the shopper pays.
    pub price: Money,
    /// List price, when a discount applies.
    pub original_price: Option<Money>,
    pub discount: Percent,
    pub image: Option<String>,
    pub stock: u32,
    pub in_stock: bool,
    pub low_stock: bool,
    pub is_new: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
            price: product.effective_price(),
            original_price: (!product.discount.is_zero()).then_some(product.price),
            discount: product.discount,
            image: product.image.clone(),
            stock: product.stock,
            in_stock: product.in_stock(),
            low_stock: product.is_low_stock(),
            is_new: product.is_new,
        }
    }
}

/// A `<select>` option.
#[derive(Clone)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Query parameters for the listing.
#[derive(Debug, Default, Deserialize)]
pub struct BrowseParams {
    pub category: Option<String>,
    pub price: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
}

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: Page,
    pub products: Vec<ProductView>,
    pub categories: Vec<OptionView>,
    pub prices: Vec<OptionView>,
    pub sorts: Vec<OptionView>,
    pub search: String,
    pub total: usize,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: Page,
    pub product: ProductView,
    pub in_cart: u32,
}

/// Display the product listing with filters.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    Query(params): Query<BrowseParams>,
) -> Result<ProductsIndexTemplate> {
    let products = state.catalog().products(state.db()).await?;
    let query = BrowseQuery::from_params(
        params.category.as_deref(),
        params.price.as_deref(),
        params.q.as_deref(),
        params.sort.as_deref(),
    );
    let hits: Vec<ProductView> = query.apply(&products).into_iter().map(ProductView::from).collect();

    let selected_category = query.category.as_deref().unwrap_or("");
    let categories = catalog::categories(&products)
        .into_iter()
        .map(|c| OptionView {
            selected: c.eq_ignore_ascii_case(selected_category),
            label: c.clone(),
            value: c,
        })
        .collect();
    let selected_price = params.price.as_deref().unwrap_or("");
    let prices = PRICE_BRACKETS
        .iter()
        .map(|(value, label)| OptionView {
            value: (*value).to_owned(),
            label: (*label).to_owned(),
            selected: *value == selected_price,
        })
        .collect();
    let sorts = SortOrder::ALL
        .into_iter()
        .map(|s| OptionView {
            value: s.as_str().to_owned(),
            label: s.label().to_owned(),
            selected: s == query.sort,
        })
        .collect();

    Ok(ProductsIndexTemplate {
        page,
        total: hits.len(),
        products: hits,
        categories,
        prices,
        sorts,
        search: query.search.unwrap_or_default(),
    })
}

/// Display a product.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    Path(id): Path<String>,
) -> Result<ProductShowTemplate> {
    let not_found = || AppError::NotFound(format!("product {id}"));
    let product_id = ProductId::parse(&id).map_err(|_| not_found())?;
    let product = state
        .catalog()
        .product(state.db(), &product_id)
        .await?
        .ok_or_else(not_found)?;

    let in_cart = cart_store::load(&session).await.quantity_of(&product_id);

    Ok(ProductShowTemplate {
        page,
        product: ProductView::from(&product),
        in_cart,
    })
}
