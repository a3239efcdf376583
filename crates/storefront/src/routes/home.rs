//! Home page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use shopfront_core::catalog;

use super::products::ProductView;
use crate::error::Result;
use crate::filters;
use crate::middleware::Page;
use crate::state::AppState;

const HOME_SHELF_SIZE: usize = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub featured: Vec<ProductView>,
    pub new_arrivals: Vec<ProductView>,
    pub categories: Vec<String>,
}

/// Display the home page.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>, page: Page) -> Result<HomeTemplate> {
    let products = state.catalog().products(state.db()).await?;

    Ok(HomeTemplate {
        page,
        featured: catalog::featured(&products, HOME_SHELF_SIZE)
            .into_iter()
            .map(ProductView::from)
            .collect(),
        new_arrivals: catalog::new_arrivals(&products, HOME_SHELF_SIZE)
            .into_iter()
            .map(ProductView::from)
            .collect(),
        categories: catalog::categories(&products),
    })
}
