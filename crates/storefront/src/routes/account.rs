//! Account route handlers.
//!
//! These routes require authentication. Orders are only ever shown to the
//! user who placed them.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::AddressId;
use shopfront_core::db::{OrderRepository, UserRepository};
use shopfront_core::models::{
    AddressBook, AddressBookError, MAX_ADDRESSES, Order, PostalAddress, ProfileUpdate,
};

use super::checkout::owned_order;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Page, RequireAuth, flash};
use crate::models::{CurrentUser, Notice, session_keys};
use crate::state::AppState;

/// Orders shown on the account overview.
const RECENT_ORDERS: usize = 3;

/// Saved address display data for templates.
#[derive(Clone)]
pub struct AddressView {
    pub id: String,
    pub address: PostalAddress,
    pub is_default: bool,
}

fn address_views(book: &AddressBook) -> Vec<AddressView> {
    book.iter()
        .map(|(id, saved)| AddressView {
            id: id.to_string(),
            address: saved.address.clone(),
            is_default: saved.is_default,
        })
        .collect()
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: Page,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub recent_orders: Vec<Order>,
    pub default_address: Option<AddressView>,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub page: Page,
    pub orders: Vec<Order>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub page: Page,
    pub order: Order,
}

/// Address book page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/addresses.html")]
pub struct AddressesTemplate {
    pub page: Page,
    pub addresses: Vec<AddressView>,
    pub is_full: bool,
    pub max_addresses: usize,
}

/// Address edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/address_edit.html")]
pub struct AddressEditTemplate {
    pub page: Page,
    pub entry: AddressView,
}

/// Address form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddressForm {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub make_default: Option<String>,
}

impl AddressForm {
    fn into_address(self) -> std::result::Result<PostalAddress, AddressBookError> {
        PostalAddress {
            full_name: self.full_name,
            phone: self.phone,
            line1: self.line1,
            line2: self.line2,
            city: self.city,
            region: self.region,
            postal_code: self.postal_code,
            country: self.country,
        }
        .normalized()
    }
}

fn parse_address_id(raw: &str) -> Result<AddressId> {
    AddressId::parse(raw).map_err(|_| AppError::NotFound("address".to_owned()))
}

/// Display account overview page.
#[instrument(skip_all, fields(uid = %user.uid))]
pub async fn index(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.db());
    let profile = users.get(&user.uid).await?;
    let book = users.addresses(&user.uid).await?;
    let mut orders = OrderRepository::new(state.db())
        .list_for_user(&user.uid)
        .await?;
    orders.truncate(RECENT_ORDERS);

    let (name, phone) = profile.map_or_else(
        || (user.name.clone(), String::new()),
        |p| (p.name, p.phone),
    );

    Ok(AccountIndexTemplate {
        page,
        name,
        email: user.email.to_string(),
        phone,
        recent_orders: orders,
        default_address: book.default_entry().map(|(id, saved)| AddressView {
            id: id.to_string(),
            address: saved.address.clone(),
            is_default: true,
        }),
    })
}

/// Update name and phone.
#[instrument(skip_all, fields(uid = %user.uid))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileUpdate>,
) -> Result<Redirect> {
    let update = ProfileUpdate {
        name: form.name.trim().to_owned(),
        phone: form.phone.trim().to_owned(),
    };
    if update.name.is_empty() {
        flash(&session, Notice::warning("Name is required")).await;
        return Ok(Redirect::to("/account"));
    }

    UserRepository::new(state.db())
        .update_profile(&user.uid, &update)
        .await?;

    let refreshed = CurrentUser {
        name: update.name,
        ..user
    };
    session.insert(session_keys::CURRENT_USER, &refreshed).await?;
    flash(&session, Notice::success("Profile updated")).await;
    Ok(Redirect::to("/account"))
}

/// Order history, newest first.
#[instrument(skip_all, fields(uid = %user.uid))]
pub async fn orders(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.db())
        .list_for_user(&user.uid)
        .await?;
    Ok(OrdersTemplate { page, orders })
}

/// One order, if it belongs to the signed-in user.
#[instrument(skip(state, page, user))]
pub async fn order(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = owned_order(&state, &user, &id).await?;
    Ok(OrderTemplate { page, order })
}

/// Address book.
#[instrument(skip_all, fields(uid = %user.uid))]
pub async fn addresses(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let book = UserRepository::new(state.db()).addresses(&user.uid).await?;
    Ok(AddressesTemplate {
        page,
        addresses: address_views(&book),
        is_full: book.is_full(),
        max_addresses: MAX_ADDRESSES,
    })
}

/// Load the book, apply one change, save it. Rule violations become a notice.
async fn change_book<F>(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    success: &str,
    change: F,
) -> Result<Redirect>
where
    F: FnOnce(&mut AddressBook) -> std::result::Result<(), AddressBookError>,
{
    let users = UserRepository::new(state.db());
    let mut book = users.addresses(&user.uid).await?;
    match change(&mut book) {
        Ok(()) => {
            users.save_addresses(&user.uid, &book).await?;
            flash(session, Notice::success(success)).await;
        }
        Err(e) => flash(session, Notice::warning(e.to_string())).await,
    }
    Ok(Redirect::to("/account/addresses"))
}

/// Add an address.
#[instrument(skip_all, fields(uid = %user.uid))]
pub async fn add_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Result<Redirect> {
    let make_default = form.make_default.is_some();
    change_book(&state, &session, &user, "Address saved", |book| {
        let address = form.into_address()?;
        book.add(AddressId::generate(), address, make_default)
    })
    .await
}

/// Address edit form.
#[instrument(skip(state, page, user))]
pub async fn edit_address(
    State(state): State<AppState>,
    page: Page,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_address_id(&id)?;
    let book = UserRepository::new(state.db()).addresses(&user.uid).await?;
    let saved = book
        .get(&id)
        .ok_or_else(|| AppError::NotFound("address".to_owned()))?;
    Ok(AddressEditTemplate {
        page,
        entry: AddressView {
            id: id.to_string(),
            address: saved.address.clone(),
            is_default: saved.is_default,
        },
    })
}

/// Save changes to an address.
#[instrument(skip(state, session, user, form))]
pub async fn update_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<AddressForm>,
) -> Result<Redirect> {
    let id = parse_address_id(&id)?;
    let make_default = form.make_default.is_some();
    change_book(&state, &session, &user, "Address updated", |book| {
        book.update(&id, form.into_address()?)?;
        if make_default {
            book.set_default(&id)?;
        }
        Ok(())
    })
    .await
}

/// Delete an address. Removing the default promotes the first remaining one.
#[instrument(skip(state, session, user))]
pub async fn delete_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = parse_address_id(&id)?;
    change_book(&state, &session, &user, "Address removed", |book| {
        book.remove(&id).map(|_| ())
    })
    .await
}

/// Make an address the default.
#[instrument(skip(state, session, user))]
pub async fn set_default_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = parse_address_id(&id)?;
    change_book(&state, &session, &user, "Default address updated", |book| {
        book.set_default(&id)
    })
    .await
}
