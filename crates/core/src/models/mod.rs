//! Domain records and the pure rules that mutate them.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod promo;
pub mod user;

pub use address::{AddressBook, AddressBookError, MAX_ADDRESSES, PostalAddress, SavedAddress};
pub use cart::{Cart, CartError, CartLine};
pub use order::{CustomerContact, Order, OrderLine};
pub use product::{LOW_STOCK_THRESHOLD, Product, ProductDraft, ProductError};
pub use promo::{ProductScope, PromoCode, PromoError};
pub use user::{ProfileUpdate, UserProfile};
