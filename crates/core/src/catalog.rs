//! Read-only browse views over the product collection.
//!
//! Filtering and sorting run in memory over a slice of products; callers load
//! (and optionally cache) the whole collection first.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::models::Product;
use crate::types::Money;

/// Inclusive price range applied to the effective (post-discount) price.
///
/// Written as `min-max` with either end optional: `100-500`, `1000-`, `-250`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceBracket {
    pub min: Option<Money>,
    pub max: Option<Money>,
}

impl PriceBracket {
    /// Parse a `min-max` bracket. Returns `None` for malformed input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (min, max) = raw.trim().split_once('-')?;
        let bound = |s: &str| -> Option<Option<Money>> {
            let s = s.trim();
            if s.is_empty() {
                Some(None)
            } else {
                s.parse::<u64>().ok().map(|v| Some(Money::new(v)))
            }
        };
        let bracket = Self {
            min: bound(min)?,
            max: bound(max)?,
        };
        match (bracket.min, bracket.max) {
            (Some(lo), Some(hi)) if lo > hi => None,
            _ => Some(bracket),
        }
    }

    #[must_use]
    pub fn contains(&self, price: Money) -> bool {
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

/// Sort orders offered on the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Featured first, then by name.
    #[default]
    Featured,
    PriceLowHigh,
    PriceHighLow,
    /// New arrivals first, then by name.
    Newest,
    Name,
    BiggestDiscount,
}

impl SortOrder {
    pub const ALL: [Self; 6] = [
        Self::Featured,
        Self::PriceLowHigh,
        Self::PriceHighLow,
        Self::Newest,
        Self::Name,
        Self::BiggestDiscount,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceLowHigh => "price-asc",
            Self::PriceHighLow => "price-desc",
            Self::Newest => "newest",
            Self::Name => "name",
            Self::BiggestDiscount => "discount",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Featured => "Featured",
            Self::PriceLowHigh => "Price: low to high",
            Self::PriceHighLow => "Price: high to low",
            Self::Newest => "Newest",
            Self::Name => "Name",
            Self::BiggestDiscount => "Biggest discount",
        }
    }

    /// Parse a query-string value; unknown values fall back to the default.
    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == raw)
            .unwrap_or_default()
    }
}

/// Filters and ordering for a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseQuery {
    pub category: Option<String>,
    pub price: Option<PriceBracket>,
    pub search: Option<String>,
    pub sort: SortOrder,
}

impl BrowseQuery {
    /// Build a query from raw query-string values, ignoring blanks and
    /// malformed brackets.
    #[must_use]
    pub fn from_params(
        category: Option<&str>,
        price: Option<&str>,
        search: Option<&str>,
        sort: Option<&str>,
    ) -> Self {
        let non_blank = |s: Option<&str>| {
            s.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        };
        Self {
            category: non_blank(category),
            price: price.and_then(PriceBracket::parse),
            search: non_blank(search),
            sort: sort.map(SortOrder::parse_or_default).unwrap_or_default(),
        }
    }

    fn matches(&self, product: &Product, needle: Option<&str>) -> bool {
        if let Some(category) = &self.category
            && !product.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        if let Some(bracket) = &self.price
            && !bracket.contains(product.effective_price())
        {
            return false;
        }
        if let Some(needle) = needle {
            let hit = [&product.name, &product.description, &product.category]
                .into_iter()
                .any(|field| field.to_lowercase().contains(needle));
            if !hit {
                return false;
            }
        }
        true
    }

    /// Apply the filters and sort order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let needle = self.search.as_deref().map(str::to_lowercase);
        let mut hits: Vec<&Product> = products
            .iter()
            .filter(|p| self.matches(p, needle.as_deref()))
            .collect();
        sort(&mut hits, self.sort);
        hits
    }
}

fn sort(products: &mut [&Product], order: SortOrder) {
    let by_name = |p: &&Product| p.name.to_lowercase();
    match order {
        SortOrder::Featured => products.sort_by_key(|p| (Reverse(p.featured), by_name(p))),
        SortOrder::PriceLowHigh => products.sort_by_key(|p| (p.effective_price(), by_name(p))),
        SortOrder::PriceHighLow => {
            products.sort_by_key(|p| (Reverse(p.effective_price()), by_name(p)));
        }
        SortOrder::Newest => products.sort_by_key(|p| (Reverse(p.is_new), by_name(p))),
        SortOrder::Name => products.sort_by_key(by_name),
        SortOrder::BiggestDiscount => products.sort_by_key(|p| (Reverse(p.discount), by_name(p))),
    }
}

/// Distinct categories, sorted.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .map(|p| p.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Featured products that are in stock, up to `limit`.
#[must_use]
pub fn featured(products: &[Product], limit: usize) -> Vec<&Product> {
    let mut picks: Vec<&Product> = products
        .iter()
        .filter(|p| p.featured && p.in_stock())
        .collect();
    sort(&mut picks, SortOrder::Name);
    picks.truncate(limit);
    picks
}

/// Products flagged as new, up to `limit`.
#[must_use]
pub fn new_arrivals(products: &[Product], limit: usize) -> Vec<&Product> {
    let mut picks: Vec<&Product> = products.iter().filter(|p| p.is_new).collect();
    sort(&mut picks, SortOrder::Name);
    picks.truncate(limit);
    picks
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Percent, ProductId};

    fn product(id: &str, category: &str, price: u64, discount: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: id.to_owned(),
            category: category.to_owned(),
            description: format!("A fine {category} item"),
            price: Money::new(price),
            discount: Percent::new(discount).unwrap(),
            stock: 1,
            image: None,
            featured: false,
            is_new: false,
        }
    }

    fn catalog() -> Vec<Product> {
        let mut lamp = product("lamp", "home", 1200, 50);
        lamp.featured = true;
        let mut mug = product("mug", "home", 300, 0);
        mug.is_new = true;
        let shirt = product("shirt", "apparel", 800, 10);
        vec![lamp, mug, shirt]
    }

    fn ids(products: &[&Product]) -> Vec<String> {
        products.iter().map(|p| p.id.to_string()).collect()
    }

    #[test]
    fn test_price_bracket_parse() {
        assert_eq!(
            PriceBracket::parse("100-500"),
            Some(PriceBracket {
                min: Some(Money::new(100)),
                max: Some(Money::new(500))
            })
        );
        assert_eq!(PriceBracket::parse("1000-").unwrap().max, None);
        assert_eq!(PriceBracket::parse("-250").unwrap().min, None);
        assert_eq!(PriceBracket::parse("500-100"), None);
        assert_eq!(PriceBracket::parse("abc"), None);
    }

    #[test]
    fn test_filters_use_effective_price() {
        let products = catalog();
        let q = BrowseQuery::from_params(None, Some("0-700"), None, Some("price-asc"));
        // lamp is 1200 at 50% off = 600
        assert_eq!(ids(&q.apply(&products)), ["mug", "lamp"]);
    }

    #[test]
    fn test_category_and_search() {
        let products = catalog();
        let q = BrowseQuery::from_params(Some("HOME"), None, None, Some("name"));
        assert_eq!(ids(&q.apply(&products)), ["lamp", "mug"]);

        let q = BrowseQuery::from_params(None, None, Some("Apparel"), None);
        assert_eq!(ids(&q.apply(&products)), ["shirt"]);
    }

    #[test]
    fn test_sort_orders() {
        let products = catalog();
        let sorted = |s: &str| ids(&BrowseQuery::from_params(None, None, None, Some(s)).apply(&products));
        assert_eq!(sorted("featured"), ["lamp", "mug", "shirt"]);
        assert_eq!(sorted("price-desc"), ["shirt", "lamp", "mug"]);
        assert_eq!(sorted("newest")[0], "mug");
        assert_eq!(sorted("discount"), ["lamp", "shirt", "mug"]);
        assert_eq!(sorted("bogus"), sorted("featured"));
    }

    #[test]
    fn test_lists() {
        let products = catalog();
        assert_eq!(categories(&products), ["apparel", "home"]);
        assert_eq!(ids(&featured(&products, 4)), ["lamp"]);
        assert_eq!(ids(&new_arrivals(&products, 4)), ["mug"]);
    }
}
