//! Catalog Service - read-only menu used for browsing and checkout pricing
//!
//! Checkout never trusts client prices: every cart line is re-priced through
//! [`Catalog::price_line`].

use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::order::DraftItem;
use shared::order::money::{is_valid_amount, to_decimal, to_f64};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sort_order: i32,
}

/// Named size or portion with its own price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    #[serde(default)]
    pub price_delta: f64,
}

/// Add-on group, e.g. "Rice" with "Plain" / "Garlic"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceGroup {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub category_id: String,
    /// Base price, used when no variant is selected
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub choice_groups: Vec<ChoiceGroup>,
}

fn default_true() -> bool {
    true
}

/// Menu file layout (`MENU_FILE`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Menu {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

/// Cart line after catalog pricing
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub name: String,
    pub unit_price: f64,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Menu item not found: {0}")]
    ItemNotFound(String),

    #[error("Menu item is not available: {0}")]
    ItemUnavailable(String),

    #[error("Unknown variant '{variant}' for {item}")]
    UnknownVariant { item: String, variant: String },

    #[error("Unknown choice '{choice}' in group '{group}' for {item}")]
    UnknownChoice {
        item: String,
        group: String,
        choice: String,
    },

    #[error("Choice group '{group}' is required for {item}")]
    MissingRequiredChoice { item: String, group: String },

    #[error("Invalid price for {0}")]
    InvalidPrice(String),

    #[error("Failed to load menu: {0}")]
    Load(String),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let code = match &err {
            CatalogError::ItemNotFound(_) => ErrorCode::MenuItemNotFound,
            CatalogError::ItemUnavailable(_)
            | CatalogError::UnknownVariant { .. }
            | CatalogError::UnknownChoice { .. }
            | CatalogError::MissingRequiredChoice { .. } => ErrorCode::ValidationFailed,
            CatalogError::InvalidPrice(_) => ErrorCode::InvalidAmount,
            CatalogError::Load(_) => ErrorCode::ConfigError,
        };
        AppError::with_message(code, err.to_string())
    }
}

// =============================================================================
// Trait
// =============================================================================

/// Menu source
pub trait Catalog: Send + Sync + std::fmt::Debug {
    fn list_categories(&self) -> Vec<Category>;

    /// Items, optionally restricted to one category
    fn list_menu_items(&self, category_id: Option<&str>) -> Vec<MenuItem>;

    fn get_menu_item(&self, item_id: &str) -> Option<MenuItem>;

    fn list_variants(&self, item_id: &str) -> Result<Vec<Variant>, CatalogError> {
        self.get_menu_item(item_id)
            .map(|item| item.variants)
            .ok_or_else(|| CatalogError::ItemNotFound(item_id.to_string()))
    }

    fn list_choice_groups(&self, item_id: &str) -> Result<Vec<ChoiceGroup>, CatalogError> {
        self.get_menu_item(item_id)
            .map(|item| item.choice_groups)
            .ok_or_else(|| CatalogError::ItemNotFound(item_id.to_string()))
    }

    /// Price one cart line: variant price (or base price) plus choice deltas
    fn price_line(&self, line: &DraftItem) -> Result<PricedLine, CatalogError> {
        let item = self
            .get_menu_item(&line.menu_item_id)
            .ok_or_else(|| CatalogError::ItemNotFound(line.menu_item_id.clone()))?;
        if !item.available {
            return Err(CatalogError::ItemUnavailable(item.id));
        }

        let base = match &line.variant {
            Some(name) => {
                item.variants
                    .iter()
                    .find(|v| &v.name == name)
                    .ok_or_else(|| CatalogError::UnknownVariant {
                        item: item.id.clone(),
                        variant: name.clone(),
                    })?
                    .price
            }
            None => item.price,
        };

        let mut unit_price = to_decimal(base);
        for (group_name, choice_name) in &line.selected_choices {
            let choice = item
                .choice_groups
                .iter()
                .find(|g| &g.name == group_name)
                .and_then(|g| g.choices.iter().find(|c| &c.name == choice_name))
                .ok_or_else(|| CatalogError::UnknownChoice {
                    item: item.id.clone(),
                    group: group_name.clone(),
                    choice: choice_name.clone(),
                })?;
            unit_price += to_decimal(choice.price_delta);
        }

        if let Some(group) = item
            .choice_groups
            .iter()
            .find(|g| g.required && !line.selected_choices.contains_key(&g.name))
        {
            return Err(CatalogError::MissingRequiredChoice {
                item: item.id.clone(),
                group: group.name.clone(),
            });
        }

        let unit_price = to_f64(unit_price);
        if !is_valid_amount(unit_price) {
            return Err(CatalogError::InvalidPrice(item.id));
        }

        Ok(PricedLine {
            name: item.name,
            unit_price,
        })
    }
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Debug)]
pub struct InMemoryCatalog {
    categories: Vec<Category>,
    items: HashMap<String, MenuItem>,
}

impl InMemoryCatalog {
    pub fn new(menu: Menu) -> Self {
        let mut categories = menu.categories;
        categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
        let items = menu
            .items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        Self { categories, items }
    }

    /// Load a menu JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Load(format!("{}: {}", path.display(), e)))?;
        let menu: Menu = serde_json::from_str(&raw)
            .map_err(|e| CatalogError::Load(format!("{}: {}", path.display(), e)))?;

        if let Some(item) = menu.items.iter().find(|i| !is_valid_amount(i.price)) {
            return Err(CatalogError::InvalidPrice(item.id.clone()));
        }

        tracing::info!(
            path = %path.display(),
            categories = menu.categories.len(),
            items = menu.items.len(),
            "Menu loaded"
        );
        Ok(Self::new(menu))
    }

    /// Small built-in menu for development and tests
    pub fn sample() -> Self {
        let rice = ChoiceGroup {
            name: "Rice".to_string(),
            required: false,
            choices: vec![
                Choice {
                    name: "Plain".to_string(),
                    price_delta: 0.0,
                },
                Choice {
                    name: "Garlic".to_string(),
                    price_delta: 15.0,
                },
            ],
        };

        Self::new(Menu {
            categories: vec![
                Category {
                    id: "mains".to_string(),
                    name: "Mains".to_string(),
                    sort_order: 1,
                },
                Category {
                    id: "drinks".to_string(),
                    name: "Drinks".to_string(),
                    sort_order: 2,
                },
            ],
            items: vec![
                MenuItem {
                    id: "adobo".to_string(),
                    name: "Chicken Adobo".to_string(),
                    category_id: "mains".to_string(),
                    price: 100.0,
                    description: None,
                    image_url: None,
                    available: true,
                    variants: vec![],
                    choice_groups: vec![rice],
                },
                MenuItem {
                    id: "sinigang".to_string(),
                    name: "Pork Sinigang".to_string(),
                    category_id: "mains".to_string(),
                    price: 150.0,
                    description: None,
                    image_url: None,
                    available: true,
                    variants: vec![Variant {
                        name: "Family".to_string(),
                        price: 320.0,
                    }],
                    choice_groups: vec![],
                },
                MenuItem {
                    id: "calamansi".to_string(),
                    name: "Calamansi Juice".to_string(),
                    category_id: "drinks".to_string(),
                    price: 45.0,
                    description: None,
                    image_url: None,
                    available: true,
                    variants: vec![],
                    choice_groups: vec![],
                },
                MenuItem {
                    id: "halo-halo".to_string(),
                    name: "Halo-Halo".to_string(),
                    category_id: "drinks".to_string(),
                    price: 95.0,
                    description: None,
                    image_url: None,
                    available: false,
                    variants: vec![],
                    choice_groups: vec![],
                },
            ],
        })
    }
}

impl Catalog for InMemoryCatalog {
    fn list_categories(&self) -> Vec<Category> {
        self.categories.clone()
    }

    fn list_menu_items(&self, category_id: Option<&str>) -> Vec<MenuItem> {
        let mut items: Vec<MenuItem> = self
            .items
            .values()
            .filter(|item| category_id.is_none_or(|c| item.category_id == c))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    fn get_menu_item(&self, item_id: &str) -> Option<MenuItem> {
        self.items.get(item_id).cloned()
    }
}
