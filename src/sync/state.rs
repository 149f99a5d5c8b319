//! In-memory view of a meal's items and totals

use serde::Serialize;

use crate::models::{AggregateTotals, MealItem, NutrientProfile, ScaledMacros, ServingSpec};
use crate::nutrition::{aggregate, try_scale_to_serving, NutritionError};

/// An item as held locally. `id` is `None` until the store assigns one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalItem {
    pub id: Option<i64>,
    pub name: String,
    pub profile: NutrientProfile,
    pub serving: ServingSpec,
    pub macros: ScaledMacros,
}

impl LocalItem {
    /// A not-yet-stored item, scaled from its profile
    pub fn pending(name: &str, profile: NutrientProfile, serving: ServingSpec) -> Result<Self, NutritionError> {
        Ok(Self {
            id: None,
            name: name.to_string(),
            macros: try_scale_to_serving(&profile, &serving)?,
            profile,
            serving,
        })
    }
}

impl From<&MealItem> for LocalItem {
    fn from(item: &MealItem) -> Self {
        Self {
            id: Some(item.id),
            name: item.name.clone(),
            profile: item.profile,
            serving: item.serving,
            macros: item.macros,
        }
    }
}

/// Items of one meal plus their totals, kept in step by the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealState {
    items: Vec<LocalItem>,
    totals: AggregateTotals,
}

impl MealState {
    pub fn new(items: Vec<LocalItem>) -> Self {
        let totals = aggregate(items.iter().map(|i| &i.macros));
        Self { items, totals }
    }

    pub fn from_items(items: &[MealItem]) -> Self {
        Self::new(items.iter().map(LocalItem::from).collect())
    }

    pub fn items(&self) -> &[LocalItem] {
        &self.items
    }

    pub fn totals(&self) -> AggregateTotals {
        self.totals
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.items.iter().position(|i| i.id == Some(id))
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<LocalItem> {
        &mut self.items
    }

    /// Re-sum every item. Called after each local change.
    pub(crate) fn recompute(&mut self) {
        self.totals = aggregate(self.items.iter().map(|i| &i.macros));
    }
}
