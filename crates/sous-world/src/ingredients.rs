//! Ingredient multisets used for resource accounting.
//!
//! Station ingredients are never counted as consumed: a recipe whose first
//! input is a station only demands its second input.

use std::collections::{BTreeMap, BTreeSet};

use sous_types::{Ingredient, Recipe};

/// A multiset of ingredients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ingredients {
    counts: BTreeMap<Ingredient, usize>,
}

impl Ingredients {
    /// Create an empty multiset.
    pub const fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }

    /// Add one unit of `ingredient`.
    pub fn add(&mut self, ingredient: Ingredient) {
        let count = self.counts.entry(ingredient).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Add the inputs consumed by `recipe`.
    pub fn add_recipe(&mut self, recipe: &Recipe) {
        if !recipe.ingredient1.is_stationary() {
            self.add(recipe.ingredient1);
        }
        self.add(recipe.ingredient2);
    }

    /// Add the inputs consumed by every recipe in `recipes`.
    pub fn add_recipes<'a>(&mut self, recipes: impl IntoIterator<Item = &'a Recipe>) {
        for recipe in recipes {
            self.add_recipe(recipe);
        }
    }

    /// Consume the inputs of `recipe` and add its result.
    pub fn perform_recipe(&mut self, recipe: &Recipe) {
        if !recipe.ingredient1.is_stationary() {
            self.take(recipe.ingredient1);
        }
        self.take(recipe.ingredient2);
        self.add(recipe.result);
    }

    /// Perform every recipe in `recipes`, in order.
    pub fn perform_recipes<'a>(&mut self, recipes: impl IntoIterator<Item = &'a Recipe>) {
        for recipe in recipes {
            self.perform_recipe(recipe);
        }
    }

    /// Whether the inputs of `recipe` are available.
    pub fn has_ingredients(&self, recipe: &Recipe) -> bool {
        (recipe.ingredient1.is_stationary() || self.count(recipe.ingredient1) > 0)
            && self.count(recipe.ingredient2) > 0
    }

    /// Whether the inputs of every recipe are individually available.
    pub fn has_all_ingredients<'a>(&self, recipes: impl IntoIterator<Item = &'a Recipe>) -> bool {
        recipes.into_iter().all(|recipe| self.has_ingredients(recipe))
    }

    /// Number of units of `ingredient`.
    pub fn count(&self, ingredient: Ingredient) -> usize {
        self.counts.get(&ingredient).copied().unwrap_or(0)
    }

    /// The distinct ingredient kinds present.
    pub fn types(&self) -> BTreeSet<Ingredient> {
        self.counts.keys().copied().collect()
    }

    /// Remove every ingredient.
    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Whether every count in `self` is covered by `other`.
    pub fn fits_within(&self, other: &Self) -> bool {
        self.counts
            .iter()
            .all(|(ingredient, count)| *count <= other.count(*ingredient))
    }

    /// Whether some count in `self` exceeds the one in `other`.
    pub fn exceeds(&self, other: &Self) -> bool {
        !self.fits_within(other)
    }

    fn take(&mut self, ingredient: Ingredient) {
        if let Some(count) = self.counts.get_mut(&ingredient) {
            *count = count.saturating_sub(1);
        }
    }
}

impl FromIterator<Ingredient> for Ingredients {
    fn from_iter<I: IntoIterator<Item = Ingredient>>(iter: I) -> Self {
        let mut ingredients = Self::new();
        for ingredient in iter {
            ingredients.add(ingredient);
        }
        ingredients
    }
}

#[cfg(test)]
mod tests {
    use sous_types::RECIPES;

    use super::*;

    fn chop_tomato() -> Recipe {
        Recipe::new(Ingredient::Cutting, Ingredient::Tomato, Ingredient::ChoppedTomato)
    }

    #[test]
    fn station_inputs_are_not_demanded() {
        let mut demand = Ingredients::new();
        demand.add_recipe(&chop_tomato());
        assert_eq!(demand.count(Ingredient::Cutting), 0);
        assert_eq!(demand.count(Ingredient::Tomato), 1);
    }

    #[test]
    fn performing_a_recipe_moves_counts() {
        let mut stock: Ingredients = [Ingredient::Tomato, Ingredient::Plate].into_iter().collect();
        assert!(stock.has_ingredients(&chop_tomato()));
        stock.perform_recipe(&chop_tomato());
        assert_eq!(stock.count(Ingredient::Tomato), 0);
        assert_eq!(stock.count(Ingredient::ChoppedTomato), 1);
        assert!(!stock.has_ingredients(&chop_tomato()));
    }

    #[test]
    fn subset_comparisons() {
        let small: Ingredients = [Ingredient::Tomato].into_iter().collect();
        let large: Ingredients = [Ingredient::Tomato, Ingredient::Tomato, Ingredient::Plate]
            .into_iter()
            .collect();
        assert!(small.fits_within(&large));
        assert!(!small.exceeds(&large));
        assert!(large.exceeds(&small));
        assert!(Ingredients::new().fits_within(&small));
    }

    #[test]
    fn combined_demand_of_two_recipes() {
        let mut demand = Ingredients::new();
        demand.add_recipes(RECIPES.iter().filter(|recipe| recipe.ingredient1 == Ingredient::Plate));
        assert_eq!(demand.count(Ingredient::Plate), 3);
        let stock: Ingredients = [Ingredient::Plate, Ingredient::ChoppedTomato].into_iter().collect();
        assert!(demand.exceeds(&stock));
    }
}
