//! Ingredients, recipes, and the static recipe table.
//!
//! Ingredients cover raw, chopped, plated and delivered items plus two
//! virtual ingredients standing for the cutting and delivery stations.
//! Station ingredients are stationary: they never move, are never consumed,
//! and are available in unlimited supply.

use serde::{Deserialize, Serialize};

/// Every item kind that can exist in a kitchen, plus the two stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ingredient {
    /// Raw tomato (`t`).
    Tomato,
    /// Chopped tomato (`T`).
    ChoppedTomato,
    /// Raw lettuce (`l`).
    Lettuce,
    /// Chopped lettuce (`L`).
    ChoppedLettuce,
    /// Empty plate (`p`).
    Plate,
    /// Plate holding chopped tomato (`a`).
    PlatedTomato,
    /// Plate holding chopped lettuce (`b`).
    PlatedLettuce,
    /// Plate holding a salad (`c`).
    PlatedSalad,
    /// Delivered tomato dish (`A`).
    DeliveredTomato,
    /// Delivered lettuce dish (`B`).
    DeliveredLettuce,
    /// Delivered salad (`C`).
    DeliveredSalad,
    /// Unplated salad (`s`).
    Salad,
    /// Virtual ingredient for a cutting station (`x`).
    Cutting,
    /// Virtual ingredient for a delivery station (`y`).
    Delivery,
}

impl Ingredient {
    /// Ingredients that can appear as loose items in a level file.
    pub const ITEMS: [Self; 12] = [
        Self::Tomato,
        Self::ChoppedTomato,
        Self::Lettuce,
        Self::ChoppedLettuce,
        Self::Plate,
        Self::PlatedTomato,
        Self::PlatedLettuce,
        Self::PlatedSalad,
        Self::DeliveredTomato,
        Self::DeliveredLettuce,
        Self::DeliveredSalad,
        Self::Salad,
    ];

    /// Single-character glyph used by level files and logs.
    pub const fn glyph(self) -> char {
        match self {
            Self::Tomato => 't',
            Self::ChoppedTomato => 'T',
            Self::Lettuce => 'l',
            Self::ChoppedLettuce => 'L',
            Self::Plate => 'p',
            Self::PlatedTomato => 'a',
            Self::PlatedLettuce => 'b',
            Self::PlatedSalad => 'c',
            Self::DeliveredTomato => 'A',
            Self::DeliveredLettuce => 'B',
            Self::DeliveredSalad => 'C',
            Self::Salad => 's',
            Self::Cutting => 'x',
            Self::Delivery => 'y',
        }
    }

    /// Parse a loose-item glyph. Station glyphs are not items.
    pub fn from_glyph(glyph: char) -> Option<Self> {
        Self::ITEMS.into_iter().find(|item| item.glyph() == glyph)
    }

    /// Whether this is a station ingredient (never moves, never consumed).
    pub const fn is_stationary(self) -> bool {
        matches!(self, Self::Cutting | Self::Delivery)
    }

    /// Map a level goal name to the delivered ingredient it requires.
    pub fn from_goal_name(name: &str) -> Option<Self> {
        match name {
            "Salad" => Some(Self::DeliveredSalad),
            "SimpleTomato" => Some(Self::DeliveredTomato),
            "SimpleLettuce" => Some(Self::DeliveredLettuce),
            _ => None,
        }
    }
}

impl core::fmt::Display for Ingredient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// A pure combination rule: `ingredient1 + ingredient2 -> result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Recipe {
    /// First input; may be a station ingredient.
    pub ingredient1: Ingredient,
    /// Second input; always a movable item.
    pub ingredient2: Ingredient,
    /// The produced item.
    pub result: Ingredient,
}

impl Recipe {
    /// Placeholder recipe used by the "doing nothing" goal of each agent.
    pub const IDLE: Self = Self::new(Ingredient::Delivery, Ingredient::Delivery, Ingredient::Delivery);

    /// Create a recipe.
    pub const fn new(ingredient1: Ingredient, ingredient2: Ingredient, result: Ingredient) -> Self {
        Self {
            ingredient1,
            ingredient2,
            result,
        }
    }

    /// Whether this is the [`Recipe::IDLE`] placeholder.
    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }

    /// Whether `ingredient` is one of the two inputs.
    pub fn uses(&self, ingredient: Ingredient) -> bool {
        self.ingredient1 == ingredient || self.ingredient2 == ingredient
    }
}

impl core::fmt::Display for Recipe {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.result.glyph())
    }
}

/// The fixed recipe table, sorted by `(ingredient1, ingredient2)`.
pub const RECIPES: [Recipe; 11] = {
    use Ingredient::{
        ChoppedLettuce, ChoppedTomato, Cutting, DeliveredLettuce, DeliveredSalad, DeliveredTomato,
        Delivery, Lettuce, Plate, PlatedLettuce, PlatedSalad, PlatedTomato, Salad, Tomato,
    };
    [
        Recipe::new(ChoppedLettuce, ChoppedTomato, Salad),
        Recipe::new(Plate, ChoppedTomato, PlatedTomato),
        Recipe::new(Plate, ChoppedLettuce, PlatedLettuce),
        Recipe::new(Plate, Salad, PlatedSalad),
        Recipe::new(PlatedTomato, ChoppedLettuce, PlatedSalad),
        Recipe::new(PlatedLettuce, ChoppedTomato, PlatedSalad),
        Recipe::new(Cutting, Tomato, ChoppedTomato),
        Recipe::new(Cutting, Lettuce, ChoppedLettuce),
        Recipe::new(Delivery, PlatedTomato, DeliveredTomato),
        Recipe::new(Delivery, PlatedLettuce, DeliveredLettuce),
        Recipe::new(Delivery, PlatedSalad, DeliveredSalad),
    ]
};

/// Look up the product of combining `ingredient1` with `ingredient2`,
/// in that order.
pub fn combine(ingredient1: Ingredient, ingredient2: Ingredient) -> Option<Ingredient> {
    RECIPES
        .iter()
        .find(|recipe| recipe.ingredient1 == ingredient1 && recipe.ingredient2 == ingredient2)
        .map(|recipe| recipe.result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyphs_round_trip_for_items() {
        for item in Ingredient::ITEMS {
            assert_eq!(Ingredient::from_glyph(item.glyph()), Some(item));
        }
        assert_eq!(Ingredient::from_glyph('x'), None);
        assert_eq!(Ingredient::from_glyph('-'), None);
    }

    #[test]
    fn only_stations_are_stationary() {
        assert!(Ingredient::Cutting.is_stationary());
        assert!(Ingredient::Delivery.is_stationary());
        assert!(Ingredient::ITEMS.iter().all(|item| !item.is_stationary()));
    }

    #[test]
    fn combine_is_ordered() {
        assert_eq!(
            combine(Ingredient::Cutting, Ingredient::Tomato),
            Some(Ingredient::ChoppedTomato)
        );
        assert_eq!(combine(Ingredient::Tomato, Ingredient::Cutting), None);
        assert_eq!(
            combine(Ingredient::Plate, Ingredient::ChoppedLettuce),
            Some(Ingredient::PlatedLettuce)
        );
    }

    #[test]
    fn goal_names() {
        assert_eq!(
            Ingredient::from_goal_name("Salad"),
            Some(Ingredient::DeliveredSalad)
        );
        assert_eq!(Ingredient::from_goal_name("Soup"), None);
    }
}
