//! Static kitchen layout and the world transition rules.
//!
//! The [`Environment`] is built once per level and never changes. It owns
//! the wall bitmap, the station lists, and the goal description, and it is
//! the only place where a [`State`] is advanced.
//!
//! Two movement helpers exist: [`Environment::move_clipped`] stays put when
//! the target is a counter (used for collision checks), while
//! [`Environment::move_noclip`] returns the raw target cell (used to decide
//! what an action interacts with).

use std::collections::BTreeSet;

use sous_types::{
    Action, AgentCombination, AgentId, CellType, Coordinate, Direction, Ingredient, JointAction,
    RECIPES, Recipe, combine,
};
use tracing::trace;

use crate::error::WorldError;
use crate::ingredients::Ingredients;
use crate::state::{Location, State};

/// Static cell layout of a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Row-major wall bitmap of `width * height` cells.
    pub walls: Vec<bool>,
    /// Cutting station cells.
    pub cutting_stations: Vec<Coordinate>,
    /// Delivery station cells.
    pub delivery_stations: Vec<Coordinate>,
}

/// The immutable rules and layout of one level.
#[derive(Debug, Clone)]
pub struct Environment {
    layout: Layout,
    agent_count: usize,
    goal_names: Vec<String>,
    goal_ingredients: Ingredients,
    goal_related_recipes: Vec<Recipe>,
}

impl Environment {
    /// Build an environment and derive the goal-related recipes.
    pub fn new(layout: Layout, goals: &[(String, Ingredient)], agent_count: usize) -> Self {
        let goal_ingredients: Ingredients = goals.iter().map(|(_, item)| *item).collect();
        let goal_related_recipes = calculate_recipes(&goal_ingredients);
        Self {
            layout,
            agent_count,
            goal_names: goals.iter().map(|(name, _)| name.clone()).collect(),
            goal_ingredients,
            goal_related_recipes,
        }
    }

    // -------------------------------------------------------------------
    // Layout queries
    // -------------------------------------------------------------------

    /// Number of columns.
    pub const fn width(&self) -> usize {
        self.layout.width
    }

    /// Number of rows.
    pub const fn height(&self) -> usize {
        self.layout.height
    }

    /// Number of agents acting in this level.
    pub const fn agent_count(&self) -> usize {
        self.agent_count
    }

    /// Goal names as written in the level file.
    pub fn goal_names(&self) -> &[String] {
        &self.goal_names
    }

    /// Delivered dishes required to finish the level.
    pub const fn goal_ingredients(&self) -> &Ingredients {
        &self.goal_ingredients
    }

    /// Recipes that can transitively contribute to the goal.
    pub fn goal_related_recipes(&self) -> &[Recipe] {
        &self.goal_related_recipes
    }

    /// Every in-bounds cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Coordinate> + '_ {
        (0..self.layout.height)
            .flat_map(move |y| (0..self.layout.width).map(move |x| Coordinate::new(x, y)))
    }

    /// Whether `coordinate` lies on the grid.
    pub const fn is_inbounds(&self, coordinate: Coordinate) -> bool {
        coordinate.x < self.layout.width && coordinate.y < self.layout.height
    }

    /// Whether `coordinate` is of cell type `cell_type`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] when the coordinate is off-grid.
    pub fn is_cell_type(&self, coordinate: Coordinate, cell_type: CellType) -> Result<bool, WorldError> {
        if !self.is_inbounds(coordinate) {
            return Err(WorldError::OutOfBounds {
                x: coordinate.x,
                y: coordinate.y,
            });
        }
        Ok(match cell_type {
            CellType::Wall => self.is_wall(coordinate),
            CellType::CuttingStation => self.layout.cutting_stations.contains(&coordinate),
            CellType::DeliveryStation => self.layout.delivery_stations.contains(&coordinate),
        })
    }

    /// Whether `coordinate` is a counter. Off-grid cells count as counters.
    pub fn is_wall(&self, coordinate: Coordinate) -> bool {
        if !self.is_inbounds(coordinate) {
            return true;
        }
        let index = coordinate
            .y
            .saturating_mul(self.layout.width)
            .saturating_add(coordinate.x);
        self.layout.walls.get(index).copied().unwrap_or(true)
    }

    /// Whether `coordinate` is a delivery station.
    pub fn is_delivery_station(&self, coordinate: Coordinate) -> bool {
        self.layout.delivery_stations.contains(&coordinate)
    }

    /// Whether `coordinate` is a cutting station.
    pub fn is_cutting_station(&self, coordinate: Coordinate) -> bool {
        self.layout.cutting_stations.contains(&coordinate)
    }

    /// The cell reached by stepping in `direction`; stays put when the
    /// target is a counter or off-grid.
    pub fn move_clipped(&self, coordinate: Coordinate, direction: Direction) -> Coordinate {
        match coordinate.step(direction) {
            Some(next) if !self.is_wall(next) => next,
            _ => coordinate,
        }
    }

    /// The target cell of `direction`, counters included. `None` when the
    /// target is off-grid.
    pub fn move_noclip(&self, coordinate: Coordinate, direction: Direction) -> Option<Coordinate> {
        coordinate
            .step(direction)
            .filter(|next| self.is_inbounds(*next))
    }

    /// Whether `action` from `coordinate` targets a counter rather than
    /// moving the agent.
    pub fn is_action_none_nav(&self, coordinate: Coordinate, direction: Direction) -> bool {
        !direction.is_stay()
            && self
                .move_noclip(coordinate, direction)
                .is_none_or(|target| self.is_wall(target))
    }

    /// In-bounds orthogonal neighbours in the order up, right, down, left.
    pub fn neighbours(&self, coordinate: Coordinate) -> Vec<Coordinate> {
        [Direction::Up, Direction::Right, Direction::Down, Direction::Left]
            .into_iter()
            .filter_map(|direction| self.move_noclip(coordinate, direction))
            .collect()
    }

    // -------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------

    /// Apply one joint action.
    ///
    /// Counter interactions of every agent after the first are validated
    /// against the pre-turn state. Returns `false` without touching `state`
    /// when agents collide or any individual action fails.
    pub fn act(&self, state: &mut State, joint_action: &JointAction) -> bool {
        if self.contains_collisions(state, joint_action) {
            return false;
        }
        let mut next = state.clone();
        for (position, action) in joint_action.actions().enumerate() {
            if action.direction.is_stay() {
                continue;
            }
            if position == 0 {
                if !self.act_single(&mut next, action) {
                    return false;
                }
            } else {
                let mut probe = state.clone();
                if !self.act_single(&mut probe, action) {
                    return false;
                }
                self.act_single(&mut next, action);
            }
        }
        *state = next;
        true
    }

    /// Apply a single agent's action. Returns `false` when the action has
    /// no effect other than bumping into a counter.
    pub fn act_single(&self, state: &mut State, action: Action) -> bool {
        if action.direction.is_stay() {
            return true;
        }
        let Some(agent) = state.agents.get(action.agent.index()).copied() else {
            return false;
        };
        let Some(target) = self.move_noclip(agent.coordinate, action.direction) else {
            return false;
        };
        let held = agent.item;
        let on_target = state.ingredient_at(target);

        if !self.is_wall(target) {
            set_coordinate(state, action.agent, target);
            trace!(agent = %action.agent, %target, "Moved");
            return true;
        }

        if self.is_delivery_station(target) {
            if let Some(dish) = held.and_then(|item| combine(Ingredient::Delivery, item)) {
                set_item(state, action.agent, None);
                state.add_goal_item(target, dish);
                trace!(agent = %action.agent, %dish, "Delivered");
            }
            return true;
        }

        match (held, on_target) {
            (Some(item), Some(other)) => {
                let Some(result) = combine(item, other).or_else(|| combine(other, item)) else {
                    return false;
                };
                state.remove(target);
                set_item(state, action.agent, Some(result));
                trace!(agent = %action.agent, %result, "Combined");
                true
            }
            (Some(item), None) => {
                let chopped = combine(Ingredient::Cutting, item)
                    .filter(|_| self.is_cutting_station(target));
                if let Some(chopped) = chopped {
                    set_item(state, action.agent, Some(chopped));
                    trace!(agent = %action.agent, %chopped, "Chopped");
                } else {
                    set_item(state, action.agent, None);
                    state.add(target, item);
                    trace!(agent = %action.agent, %item, "Placed");
                }
                true
            }
            (None, Some(item)) => {
                state.remove(target);
                set_item(state, action.agent, Some(item));
                trace!(agent = %action.agent, %item, "Picked up");
                true
            }
            (None, None) => false,
        }
    }

    /// Whether any two agents would end in the same cell or swap cells.
    ///
    /// When two agents target the same cell and one of them does not move,
    /// only the mover is cancelled; any cancellation rejects the turn.
    pub fn contains_collisions(&self, state: &State, joint_action: &JointAction) -> bool {
        let moves: Vec<(Coordinate, Coordinate)> = state
            .agents
            .iter()
            .enumerate()
            .map(|(index, agent)| {
                let direction = joint_action.direction(AgentId(index));
                (agent.coordinate, self.move_clipped(agent.coordinate, direction))
            })
            .collect();

        moves.iter().enumerate().any(|(first, (current1, next1))| {
            moves
                .iter()
                .skip(first.saturating_add(1))
                .any(|(current2, next2)| next1 == next2 || current1 == next2 || current2 == next1)
        })
    }

    /// Every joint action in which agents of `agents` take any of the five
    /// primitive actions and all other agents stay.
    ///
    /// Enumerated as an odometer with agent 0 changing fastest.
    pub fn joint_actions(&self, agents: &AgentCombination) -> Vec<JointAction> {
        let options: Vec<&[Direction]> = (0..self.agent_count)
            .map(|index| {
                if agents.contains(AgentId(index)) {
                    Direction::ALL.as_slice()
                } else {
                    core::slice::from_ref(&Direction::Stay)
                }
            })
            .collect();

        let mut counters = vec![0_usize; options.len()];
        let mut joint_actions = Vec::new();
        loop {
            joint_actions.push(JointAction::from_directions(
                counters
                    .iter()
                    .zip(&options)
                    .map(|(counter, choices)| choices.get(*counter).copied().unwrap_or_default())
                    .collect(),
            ));

            let mut index = 0;
            loop {
                let (Some(counter), Some(choices)) = (counters.get_mut(index), options.get(index))
                else {
                    return joint_actions;
                };
                *counter = counter.saturating_add(1);
                if *counter < choices.len() {
                    break;
                }
                *counter = 0;
                index = index.saturating_add(1);
            }
        }
    }

    // -------------------------------------------------------------------
    // Recipes and goal
    // -------------------------------------------------------------------

    /// Goal-related recipes whose inputs exist in `state` and after which
    /// the goal is still achievable.
    pub fn possible_recipes(&self, state: &State) -> Vec<Recipe> {
        let available = state.ingredients_count();
        self.goal_related_recipes
            .iter()
            .filter(|recipe| {
                (recipe.ingredient1.is_stationary() || state.contains_item(recipe.ingredient1))
                    && state.contains_item(recipe.ingredient2)
                    && self.does_recipe_lead_to_goal(&available, **recipe)
            })
            .copied()
            .collect()
    }

    fn does_recipe_lead_to_goal(&self, ingredients: &Ingredients, recipe: Recipe) -> bool {
        let mut after = ingredients.clone();
        after.perform_recipe(&recipe);
        self.do_ingredients_lead_to_goal(&after)
    }

    fn do_ingredients_lead_to_goal(&self, ingredients: &Ingredients) -> bool {
        if self.goal_ingredients.fits_within(ingredients) {
            return true;
        }
        RECIPES.iter().any(|recipe| {
            let mut demand = Ingredients::new();
            demand.add_recipe(recipe);
            !demand.exceeds(ingredients) && self.does_recipe_lead_to_goal(ingredients, *recipe)
        })
    }

    /// Whether every goal dish has been delivered.
    pub fn is_done(&self, state: &State) -> bool {
        self.goal_ingredients.fits_within(&state.ingredients_count())
    }

    // -------------------------------------------------------------------
    // Ingredient locations
    // -------------------------------------------------------------------

    /// Direct locations of `ingredient`; station ingredients map to their
    /// station cells.
    pub fn locations(&self, state: &State, ingredient: Ingredient) -> Vec<Location> {
        match ingredient {
            Ingredient::Cutting => self
                .layout
                .cutting_stations
                .iter()
                .copied()
                .map(Location::direct)
                .collect(),
            Ingredient::Delivery => self
                .layout
                .delivery_stations
                .iter()
                .copied()
                .map(Location::direct)
                .collect(),
            _ => state.locations(ingredient),
        }
    }

    /// Floor cells from which a movable `ingredient` can be reached.
    ///
    /// Items on counters expand into one location per adjacent floor cell.
    pub fn non_wall_locations(&self, state: &State, ingredient: Ingredient) -> Vec<Location> {
        let mut result = Vec::new();
        for coordinate in state.coordinates(ingredient, true) {
            if self.is_wall(coordinate) {
                result.extend(
                    self.neighbours(coordinate)
                        .into_iter()
                        .filter(|neighbour| !self.is_wall(*neighbour))
                        .map(|neighbour| Location {
                            coordinate: neighbour,
                            original: coordinate,
                            from_wall: true,
                        }),
                );
            } else {
                result.push(Location::direct(coordinate));
            }
        }
        result
    }

    /// Cells holding `ingredient`; station ingredients map to their stations.
    pub fn coordinates(&self, state: &State, ingredient: Ingredient, include_agent_holding: bool) -> Vec<Coordinate> {
        match ingredient {
            Ingredient::Cutting => self.layout.cutting_stations.clone(),
            Ingredient::Delivery => self.layout.delivery_stations.clone(),
            _ => state.coordinates(ingredient, include_agent_holding),
        }
    }

    /// Render `state` on the grid, one text row per grid row.
    ///
    /// Items win over agents; an agent shows its held item or its id.
    pub fn render(&self, state: &State) -> String {
        let mut buffer = String::new();
        for y in 0..self.layout.height {
            for x in 0..self.layout.width {
                let coordinate = Coordinate::new(x, y);
                let glyph = if let Some(item) = state.ingredient_at(coordinate) {
                    item.glyph()
                } else if let Some(agent) = state.agent_at(coordinate) {
                    state
                        .held_item(agent)
                        .map(Ingredient::glyph)
                        .or_else(|| {
                            char::from_digit(u32::try_from(agent.index()).unwrap_or(u32::MAX), 10)
                        })
                        .unwrap_or('?')
                } else if self.is_cutting_station(coordinate) {
                    CellType::CuttingStation.glyph()
                } else if self.is_delivery_station(coordinate) {
                    CellType::DeliveryStation.glyph()
                } else if self.is_wall(coordinate) {
                    CellType::Wall.glyph()
                } else {
                    ' '
                };
                buffer.push(glyph);
            }
            buffer.push('\n');
        }
        buffer
    }
}

fn set_coordinate(state: &mut State, agent: AgentId, coordinate: Coordinate) {
    if let Some(entry) = state.agent_mut(agent) {
        entry.coordinate = coordinate;
    }
}

fn set_item(state: &mut State, agent: AgentId, item: Option<Ingredient>) {
    if let Some(entry) = state.agent_mut(agent) {
        entry.item = item;
    }
}

/// Recipes whose inputs both belong to the closure of ingredients that can
/// eventually produce a goal dish.
fn calculate_recipes(goal_ingredients: &Ingredients) -> Vec<Recipe> {
    let mut relevant: BTreeSet<Ingredient> = goal_ingredients.types();
    loop {
        let before = relevant.len();
        for recipe in &RECIPES {
            if relevant.contains(&recipe.result) {
                relevant.insert(recipe.ingredient1);
                relevant.insert(recipe.ingredient2);
            }
        }
        if relevant.len() == before {
            break;
        }
    }
    RECIPES
        .iter()
        .filter(|recipe| relevant.contains(&recipe.ingredient1) && relevant.contains(&recipe.ingredient2))
        .copied()
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::level::Level;

    const KITCHEN: &str = "\
-/-*-
t   p
-   -
--T--

SimpleTomato

1,1
2,2
";

    fn kitchen() -> Level {
        Level::parse(KITCHEN, 2).unwrap()
    }

    fn joint(directions: &[Direction]) -> JointAction {
        JointAction::from_directions(directions.to_vec())
    }

    #[test]
    fn cell_types_and_bounds() {
        let level = kitchen();
        let env = &level.environment;
        assert!(env.is_cell_type(Coordinate::new(1, 0), CellType::CuttingStation).unwrap());
        assert!(env.is_cell_type(Coordinate::new(1, 0), CellType::Wall).unwrap());
        assert!(!env.is_cell_type(Coordinate::new(1, 1), CellType::Wall).unwrap());
        assert!(env.is_cell_type(Coordinate::new(3, 0), CellType::DeliveryStation).unwrap());
        assert!(env.is_cell_type(Coordinate::new(9, 9), CellType::Wall).is_err());
    }

    #[test]
    fn moving_into_a_counter_is_clipped() {
        let level = kitchen();
        let env = &level.environment;
        let start = Coordinate::new(1, 1);
        assert_eq!(env.move_clipped(start, Direction::Up), start);
        assert_eq!(env.move_clipped(start, Direction::Right), Coordinate::new(2, 1));
        assert_eq!(env.move_noclip(start, Direction::Up), Some(Coordinate::new(1, 0)));
        assert_eq!(env.move_noclip(Coordinate::new(0, 0), Direction::Up), None);
        assert_eq!(env.neighbours(Coordinate::new(0, 0)).len(), 2);
        assert!(env.is_action_none_nav(start, Direction::Up));
        assert!(!env.is_action_none_nav(start, Direction::Down));
    }

    #[test]
    fn pick_up_chop_and_place() {
        let level = kitchen();
        let env = &level.environment;
        let mut state = level.state.clone();

        // Agent 0 picks the tomato off the left counter.
        assert!(env.act(&mut state, &joint(&[Direction::Left, Direction::Stay])));
        assert_eq!(state.held_item(AgentId(0)), Some(Ingredient::Tomato));
        assert!(state.ingredient_at(Coordinate::new(0, 1)).is_none());

        // Interacting with the cutting station chops it in hand.
        assert!(env.act(&mut state, &joint(&[Direction::Up, Direction::Stay])));
        assert_eq!(state.held_item(AgentId(0)), Some(Ingredient::ChoppedTomato));

        // Placing on an empty counter.
        assert!(env.act(&mut state, &joint(&[Direction::Left, Direction::Stay])));
        assert_eq!(state.ingredient_at(Coordinate::new(0, 1)), Some(Ingredient::ChoppedTomato));
        assert_eq!(state.held_item(AgentId(0)), None);
    }

    #[test]
    fn bumping_an_empty_counter_fails_without_mutation() {
        let level = kitchen();
        let env = &level.environment;
        let mut state = level.state.clone();
        let before = state.clone();
        assert!(!env.act(&mut state, &joint(&[Direction::Up, Direction::Down])));
        assert_eq!(state, before);
    }

    #[test]
    fn combining_checks_both_orders() {
        let level = kitchen();
        let env = &level.environment;
        let mut state = level.state.clone();
        let helper = state.agents.get_mut(1).unwrap();
        helper.coordinate = Coordinate::new(3, 1);
        helper.item = Some(Ingredient::Tomato);

        // Raw tomato and plate do not combine.
        assert!(!env.act(&mut state, &joint(&[Direction::Stay, Direction::Right])));

        // Chopped tomato in hand, plate on the counter: reverse table order.
        state.agents.get_mut(1).unwrap().item = Some(Ingredient::ChoppedTomato);
        assert!(env.act(&mut state, &joint(&[Direction::Stay, Direction::Right])));
        assert_eq!(state.held_item(AgentId(1)), Some(Ingredient::PlatedTomato));
        assert!(state.ingredient_at(Coordinate::new(4, 1)).is_none());

        // Delivering from below the station finishes the level.
        assert!(!env.is_done(&state));
        assert!(env.act(&mut state, &joint(&[Direction::Stay, Direction::Up])));
        assert_eq!(state.held_item(AgentId(1)), None);
        assert!(env.is_done(&state));
    }

    #[test]
    fn delivery_station_is_always_accepted() {
        let text = "\
-*-
- -
---

SimpleTomato

1,1
";
        let level = Level::parse(text, 1).unwrap();
        let env = &level.environment;
        let mut state = level.state.clone();

        // Empty-handed bump into the delivery station is a harmless success.
        assert!(env.act(&mut state, &joint(&[Direction::Up])));
        assert!(state.goal_items.is_empty());

        state.agents.get_mut(0).unwrap().item = Some(Ingredient::PlatedTomato);
        assert!(env.act(&mut state, &joint(&[Direction::Up])));
        assert_eq!(state.held_item(AgentId(0)), None);
        assert_eq!(state.goal_items, vec![(Coordinate::new(1, 0), Ingredient::DeliveredTomato)]);
        assert!(env.is_done(&state));
    }

    #[test]
    fn swaps_and_shared_targets_collide() {
        let text = "\
-----
-   -
-----

SimpleTomato

1,1
2,1
";
        let level = Level::parse(text, 2).unwrap();
        let env = &level.environment;
        let state = level.state.clone();

        let swap = joint(&[Direction::Right, Direction::Left]);
        let swap_reversed = joint(&[Direction::Left, Direction::Right]);
        assert!(env.contains_collisions(&state, &swap));
        let mut moved = state.clone();
        moved.agents.swap(0, 1);
        assert!(env.contains_collisions(&moved, &swap_reversed));

        // Walking into a stationary agent.
        assert!(env.contains_collisions(&state, &joint(&[Direction::Right, Direction::Stay])));

        // Moving apart is fine.
        let mut apart = state.clone();
        assert!(env.act(&mut apart, &joint(&[Direction::Stay, Direction::Right])));
        assert_eq!(apart.location(AgentId(1)), Some(Coordinate::new(3, 1)));
    }

    #[test]
    fn act_is_deterministic() {
        let level = kitchen();
        let env = &level.environment;
        for action in env.joint_actions(&AgentCombination::all(2)) {
            let mut first = level.state.clone();
            let mut second = level.state.clone();
            assert_eq!(env.act(&mut first, &action), env.act(&mut second, &action));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn joint_actions_cover_only_members() {
        let level = kitchen();
        let env = &level.environment;
        let all = env.joint_actions(&AgentCombination::all(2));
        assert_eq!(all.len(), 25);
        assert_eq!(all.get(1).unwrap().direction(AgentId(0)), Direction::Right);
        assert_eq!(all.get(1).unwrap().direction(AgentId(1)), Direction::Up);

        let only_second = env.joint_actions(&AgentCombination::single(AgentId(1)));
        assert_eq!(only_second.len(), 5);
        assert!(only_second.iter().all(|action| !action.is_active(AgentId(0))));
    }

    #[test]
    fn recipe_closure_and_possible_recipes() {
        let level = kitchen();
        let env = &level.environment;
        let related = env.goal_related_recipes();
        assert!(related.iter().any(|recipe| recipe.result == Ingredient::DeliveredTomato));
        assert!(related.iter().all(|recipe| recipe.result != Ingredient::DeliveredSalad));

        let possible = env.possible_recipes(&level.state);
        assert!(possible.contains(&Recipe::new(
            Ingredient::Cutting,
            Ingredient::Tomato,
            Ingredient::ChoppedTomato
        )));
        assert!(!possible.iter().any(|recipe| recipe.ingredient1 == Ingredient::Delivery));
    }

    #[test]
    fn counter_items_are_reached_from_the_floor() {
        let level = kitchen();
        let env = &level.environment;
        let plates = env.non_wall_locations(&level.state, Ingredient::Plate);
        assert!(!plates.is_empty());
        assert!(plates.iter().all(|location| location.from_wall));
        assert_eq!(plates.len(), 1);
        assert!(plates.iter().all(|location| location.original == Coordinate::new(4, 1)));
        assert_eq!(env.locations(&level.state, Ingredient::Cutting).len(), 1);
    }

    #[test]
    fn render_shows_agents_and_items() {
        let level = kitchen();
        let rendered = level.environment.render(&level.state);
        let rows: Vec<&str> = rendered.lines().collect();
        assert_eq!(rows.first().copied(), Some("-/-*-"));
        assert_eq!(rows.get(1).copied(), Some("t0  p"));
    }
}
