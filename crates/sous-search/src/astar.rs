//! Joint-action A* over an index arena.
//!
//! Nodes are appended to a `Vec` and referenced by [`NodeId`]. A node that
//! is superseded by a shorter path to the same `(state, passed)` key is
//! flagged invalid and left in place; its frontier entries are skipped when
//! popped.
//!
//! # Handoffs
//!
//! With a handoff agent set, the search tracks whether that agent has
//! already "passed" its item on. After any accepted node a twin is created
//! that shares the node's parent and state but records the pass at the
//! node's depth. Once passed, the handoff agent may only stay, and the
//! recipe result only counts when the handoff agent stays on that turn.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use sous_types::{AgentId, JointAction};
use sous_world::{Environment, State};
use tracing::{debug, trace};

use crate::SearchRequest;
use crate::heuristic::Heuristic;
use crate::oracle::DistanceOracle;

/// Index of a node in the arena.
type NodeId = usize;

#[derive(Debug, Clone)]
struct Node {
    state: State,
    parent: Option<NodeId>,
    action: Option<JointAction>,
    g: usize,
    h: Option<usize>,
    action_count: usize,
    pass_time: Option<usize>,
    closed: bool,
    valid: bool,
}

impl Node {
    const fn has_passed(&self) -> bool {
        self.pass_time.is_some()
    }

    fn f(&self) -> Option<usize> {
        self.h.map(|h| self.g.saturating_add(h))
    }

    /// Whether `self` reaches the same key more cheaply than `other`.
    fn is_shorter(&self, other: &Self) -> bool {
        if self.g != other.g {
            return self.g < other.g;
        }
        if self.action_count != other.action_count {
            return self.action_count < other.action_count;
        }
        match (self.pass_time, other.pass_time) {
            (Some(mine), Some(theirs)) => mine < theirs,
            _ => false,
        }
    }
}

/// Frontier entry; the heap pops the lowest f, then lowest g, then the
/// fewest non-stay actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    f: usize,
    g: usize,
    action_count: usize,
    id: NodeId,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.g.cmp(&self.g))
            .then_with(|| other.action_count.cmp(&self.action_count))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-invocation search state. Dropped when the search returns.
struct Space<'r> {
    request: &'r SearchRequest<'r>,
    nodes: Vec<Node>,
    frontier: BinaryHeap<Entry>,
    visited: HashMap<(State, bool), NodeId>,
    goal: Option<NodeId>,
}

impl Space<'_> {
    fn push(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    fn enqueue(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get(id) {
            self.frontier.push(Entry {
                f: node.f().unwrap_or(usize::MAX),
                g: node.g,
                action_count: node.action_count,
                id,
            });
        }
    }

    /// Walk parent links back to a root, keeping nodes that carry an action.
    fn extract_actions(&self, goal: NodeId) -> Vec<JointAction> {
        let mut actions = Vec::new();
        let mut cursor = Some(goal);
        while let Some(node) = cursor.and_then(|id| self.nodes.get(id)) {
            if node.parent.is_none() {
                break;
            }
            if let Some(action) = &node.action {
                actions.push(action.clone());
            }
            cursor = node.parent;
        }
        actions.reverse();
        actions
    }
}

/// A* searcher owning the level's distance tables.
#[derive(Debug, Clone)]
pub struct AStar {
    environment: Environment,
    oracle: DistanceOracle,
    depth_limit: usize,
}

impl AStar {
    /// Build a searcher, precomputing the distance tables.
    pub fn new(environment: Environment, depth_limit: usize) -> Self {
        let oracle = DistanceOracle::new(&environment);
        Self {
            environment,
            oracle,
            depth_limit,
        }
    }

    /// The distance tables.
    pub const fn oracle(&self) -> &DistanceOracle {
        &self.oracle
    }

    /// The level this searcher plans in.
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Find the shortest joint-action sequence producing the request's
    /// recipe result. Returns an empty path when none exists within the
    /// depth limit.
    pub fn search_joint(&self, request: &SearchRequest<'_>) -> Vec<JointAction> {
        let heuristic = Heuristic::new(
            &self.environment,
            &self.oracle,
            request.recipe.ingredient1,
            request.recipe.ingredient2,
        );
        trace!(
            recipe = %request.recipe,
            agents = %request.agents,
            handoff = ?request.handoff_agent,
            "Starting search"
        );

        let actions = self.environment.joint_actions(request.agents);
        let mut space = self.initialize(request, &heuristic);

        loop {
            if let Some(goal) = space.goal {
                let path = space.extract_actions(goal);
                debug!(
                    recipe = %request.recipe,
                    agents = %request.agents,
                    handoff = ?request.handoff_agent,
                    length = path.len(),
                    nodes = space.nodes.len(),
                    "Search found path"
                );
                return path;
            }

            let Some(current) = self.next_node(&mut space) else {
                trace!(recipe = %request.recipe, nodes = space.nodes.len(), "Search exhausted");
                return Vec::new();
            };

            for action in &actions {
                if !action_conforms(&space, current, action) {
                    continue;
                }
                let Some(node) = self.check_and_perform(&space, current, action, &heuristic) else {
                    continue;
                };
                let Some(accepted) = process_node(&mut space, node, action) else {
                    continue;
                };
                if let Some(pass) = generate_handoff(&space, accepted) {
                    process_node(&mut space, pass, action);
                }
            }
        }
    }

    fn initialize<'r>(&self, request: &'r SearchRequest<'r>, heuristic: &Heuristic<'_>) -> Space<'r> {
        let mut space = Space {
            request,
            nodes: Vec::new(),
            frontier: BinaryHeap::new(),
            visited: HashMap::new(),
            goal: None,
        };
        let root = Node {
            state: request.state.clone(),
            parent: None,
            action: None,
            g: 0,
            h: heuristic.estimate(request.state, request.agents, request.handoff_agent),
            action_count: 0,
            pass_time: None,
            closed: false,
            valid: true,
        };
        let root_key = (root.state.clone(), false);
        let root_id = space.push(root);
        space.enqueue(root_id);
        space.visited.insert(root_key, root_id);

        // The handoff agent may already be done before the first turn.
        if let Some(pass) = generate_handoff(&space, root_id) {
            let key = (pass.state.clone(), true);
            let pass_id = space.push(pass);
            space.enqueue(pass_id);
            space.visited.insert(key, pass_id);
        }
        space
    }

    /// Pop the next expandable node, closing nodes that are too deep, have
    /// no heuristic value, or were superseded.
    fn next_node(&self, space: &mut Space<'_>) -> Option<NodeId> {
        while let Some(entry) = space.frontier.pop() {
            let Some(node) = space.nodes.get_mut(entry.id) else {
                continue;
            };
            let within_limit = node.f().is_some_and(|f| f < self.depth_limit);
            if !within_limit {
                node.closed = true;
                continue;
            }
            if !node.closed && node.valid {
                node.closed = true;
                return Some(entry.id);
            }
        }
        None
    }

    /// Apply `action` to a copy of `current`, returning the child node.
    fn check_and_perform(
        &self,
        space: &Space<'_>,
        current: NodeId,
        action: &JointAction,
        heuristic: &Heuristic<'_>,
    ) -> Option<Node> {
        let parent = space.nodes.get(current)?;
        let handoff_agent = space.request.handoff_agent;
        if parent.has_passed() && handoff_agent.is_some_and(|agent| action.is_active(agent)) {
            return None;
        }

        let mut state = parent.state.clone();
        if !self.environment.act(&mut state, action) {
            return None;
        }
        let h = heuristic.estimate(&state, space.request.agents, handoff_agent);
        Some(Node {
            state,
            parent: Some(current),
            action: Some(action.clone()),
            g: parent.g.saturating_add(1),
            h,
            action_count: parent
                .action_count
                .saturating_add(action_cost(action, handoff_agent)),
            pass_time: parent.pass_time,
            closed: false,
            valid: true,
        })
    }
}

/// Whether `action` respects the pinned first action and the fixed prefix
/// for agents that are not free.
///
/// The prefix binds every agent it covers, including agents outside the
/// searched set. Those always stay in generated actions, so a prefix that
/// moves them admits no path.
fn action_conforms(space: &Space<'_>, current: NodeId, action: &JointAction) -> bool {
    let Some(node) = space.nodes.get(current) else {
        return false;
    };
    let request = space.request;
    if node.g == 0
        && let Some(initial) = request.initial_action
        && action.direction(initial.agent) != initial.direction
    {
        return false;
    }
    let Some(fixed) = request.input_actions.get(node.g) else {
        return true;
    };
    fixed
        .actions()
        .filter(|pinned| !request.free_agents.contains(pinned.agent))
        .all(|pinned| pinned.direction == action.direction(pinned.agent))
}

/// Insert a freshly generated node, resolving duplicates and goal checks.
///
/// Returns the node's id when it was accepted into the search.
fn process_node(space: &mut Space<'_>, node: Node, action: &JointAction) -> Option<NodeId> {
    let key = (node.state.clone(), node.has_passed());
    if let Some(existing) = space.visited.get(&key).copied() {
        let shorter = space
            .nodes
            .get(existing)
            .is_some_and(|other| node.is_shorter(other));
        if !shorter {
            return None;
        }
        if let Some(other) = space.nodes.get_mut(existing) {
            other.valid = false;
        }
        let id = space.push(node);
        space.visited.insert(key, id);
        space.enqueue(id);
        return Some(id);
    }

    let request = space.request;
    let produced = node.state.contains_item(request.recipe.result);
    let handoff_acted = request
        .handoff_agent
        .is_some_and(|agent| action.is_active(agent));

    if produced && handoff_acted {
        // The handoff agent may not be the one finishing the recipe.
        return None;
    }
    if produced && (request.handoff_agent.is_none() || node.has_passed()) {
        let id = space.push(node);
        space.goal = Some(id);
        return Some(id);
    }

    let id = space.push(node);
    space.visited.insert(key, id);
    space.enqueue(id);
    Some(id)
}

/// Twin of `id` in which the handoff agent has passed at this depth.
fn generate_handoff(space: &Space<'_>, id: NodeId) -> Option<Node> {
    let handoff_agent = space.request.handoff_agent?;
    let node = space.nodes.get(id)?;
    if node.has_passed() {
        return None;
    }
    let recipe = space.request.recipe;
    let held = node.state.held_item(handoff_agent);
    if held.is_some_and(|item| item == recipe.ingredient1 || item == recipe.ingredient2) {
        return None;
    }
    let mut pass = node.clone();
    pass.pass_time = Some(node.g);
    Some(pass)
}

/// Non-stay actions, not counting the handoff agent.
fn action_cost(action: &JointAction, handoff_agent: Option<AgentId>) -> usize {
    action
        .actions()
        .filter(|entry| Some(entry.agent) != handoff_agent && !entry.direction.is_stay())
        .count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sous_types::{Action, AgentCombination, Direction, Ingredient, Recipe};
    use sous_world::Level;

    use super::*;

    const LINE: &str = "\
------
-t   /
------

SimpleTomato

3,1
";

    fn chop() -> Recipe {
        Recipe::new(Ingredient::Cutting, Ingredient::Tomato, Ingredient::ChoppedTomato)
    }

    fn request<'a>(
        state: &'a State,
        agents: &'a AgentCombination,
        free: &'a AgentCombination,
        handoff_agent: Option<AgentId>,
    ) -> SearchRequest<'a> {
        SearchRequest {
            state,
            recipe: chop(),
            agents,
            handoff_agent,
            input_actions: &[],
            free_agents: free,
            initial_action: None,
        }
    }

    #[test]
    fn finds_a_shortest_single_agent_path() {
        let level = Level::parse(LINE, 1).unwrap();
        let search = AStar::new(level.environment.clone(), 30);
        let agents = AgentCombination::all(1);
        let free = AgentCombination::default();
        let path = search.search_joint(&request(&level.state, &agents, &free, None));

        // left, pick up, then three steps right ending in the chop
        assert_eq!(path.len(), 5);
        let mut state = level.state.clone();
        for action in &path {
            assert!(level.environment.act(&mut state, action));
        }
        assert!(state.contains_item(Ingredient::ChoppedTomato));
    }

    #[test]
    fn depth_limit_cuts_the_search() {
        let level = Level::parse(LINE, 1).unwrap();
        let search = AStar::new(level.environment.clone(), 5);
        let agents = AgentCombination::all(1);
        let free = AgentCombination::default();
        assert!(search.search_joint(&request(&level.state, &agents, &free, None)).is_empty());
    }

    #[test]
    fn pinned_initial_action_is_respected() {
        let level = Level::parse(LINE, 1).unwrap();
        let search = AStar::new(level.environment.clone(), 30);
        let agents = AgentCombination::all(1);
        let free = AgentCombination::default();
        let mut pinned = request(&level.state, &agents, &free, None);
        pinned.initial_action = Some(Action::new(Direction::Right, AgentId(0)));
        let path = search.search_joint(&pinned);
        assert_eq!(path.first().unwrap().direction(AgentId(0)), Direction::Right);
        assert_eq!(path.len(), 7);
    }

    #[test]
    fn fixed_prefix_binds_non_free_agents() {
        let level = Level::parse(LINE, 1).unwrap();
        let search = AStar::new(level.environment.clone(), 30);
        let agents = AgentCombination::all(1);
        let free = AgentCombination::default();
        let prefix = vec![JointAction::from_directions(vec![Direction::Right])];
        let mut fixed = request(&level.state, &agents, &free, None);
        fixed.input_actions = &prefix;
        let path = search.search_joint(&fixed);
        assert_eq!(path.len(), 7);
        assert_eq!(path.first(), prefix.first());

        // A free agent ignores the prefix.
        let mut loose = request(&level.state, &agents, &agents, None);
        loose.input_actions = &prefix;
        assert_eq!(search.search_joint(&loose).len(), 5);
    }

    #[test]
    fn fixed_prefix_binds_agents_outside_the_search() {
        const ROOM: &str = "\
------
-t   /
-    -
------

SimpleTomato

3,1
3,2
";
        let level = Level::parse(ROOM, 2).unwrap();
        let search = AStar::new(level.environment.clone(), 30);
        let agents = AgentCombination::single(AgentId(0));
        let free = AgentCombination::default();
        let prefix = vec![JointAction::from_directions(vec![Direction::Left, Direction::Left])];
        let mut pinned = request(&level.state, &agents, &free, None);
        pinned.input_actions = &prefix;
        assert!(search.search_joint(&pinned).is_empty());

        // Freeing the other agent lifts its part of the prefix.
        let other = AgentCombination::single(AgentId(1));
        let mut freed = request(&level.state, &agents, &other, None);
        freed.input_actions = &prefix;
        let path = search.search_joint(&freed);
        assert_eq!(path.len(), 5);
        assert_eq!(path.first().unwrap().direction(AgentId(0)), Direction::Left);
        assert!(path.iter().all(|action| !action.is_active(AgentId(1))));
    }

    #[test]
    fn frontier_orders_by_f_then_g() {
        let mut heap = BinaryHeap::new();
        heap.push(Entry { f: 5, g: 3, action_count: 0, id: 0 });
        heap.push(Entry { f: 4, g: 4, action_count: 2, id: 1 });
        heap.push(Entry { f: 4, g: 2, action_count: 9, id: 2 });
        heap.push(Entry { f: 4, g: 2, action_count: 1, id: 3 });
        let order: Vec<NodeId> = std::iter::from_fn(|| heap.pop().map(|entry| entry.id)).collect();
        assert_eq!(order, vec![3, 2, 1, 0]);
    }
}
