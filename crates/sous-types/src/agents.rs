//! Agent identifiers, agent combinations, and per-turn actions.
//!
//! Agents are identified by their index into the state's agent list, so
//! identifiers are dense and stable for the lifetime of a level.

use serde::{Deserialize, Serialize};

use crate::grid::Direction;

/// Index of an agent in the world state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl AgentId {
    /// Return the inner index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for AgentId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// An ordered set of agents acting together.
///
/// Ordering compares size first and then members lexicographically, so
/// smaller coalitions sort before larger ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentCombination {
    agents: Vec<AgentId>,
}

impl AgentCombination {
    /// Create a combination from an agent list, keeping the given order.
    pub const fn new(agents: Vec<AgentId>) -> Self {
        Self { agents }
    }

    /// A combination holding exactly one agent.
    pub fn single(agent: AgentId) -> Self {
        Self {
            agents: vec![agent],
        }
    }

    /// Every agent `0..count`.
    pub fn all(count: usize) -> Self {
        Self {
            agents: (0..count).map(AgentId).collect(),
        }
    }

    /// Whether `agent` is a member.
    pub fn contains(&self, agent: AgentId) -> bool {
        self.agents.contains(&agent)
    }

    /// Number of members.
    pub const fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the combination has no members.
    pub const fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Iterate the members in order.
    pub fn iter(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.iter().copied()
    }

    /// The members as a slice.
    pub fn as_slice(&self) -> &[AgentId] {
        &self.agents
    }

    /// Append an agent.
    pub fn push(&mut self, agent: AgentId) {
        self.agents.push(agent);
    }

    /// Append every member of `other`.
    pub fn extend(&mut self, other: &Self) {
        self.agents.extend(other.iter());
    }

    /// Remove the first occurrence of `agent`, if present.
    pub fn remove(&mut self, agent: AgentId) {
        if let Some(position) = self.agents.iter().position(|entry| *entry == agent) {
            self.agents.remove(position);
        }
    }

    /// A copy without `agent`.
    #[must_use]
    pub fn without(&self, agent: AgentId) -> Self {
        let mut reduced = self.clone();
        reduced.remove(agent);
        reduced
    }

    /// Members of `other` that are not in `self`.
    pub fn new_agents(&self, other: &Self) -> Self {
        Self {
            agents: other.iter().filter(|agent| !self.contains(*agent)).collect(),
        }
    }

    /// Whether `agent` is the one and only member.
    pub fn is_only(&self, agent: AgentId) -> bool {
        self.agents.as_slice() == [agent]
    }

    /// Every non-empty subset, enumerated as a binary counter over member
    /// positions with the first member toggling fastest.
    pub fn subsets(&self) -> Vec<Self> {
        let count = self.agents.len();
        let total = 1_usize.checked_shl(u32::try_from(count).unwrap_or(u32::MAX)).unwrap_or(0);
        (1..total)
            .map(|mask| Self {
                agents: self
                    .agents
                    .iter()
                    .enumerate()
                    .filter(|(position, _)| (mask >> position) & 1 == 1)
                    .map(|(_, agent)| *agent)
                    .collect(),
            })
            .collect()
    }

    /// Every subset with exactly `size` members, in lexicographic order
    /// of member positions.
    pub fn subsets_of_size(&self, size: usize) -> Vec<Self> {
        combinations(&self.agents, size)
            .into_iter()
            .map(|agents| Self { agents })
            .collect()
    }
}

impl PartialOrd for AgentCombination {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AgentCombination {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.agents
            .len()
            .cmp(&other.agents.len())
            .then_with(|| self.agents.cmp(&other.agents))
    }
}

impl core::fmt::Display for AgentCombination {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "(")?;
        for (position, agent) in self.agents.iter().enumerate() {
            if position > 0 {
                write!(f, ",")?;
            }
            write!(f, "{agent}")?;
        }
        write!(f, ")")
    }
}

impl FromIterator<AgentId> for AgentCombination {
    fn from_iter<I: IntoIterator<Item = AgentId>>(iter: I) -> Self {
        Self {
            agents: iter.into_iter().collect(),
        }
    }
}

/// All `size`-element combinations of `items`, lexicographic by position.
pub fn combinations<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    let mut result = Vec::new();
    if size == 0 || size > items.len() {
        return result;
    }
    let mut indices: Vec<usize> = (0..size).collect();
    loop {
        result.push(
            indices
                .iter()
                .filter_map(|index| items.get(*index).cloned())
                .collect(),
        );

        // Advance the rightmost index that still has room.
        let mut position = size;
        loop {
            let Some(previous) = position.checked_sub(1) else {
                return result;
            };
            position = previous;
            let limit = items.len().saturating_sub(size).saturating_add(position);
            if indices.get(position).is_some_and(|index| *index < limit) {
                break;
            }
        }
        if let Some(index) = indices.get_mut(position) {
            *index = index.saturating_add(1);
        }
        let mut next = indices.get(position).copied().unwrap_or(0);
        for index in indices.iter_mut().skip(position.saturating_add(1)) {
            next = next.saturating_add(1);
            *index = next;
        }
    }
}

/// One agent's primitive action for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Action {
    /// What the agent does.
    pub direction: Direction,
    /// Who does it.
    pub agent: AgentId,
}

impl Action {
    /// Create an action.
    pub const fn new(direction: Direction, agent: AgentId) -> Self {
        Self { direction, agent }
    }

    /// The `none` action for `agent`.
    pub const fn stay(agent: AgentId) -> Self {
        Self {
            direction: Direction::Stay,
            agent,
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", self.direction, self.agent)
    }
}

/// One action per agent for a single turn, indexed by agent id.
///
/// The vector always holds exactly one entry per agent of the level;
/// agents that do not take part in a plan carry [`Direction::Stay`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JointAction {
    directions: Vec<Direction>,
}

impl JointAction {
    /// A joint action where all `agent_count` agents stay.
    pub fn stay(agent_count: usize) -> Self {
        Self {
            directions: vec![Direction::Stay; agent_count],
        }
    }

    /// Build from one direction per agent, in agent order.
    pub const fn from_directions(directions: Vec<Direction>) -> Self {
        Self { directions }
    }

    /// The direction of `agent`; unknown agents stay.
    pub fn direction(&self, agent: AgentId) -> Direction {
        self.directions
            .get(agent.index())
            .copied()
            .unwrap_or(Direction::Stay)
    }

    /// The action of `agent`.
    pub fn action(&self, agent: AgentId) -> Action {
        Action::new(self.direction(agent), agent)
    }

    /// Replace the direction of `agent`. Unknown agents are ignored.
    pub fn set(&mut self, agent: AgentId, direction: Direction) {
        if let Some(slot) = self.directions.get_mut(agent.index()) {
            *slot = direction;
        }
    }

    /// Number of agents covered.
    pub const fn len(&self) -> usize {
        self.directions.len()
    }

    /// Whether the joint action covers no agents.
    pub const fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Whether `agent` does something other than stay.
    pub fn is_active(&self, agent: AgentId) -> bool {
        !self.direction(agent).is_stay()
    }

    /// Whether every agent stays.
    pub fn is_all_stay(&self) -> bool {
        self.directions.iter().all(|direction| direction.is_stay())
    }

    /// Iterate the per-agent actions in agent order.
    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.directions
            .iter()
            .enumerate()
            .map(|(index, direction)| Action::new(*direction, AgentId(index)))
    }
}

impl core::fmt::Display for JointAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (position, action) in self.actions().enumerate() {
            if position > 0 {
                write!(f, ":")?;
            }
            write!(f, "{action}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(raw: &[usize]) -> AgentCombination {
        raw.iter().copied().map(AgentId).collect()
    }

    #[test]
    fn combinations_order_by_size_first() {
        assert!(ids(&[2]) < ids(&[0, 1]));
        assert!(ids(&[0, 1]) < ids(&[0, 2]));
        assert_eq!(ids(&[1, 0]).len(), 2);
    }

    #[test]
    fn subsets_count_like_a_binary_counter() {
        let subsets = AgentCombination::all(3).subsets();
        assert_eq!(subsets.len(), 7);
        assert_eq!(subsets.first().unwrap(), &ids(&[0]));
        assert_eq!(subsets.get(1).unwrap(), &ids(&[1]));
        assert_eq!(subsets.get(2).unwrap(), &ids(&[0, 1]));
        assert_eq!(subsets.last().unwrap(), &ids(&[0, 1, 2]));
    }

    #[test]
    fn fixed_size_subsets_are_lexicographic() {
        let pairs = AgentCombination::all(3).subsets_of_size(2);
        assert_eq!(pairs, vec![ids(&[0, 1]), ids(&[0, 2]), ids(&[1, 2])]);
        assert!(AgentCombination::all(2).subsets_of_size(3).is_empty());
        assert!(AgentCombination::all(2).subsets_of_size(0).is_empty());
    }

    #[test]
    fn combinations_of_items() {
        let picked = combinations(&['a', 'b', 'c', 'd'], 3);
        assert_eq!(picked.len(), 4);
        assert_eq!(picked.first().unwrap(), &vec!['a', 'b', 'c']);
        assert_eq!(picked.last().unwrap(), &vec!['b', 'c', 'd']);
    }

    #[test]
    fn new_agents_and_removal() {
        let used = ids(&[0]);
        assert_eq!(used.new_agents(&ids(&[0, 1])), ids(&[1]));
        assert!(used.new_agents(&ids(&[0])).is_empty());
        assert_eq!(ids(&[0, 1, 2]).without(AgentId(1)), ids(&[0, 2]));
        assert!(ids(&[1]).is_only(AgentId(1)));
        assert!(!ids(&[0, 1]).is_only(AgentId(1)));
    }

    #[test]
    fn joint_action_indexes_by_agent() {
        let mut joint = JointAction::stay(2);
        assert!(joint.is_all_stay());
        joint.set(AgentId(1), Direction::Left);
        assert_eq!(joint.direction(AgentId(1)), Direction::Left);
        assert!(joint.is_active(AgentId(1)));
        assert!(!joint.is_active(AgentId(0)));
        assert_eq!(joint.direction(AgentId(7)), Direction::Stay);
        assert_eq!(joint.to_string(), "n0:l1");
    }
}
