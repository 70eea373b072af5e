//! Remove agents from a plan that do not need to take part in it.
//!
//! A joint search over several agents moves all of them, even when one
//! would have been enough. Trimming replaces an agent's actions with
//! [`Direction::Stay`] wherever the recipe result is still produced without
//! them, so that agent stays free for other goals.

use sous_types::{AgentId, Direction, JointAction, Recipe};
use sous_world::{Environment, State};
use tracing::trace;

/// Silence agents over whole prefixes of the plan, longest prefix first.
///
/// For each cut-off index from the end of the plan backward, every agent
/// not yet trimmed is replaced by `Stay` on all turns up to and including
/// the index. The change is kept when the result still appears by then.
/// Stops once all but one agent have been trimmed.
pub fn trim_forward(actions: &mut Vec<JointAction>, state: &State, environment: &Environment, recipe: Recipe) {
    let agent_count = environment.agent_count();
    let mut agent_done = vec![false; agent_count];

    for index in (0..actions.len()).rev() {
        for agent in 0..agent_count {
            if agent_done.get(agent).copied().unwrap_or(true) {
                continue;
            }
            let mut current = state.clone();
            let modified = silence(actions, 0, index, AgentId(agent), &mut current, environment);
            if current.contains_item(recipe.result) {
                *actions = modified;
                if let Some(done) = agent_done.get_mut(agent) {
                    *done = true;
                }
                trace!(agent, through = index, "Trimmed agent from plan prefix");
            }
        }
        if all_but_one_done(&agent_done) {
            return;
        }
    }
}

/// Copy of `actions` with `agent` staying on turns `start..=end`, applying
/// those turns to `state`.
fn silence(
    actions: &[JointAction],
    start: usize,
    end: usize,
    agent: AgentId,
    state: &mut State,
    environment: &Environment,
) -> Vec<JointAction> {
    let mut modified = actions.to_vec();
    for action in modified
        .iter_mut()
        .skip(start)
        .take(end.saturating_sub(start).saturating_add(1))
    {
        action.set(agent, Direction::Stay);
        environment.act(state, action);
    }
    modified
}

fn all_but_one_done(agent_done: &[bool]) -> bool {
    let done = agent_done.iter().filter(|done| **done).count();
    done > 0 && done == agent_done.len().saturating_sub(1)
}
