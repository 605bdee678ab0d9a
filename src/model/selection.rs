use std::collections::BTreeMap;

use super::{ballot::Position, vote::VoteChoice};

/// What a call to [`SelectionSet::toggle`] did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected,
    Deselected,
}

/// The voter's current choices: at most one candidate per position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    choices: BTreeMap<String, String>,
}

impl SelectionSet {
    /// Choose `candidate_id` for `position_id`, replacing any earlier choice.
    /// Choosing the already-chosen candidate clears the position instead.
    pub fn toggle(&mut self, position_id: &str, candidate_id: &str) -> Selection {
        if self.get(position_id) == Some(candidate_id) {
            self.choices.remove(position_id);
            Selection::Deselected
        } else {
            self.choices
                .insert(position_id.to_string(), candidate_id.to_string());
            Selection::Selected
        }
    }

    pub fn get(&self, position_id: &str) -> Option<&str> {
        self.choices.get(position_id).map(String::as_str)
    }

    pub fn contains(&self, position_id: &str) -> bool {
        self.choices.contains_key(position_id)
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.choices.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Positions without a choice, in the order given.
    pub fn missing<'a>(&self, positions: &'a [Position]) -> Vec<&'a Position> {
        positions.iter().filter(|p| !self.contains(&p.id)).collect()
    }

    /// Fraction of `total` positions with a choice, in `[0, 1]`.
    pub fn progress(&self, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (self.len().min(total) as f64) / (total as f64)
    }

    pub fn to_votes(&self) -> Vec<VoteChoice> {
        self.iter()
            .map(|(position_id, candidate_id)| VoteChoice {
                position_id: position_id.to_string(),
                candidate_id: candidate_id.to_string(),
            })
            .collect()
    }
}
