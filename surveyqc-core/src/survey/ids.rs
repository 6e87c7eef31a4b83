use serde::{Deserialize, Serialize};
use std::fmt;

/// Hierarchical block identifier, e.g. `[2]` for a top-level block and
/// `[2, 1]` for its first sub-block.
///
/// The derived `Ord` is lexicographic and is what block lists are sorted by.
/// `before` is the stricter partial order used to reason about precedence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub Vec<u32>);

impl BlockId {
    pub fn new(path: impl Into<Vec<u32>>) -> Self {
        Self(path.into())
    }

    pub fn top(index: u32) -> Self {
        Self(vec![index])
    }

    /// Id of the `index`-th child of this block.
    pub fn child(&self, index: u32) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_top_level(&self) -> bool {
        self.0.len() == 1
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &BlockId) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// Strict precedence by sibling-prefix comparison.
    ///
    /// Walks the shared prefix; the first differing component decides. Equal
    /// ids and ids where one is a prefix of the other are incomparable, so
    /// `a.before(b)` and `b.before(a)` are never both true.
    pub fn before(&self, other: &BlockId) -> bool {
        for (mine, theirs) in self.0.iter().zip(other.0.iter()) {
            if mine != theirs {
                return mine < theirs;
            }
        }
        false
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Question identifier, unique within a survey.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Row-derived id used for programmatically placed questions.
    pub fn from_position(row: u32, col: u32) -> Self {
        Self(format!("q_{row}_{col}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Answer option identifier, unique within a survey.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OptionId(pub String);

impl OptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_position(row: u32, col: u32) -> Self {
        Self(format!("comp_{row}_{col}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
