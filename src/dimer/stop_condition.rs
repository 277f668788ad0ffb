//! A serializable expression language for convergence criteria.
//!
//! A predicate type `P` (serialized as an object with a single key) is extended
//! with `{"any": [...]}` and `{"all": [...]}` combinators.

pub mod prelude {
    pub use super::ShouldStop;
}

/// Generic trait for stop conditions.
pub trait ShouldStop<T> {
    fn should_stop(&self, x: &T) -> bool;
}

/// Logical combinations of `T` in JSON.
///
///  - `{"any": [(T), ...]}` - a logical-or of 0 or more expressions (empty is false)
///  - `{"all": [(T), ...]}` - a logical-and of 0 or more expressions (empty is true)
///
/// These appear untagged alongside the representations of `T` in [`Cereal`],
/// so adding further variants risks ambiguity.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalExpression<T> {
    #[serde(rename = "any")]
    Any(Vec<T>),
    #[serde(rename = "all")]
    All(Vec<T>),
}

/// Type that stop condition config deserializes directly into.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Cereal<P> {
    Simple(P),
    Logical(LogicalExpression<Cereal<P>>),
}

impl<T, P: ShouldStop<T>> ShouldStop<T> for Cereal<P> {
    fn should_stop(&self, x: &T) -> bool {
        match self {
            Cereal::Simple(pred) => pred.should_stop(x),
            Cereal::Logical(LogicalExpression::Any(xs)) => xs.iter().any(|c| c.should_stop(x)),
            Cereal::Logical(LogicalExpression::All(xs)) => xs.iter().all(|c| c.should_stop(x)),
        }
    }
}
