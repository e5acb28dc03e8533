//! Lazily computed comparison results.
//!
//! The grid and series comparators run on first query and serve the cached
//! result afterwards. `invalidate` drops the result; the next query recomputes.

#[derive(Debug, Clone, Default)]
pub(crate) enum Evaluation<T> {
    #[default]
    Unevaluated,
    Evaluated(T),
}

impl<T> Evaluation<T> {
    pub(crate) fn is_evaluated(&self) -> bool {
        matches!(self, Self::Evaluated(_))
    }

    pub(crate) fn get_or_evaluate<F>(&mut self, evaluate: F) -> &T
    where
        F: FnOnce() -> T,
    {
        if let Self::Unevaluated = self {
            *self = Self::Evaluated(evaluate());
        }
        match &*self {
            Self::Evaluated(result) => result,
            Self::Unevaluated => unreachable!("evaluation state set above"),
        }
    }

    /// Return the cached result, running `evaluate` first if there is none.
    /// A failed evaluation leaves the state unevaluated.
    pub(crate) fn get_or_try_evaluate<E, F>(&mut self, evaluate: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Self::Unevaluated = self {
            *self = Self::Evaluated(evaluate()?);
        }
        match &*self {
            Self::Evaluated(result) => Ok(result),
            Self::Unevaluated => unreachable!("evaluation state set above"),
        }
    }

    pub(crate) fn invalidate(&mut self) {
        *self = Self::Unevaluated;
    }
}
