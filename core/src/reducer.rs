//! The Reducer trait, the core abstraction for business logic.
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State,
//! Effects)`. They validate the action against current state, update state in
//! place, and return descriptions of the side effects to run. They are
//! deterministic given their inputs (randomness and time come in through the
//! Environment) and therefore directly unit-testable.

use crate::effect::Effect;
use smallvec::SmallVec;

/// The Reducer trait - core abstraction for business logic.
///
/// # Type Parameters
///
/// - `State`: the domain state this reducer operates on
/// - `Action`: the action type this reducer processes
/// - `Environment`: the injected dependencies this reducer needs
///
/// # Example
///
/// ```ignore
/// impl Reducer for EnrollmentReducer {
///     type State = EnrollmentState;
///     type Action = EnrollmentAction;
///     type Environment = EnrollmentEnvironment;
///
///     fn reduce(
///         &self,
///         state: &mut EnrollmentState,
///         action: EnrollmentAction,
///         env: &EnrollmentEnvironment,
///     ) -> SmallVec<[Effect<EnrollmentAction>; 4]> {
///         match action {
///             EnrollmentAction::JoinWaitingList { event_id, entrant } => {
///                 // validate, mutate, describe effects
///                 smallvec![]
///             }
///             _ => smallvec![],
///         }
///     }
/// }
/// ```
pub trait Reducer {
    /// The state type this reducer operates on.
    type State;

    /// The action type this reducer processes.
    type Action;

    /// The environment type with injected dependencies.
    type Environment;

    /// Reduce an action into state changes and effects.
    ///
    /// This is a pure function that:
    /// 1. Validates the action
    /// 2. Updates state in place (all-or-nothing: a rejected action must not
    ///    leave partial mutations behind)
    /// 3. Returns effect descriptions to be executed by the runtime
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]>;
}
