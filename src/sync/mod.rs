//! Local meal state with optimistic updates and rollback

pub mod optimistic;
pub mod state;

pub use optimistic::{apply_optimistic, Inverse, SyncError, Transition, TransitionError};
pub use state::{LocalItem, MealState};
