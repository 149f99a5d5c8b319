//! Optimistic updates with explicit inverses
//!
//! A transition is applied to local state first and the remote store is
//! called afterwards. Before applying, the transition captures exactly what it
//! needs to undo itself; if the remote call fails the inverse is applied and
//! totals are recomputed, leaving items and totals as they were.

use thiserror::Error;

use crate::models::{ScaledMacros, ServingSpec};
use crate::nutrition::{try_scale_to_serving, NutritionError};
use super::state::{LocalItem, MealState};

/// A local change to a meal
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    AddItem(LocalItem),
    RemoveItem { id: i64 },
    UpdateServing { id: i64, serving: ServingSpec },
}

/// Undo information captured against the pre-transition state
#[derive(Debug, Clone, PartialEq)]
pub enum Inverse {
    /// Undo an add by removing what was pushed at `index`
    RemoveAt { index: usize },
    /// Undo a removal by putting the item back where it was
    Reinsert { index: usize, item: LocalItem },
    /// Undo a serving change
    RestoreServing {
        index: usize,
        serving: ServingSpec,
        macros: ScaledMacros,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("item {0} is not in this meal")]
    UnknownItem(i64),

    #[error(transparent)]
    Nutrition(#[from] NutritionError),
}

#[derive(Debug, Error)]
pub enum SyncError<E> {
    /// Rejected locally; nothing changed and the remote was not called
    #[error("{0}")]
    Rejected(#[from] TransitionError),

    /// The remote call failed and the local change was rolled back
    #[error("{0}")]
    Remote(E),
}

impl Transition {
    /// Apply to `state` and return the inverse. On error `state` is unchanged.
    pub fn apply(&self, state: &mut MealState) -> Result<Inverse, TransitionError> {
        let inverse = match self {
            Transition::AddItem(item) => {
                let index = state.items().len();
                state.items_mut().push(item.clone());
                Inverse::RemoveAt { index }
            }
            Transition::RemoveItem { id } => {
                let index = state.position(*id).ok_or(TransitionError::UnknownItem(*id))?;
                let item = state.items_mut().remove(index);
                Inverse::Reinsert { index, item }
            }
            Transition::UpdateServing { id, serving } => {
                let index = state.position(*id).ok_or(TransitionError::UnknownItem(*id))?;
                let item = &mut state.items_mut()[index];
                let macros = try_scale_to_serving(&item.profile, serving)?;
                let inverse = Inverse::RestoreServing {
                    index,
                    serving: item.serving,
                    macros: item.macros,
                };
                item.serving = *serving;
                item.macros = macros;
                inverse
            }
        };

        state.recompute();
        Ok(inverse)
    }
}

impl Inverse {
    pub fn apply(self, state: &mut MealState) {
        match self {
            Inverse::RemoveAt { index } => {
                if index < state.items().len() {
                    state.items_mut().remove(index);
                }
            }
            Inverse::Reinsert { index, item } => {
                let index = index.min(state.items().len());
                state.items_mut().insert(index, item);
            }
            Inverse::RestoreServing {
                index,
                serving,
                macros,
            } => {
                if let Some(item) = state.items_mut().get_mut(index) {
                    item.serving = serving;
                    item.macros = macros;
                }
            }
        }
        state.recompute();
    }
}

/// Apply `transition` locally, then run `remote` against the new state.
///
/// On remote failure the captured inverse is applied and the remote error is
/// returned. On success the remote's value is returned and the local change
/// stays.
pub fn apply_optimistic<T, E, F>(
    state: &mut MealState,
    transition: &Transition,
    remote: F,
) -> Result<T, SyncError<E>>
where
    F: FnOnce(&Transition, &MealState) -> Result<T, E>,
{
    let inverse = transition.apply(state)?;

    match remote(transition, state) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::debug!("Remote rejected {:?}; rolling back", transition);
            inverse.apply(state);
            Err(SyncError::Remote(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NutrientProfile;

    fn stored(id: i64, calories: f64, grams: f64) -> LocalItem {
        let mut item = LocalItem::pending(
            "food",
            NutrientProfile::new(calories, 10.0, 20.0, 5.0),
            ServingSpec::grams(grams),
        )
        .unwrap();
        item.id = Some(id);
        item
    }

    fn state() -> MealState {
        MealState::new(vec![stored(1, 100.0, 100.0), stored(2, 200.0, 50.0), stored(3, 300.0, 100.0)])
    }

    fn fail(_: &Transition, _: &MealState) -> Result<(), &'static str> {
        Err("offline")
    }

    #[test]
    fn test_add_is_kept_on_success() {
        let mut s = state();
        let item = stored(4, 400.0, 100.0);
        apply_optimistic(&mut s, &Transition::AddItem(item), |_, local| {
            assert_eq!(local.items().len(), 4);
            Ok::<_, ()>(())
        })
        .unwrap();
        assert_eq!(s.totals().calories, 100.0 + 100.0 + 300.0 + 400.0);
    }

    #[test]
    fn test_failed_add_rolls_back() {
        let before = state();
        let mut s = before.clone();
        let result = apply_optimistic(&mut s, &Transition::AddItem(stored(4, 400.0, 100.0)), fail);
        assert!(matches!(result, Err(SyncError::Remote("offline"))));
        assert_eq!(s, before);
    }

    #[test]
    fn test_failed_remove_restores_position_and_totals() {
        let before = state();
        let mut s = before.clone();
        let result = apply_optimistic(&mut s, &Transition::RemoveItem { id: 2 }, |_, local| {
            assert_eq!(local.items().len(), 2);
            Err::<(), _>("conflict")
        });
        assert!(result.is_err());
        assert_eq!(s, before);
        assert_eq!(s.items()[1].id, Some(2));
    }

    #[test]
    fn test_failed_update_restores_serving() {
        let before = state();
        let mut s = before.clone();
        let update = Transition::UpdateServing {
            id: 3,
            serving: ServingSpec::new(100.0, 3.0),
        };
        assert!(apply_optimistic(&mut s, &update, fail).is_err());
        assert_eq!(s, before);

        apply_optimistic(&mut s, &update, |_, _| Ok::<_, ()>(())).unwrap();
        assert_eq!(s.items()[2].macros.calories, 900.0);
        assert_eq!(s.totals().calories, 100.0 + 100.0 + 900.0);
    }

    #[test]
    fn test_rejected_transition_skips_remote() {
        let mut s = state();
        let mut called = false;
        let result = apply_optimistic(&mut s, &Transition::RemoveItem { id: 99 }, |_, _| {
            called = true;
            Ok::<_, ()>(())
        });
        assert!(matches!(
            result,
            Err(SyncError::Rejected(TransitionError::UnknownItem(99)))
        ));
        assert!(!called);

        let bad = Transition::UpdateServing {
            id: 1,
            serving: ServingSpec::new(0.0, 1.0),
        };
        let before = s.clone();
        assert!(apply_optimistic(&mut s, &bad, |_, _| Ok::<_, ()>(())).is_err());
        assert_eq!(s, before);
    }
}
