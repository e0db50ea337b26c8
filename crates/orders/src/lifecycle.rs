//! Stage transition function.
//!
//! Given the current `(stage, status)` and a requested status, decides the next
//! state and whether the order closes. Pure; the `Order` aggregate wraps it with the
//! closed-order guard.

use crate::stage::{Stage, StageState, StageStatus};

/// Result of applying a requested status to a stage state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: StageState,
    pub closes: bool,
}

/// Compute the transition for `requested` on top of `current`.
///
/// Callers must not pass a state whose status is `Error`: such orders are already
/// closed. For completeness it is treated like a terminal state and left as-is.
pub fn advance(current: StageState, requested: StageStatus) -> Transition {
    let StageState { stage, status } = current;
    let in_transit = matches!(stage, Stage::Processing | Stage::Shipped);

    match status {
        StageStatus::Success => match requested {
            StageStatus::Warning if in_transit => Transition {
                next: StageState::new(Stage::Shipped, StageStatus::Warning),
                closes: false,
            },
            StageStatus::Error if in_transit => Transition {
                next: StageState::new(stage.next(), StageStatus::Error),
                closes: true,
            },
            _ => {
                let next = stage.next();
                Transition {
                    next: StageState::new(next, requested),
                    closes: requested == StageStatus::Error || next == Stage::Success,
                }
            }
        },
        StageStatus::Warning => match requested {
            StageStatus::Error => Transition {
                next: StageState::new(stage.next(), StageStatus::Error),
                closes: true,
            },
            _ if stage == Stage::Shipped => Transition {
                next: StageState::new(Stage::Success, requested),
                closes: true,
            },
            _ => Transition {
                next: StageState::new(stage, requested),
                closes: false,
            },
        },
        StageStatus::Error => Transition {
            next: current,
            closes: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(stage: Stage, status: StageStatus) -> StageState {
        StageState::new(stage, status)
    }

    #[test]
    fn error_on_new_order_moves_to_confirmed_and_closes() {
        let t = advance(StageState::initial(), StageStatus::Error);
        assert_eq!(t.next, state(Stage::Confirmed, StageStatus::Error));
        assert!(t.closes);
    }

    #[test]
    fn success_steps_one_stage_forward() {
        let t = advance(StageState::initial(), StageStatus::Success);
        assert_eq!(t.next, state(Stage::Confirmed, StageStatus::Success));
        assert!(!t.closes);

        let t = advance(state(Stage::Processing, StageStatus::Success), StageStatus::Success);
        assert_eq!(t.next, state(Stage::Shipped, StageStatus::Success));
        assert!(!t.closes);
    }

    #[test]
    fn success_into_final_stage_closes() {
        let t = advance(state(Stage::Shipped, StageStatus::Success), StageStatus::Success);
        assert_eq!(t.next, state(Stage::Success, StageStatus::Success));
        assert!(t.closes);
    }

    #[test]
    fn warning_in_transit_parks_on_shipped() {
        let t = advance(state(Stage::Processing, StageStatus::Success), StageStatus::Warning);
        assert_eq!(t.next, state(Stage::Shipped, StageStatus::Warning));
        assert!(!t.closes);

        let t = advance(state(Stage::Shipped, StageStatus::Success), StageStatus::Warning);
        assert_eq!(t.next, state(Stage::Shipped, StageStatus::Warning));
        assert!(!t.closes);
    }

    #[test]
    fn warning_before_transit_advances_with_overlay() {
        let t = advance(state(Stage::Confirmed, StageStatus::Success), StageStatus::Warning);
        assert_eq!(t.next, state(Stage::Processing, StageStatus::Warning));
        assert!(!t.closes);
    }

    #[test]
    fn error_in_transit_closes_one_stage_later() {
        let t = advance(state(Stage::Processing, StageStatus::Success), StageStatus::Error);
        assert_eq!(t.next, state(Stage::Shipped, StageStatus::Error));
        assert!(t.closes);
    }

    #[test]
    fn shipped_warning_resolves_to_success_and_closes() {
        let t = advance(state(Stage::Shipped, StageStatus::Warning), StageStatus::Success);
        assert_eq!(t.next, state(Stage::Success, StageStatus::Success));
        assert!(t.closes);
    }

    #[test]
    fn shipped_warning_with_another_warning_still_closes() {
        let t = advance(state(Stage::Shipped, StageStatus::Warning), StageStatus::Warning);
        assert_eq!(t.next, state(Stage::Success, StageStatus::Warning));
        assert!(t.closes);
    }

    #[test]
    fn warning_outside_shipped_only_overwrites_status() {
        let t = advance(state(Stage::Processing, StageStatus::Warning), StageStatus::Success);
        assert_eq!(t.next, state(Stage::Processing, StageStatus::Success));
        assert!(!t.closes);
    }

    #[test]
    fn error_on_warning_advances_and_closes() {
        let t = advance(state(Stage::Shipped, StageStatus::Warning), StageStatus::Error);
        assert_eq!(t.next, state(Stage::Success, StageStatus::Error));
        assert!(t.closes);
    }

    #[test]
    fn four_success_signals_fulfil_a_new_order() {
        let mut state = StageState::initial();
        for _ in 0..3 {
            let t = advance(state, StageStatus::Success);
            assert!(!t.closes);
            state = t.next;
        }
        let t = advance(state, StageStatus::Success);
        assert!(t.closes);
        assert!(t.next.is_fulfilled());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_stage() -> impl Strategy<Value = Stage> {
            prop_oneof![
                Just(Stage::New),
                Just(Stage::Confirmed),
                Just(Stage::Processing),
                Just(Stage::Shipped),
                Just(Stage::Success),
            ]
        }

        fn any_status() -> impl Strategy<Value = StageStatus> {
            prop_oneof![
                Just(StageStatus::Success),
                Just(StageStatus::Warning),
                Just(StageStatus::Error),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

            /// Property: stages never move backwards.
            #[test]
            fn stage_is_monotonic(
                stage in any_stage(),
                status in prop_oneof![Just(StageStatus::Success), Just(StageStatus::Warning)],
                requested in any_status(),
            ) {
                let t = advance(StageState::new(stage, status), requested);
                prop_assert!(t.next.stage >= stage);
            }

            /// Property: requesting an error always closes the order with an error overlay.
            #[test]
            fn error_request_always_closes(
                stage in any_stage(),
                status in prop_oneof![Just(StageStatus::Success), Just(StageStatus::Warning)],
            ) {
                let t = advance(StageState::new(stage, status), StageStatus::Error);
                prop_assert!(t.closes);
                prop_assert_eq!(t.next.status, StageStatus::Error);
            }
        }
    }
}
