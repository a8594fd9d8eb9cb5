//! Built-in action providers, mainly for driving unattended games.

use crate::engine::build::{ActionKind, ActionProvider, PlayerAction};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Finishes the build phase as fast as the rules allow.
///
/// When a takeover pool blocks finishing, it scraps pool assets until the
/// pool is empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysFinish;

impl ActionProvider for AlwaysFinish {
    fn choose(&mut self, actions: &[PlayerAction]) -> PlayerAction {
        actions
            .iter()
            .copied()
            .find(|a| a.kind == ActionKind::Finished)
            .or_else(|| {
                actions
                    .iter()
                    .copied()
                    .find(|a| a.kind == ActionKind::TakeoverScrapAsset)
            })
            .unwrap_or_else(|| actions[0])
    }
}

/// Picks uniformly among the offered actions.
#[derive(Debug)]
pub struct RandomProvider {
    rng: StdRng,
}

impl RandomProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ActionProvider for RandomProvider {
    fn choose(&mut self, actions: &[PlayerAction]) -> PlayerAction {
        // The engine never offers an empty action list.
        *actions
            .choose(&mut self.rng)
            .expect("choose called with no actions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetCategory;

    fn action(kind: ActionKind) -> PlayerAction {
        PlayerAction {
            kind,
            player: 0,
            category: match kind {
                ActionKind::Finished => None,
                _ => Some(AssetCategory::Fossil),
            },
            cost: 0,
        }
    }

    #[test]
    fn test_always_finish_prefers_finished() {
        let actions = vec![
            action(ActionKind::BuildAsset),
            action(ActionKind::Finished),
        ];
        assert_eq!(
            AlwaysFinish.choose(&actions).kind,
            ActionKind::Finished
        );
    }

    #[test]
    fn test_always_finish_clears_blocking_pool() {
        let actions = vec![
            action(ActionKind::BuildAsset),
            action(ActionKind::TakeoverAsset),
            action(ActionKind::TakeoverScrapAsset),
        ];
        assert_eq!(
            AlwaysFinish.choose(&actions).kind,
            ActionKind::TakeoverScrapAsset
        );
    }

    #[test]
    fn test_random_provider_is_seeded() {
        let actions: Vec<PlayerAction> = [
            ActionKind::BuildAsset,
            ActionKind::ScrapAsset,
            ActionKind::PledgeCapacity,
            ActionKind::Finished,
        ]
        .into_iter()
        .map(action)
        .collect();

        let mut a = RandomProvider::new(3);
        let mut b = RandomProvider::new(3);
        for _ in 0..20 {
            assert_eq!(a.choose(&actions), b.choose(&actions));
        }
    }

    #[test]
    fn test_random_provider_stays_within_offered_set() {
        let actions = vec![action(ActionKind::BuildAsset), action(ActionKind::Finished)];
        let mut p = RandomProvider::new(0);
        for _ in 0..50 {
            assert!(actions.contains(&p.choose(&actions)));
        }
    }
}
