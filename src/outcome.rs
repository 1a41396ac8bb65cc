use crate::{
    catalog::{
        Challenge,
        Game,
        Player,
        SpinPools,
    },
    random::{
        RandomSource,
        pick,
    },
};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PoolKind {
    Players,
    Games,
    Challenges,
}

/// A pool needed for the spin had nothing to pick from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("the {0} pool is empty")]
pub struct EmptyPool(pub PoolKind);

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolKind::Players => "players",
            PoolKind::Games => "games",
            PoolKind::Challenges => "challenges",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SpinOutcome {
    Normal {
        player: Player,
        category: String,
        game: Game,
    },
    Cursed {
        player: Player,
        challenge: Challenge,
    },
}

impl SpinOutcome {
    pub fn player(&self) -> &Player {
        match self {
            SpinOutcome::Normal { player, .. } | SpinOutcome::Cursed { player, .. } => {
                player
            }
        }
    }

    pub fn is_cursed(&self) -> bool {
        matches!(self, SpinOutcome::Cursed { .. })
    }
}

impl fmt::Display for SpinOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinOutcome::Normal {
                player,
                category,
                game,
            } => write!(f, "{player} plays {} ({category})", game.name),
            SpinOutcome::Cursed { player, challenge } => {
                write!(f, "{player} is cursed: {}", challenge.name)
            }
        }
    }
}

/// Picks the concrete result of a spin whose cursed/not branch is already
/// decided.
pub fn resolve(
    cursed: bool,
    pools: &SpinPools,
    rng: &mut impl RandomSource,
) -> Result<SpinOutcome, EmptyPool> {
    let player = pick(&pools.players, rng)
        .ok_or(EmptyPool(PoolKind::Players))?
        .clone();

    if cursed {
        let challenge = pick(&pools.challenges, rng)
            .ok_or(EmptyPool(PoolKind::Challenges))?
            .clone();
        return Ok(SpinOutcome::Cursed { player, challenge });
    }

    let entries = pools.games.entries();
    let (category, game) =
        pick(&entries, rng).ok_or(EmptyPool(PoolKind::Games))?;
    Ok(SpinOutcome::Normal {
        player,
        category: category.to_string(),
        game: (*game).clone(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        catalog::GameCatalog,
        random::RngSource,
        test_helpers::{
            ScriptedSource,
            sample_pools,
        },
    };

    #[test]
    fn resolve__normal_reports_category_of_drawn_game() {
        // given
        let pools = SpinPools {
            players: vec![Player::new("Ann")],
            games: GameCatalog::new()
                .with_category("Arcade", [Game::named("Pong")])
                .with_category("Puzzle", [Game::named("Tetris")]),
            ..SpinPools::default()
        };
        // entries are [Arcade/Pong, Puzzle/Tetris]
        let mut rng = ScriptedSource::new().with_indices([0, 1]);

        // when
        let outcome = resolve(false, &pools, &mut rng).unwrap();

        // then
        let expected = SpinOutcome::Normal {
            player: Player::new("Ann"),
            category: "Puzzle".to_string(),
            game: Game::named("Tetris"),
        };
        assert_eq!(outcome, expected);
    }

    #[test]
    fn resolve__cursed_picks_player_and_challenge() {
        // given
        let pools = sample_pools();
        let mut rng = ScriptedSource::new().with_indices([1, 0]);

        // when
        let outcome = resolve(true, &pools, &mut rng).unwrap();

        // then
        let expected = SpinOutcome::Cursed {
            player: pools.players[1].clone(),
            challenge: pools.challenges[0].clone(),
        };
        assert_eq!(outcome, expected);
    }

    #[test]
    fn resolve__empty_players_fails() {
        // given
        let pools = SpinPools {
            players: Vec::new(),
            ..sample_pools()
        };
        let mut rng = RngSource::seeded(3);

        // when
        let result = resolve(false, &pools, &mut rng);

        // then
        assert!(matches!(result, Err(EmptyPool(PoolKind::Players))));
    }

    #[test]
    fn resolve__cursed_without_challenges_fails() {
        // given
        let pools = SpinPools {
            challenges: Vec::new(),
            ..sample_pools()
        };
        let mut rng = RngSource::seeded(3);

        // when
        let result = resolve(true, &pools, &mut rng);

        // then
        assert!(matches!(
            result,
            Err(EmptyPool(PoolKind::Challenges))
        ));
    }

    #[test]
    fn resolve__normal_never_reports_a_foreign_category() {
        // given
        let pools = sample_pools();
        let mut rng = RngSource::seeded(99);

        for _ in 0..500 {
            // when
            let outcome = resolve(false, &pools, &mut rng).unwrap();

            // then
            match outcome {
                SpinOutcome::Normal { category, game, .. } => {
                    assert!(pools.games.contains(&category, &game));
                }
                SpinOutcome::Cursed { .. } => panic!("expected a normal outcome"),
            }
        }
    }

    #[test]
    fn resolve__duplicate_names_are_kept_apart_by_category() {
        // given
        let pools = SpinPools {
            players: vec![Player::new("Ann"), Player::new("Ann")],
            games: GameCatalog::new()
                .with_category("Arcade", [Game::named("Pong")])
                .with_category("Retro", [Game::named("Pong")]),
            ..SpinPools::default()
        };
        let mut rng = ScriptedSource::new().with_indices([1, 1]);

        // when
        let outcome = resolve(false, &pools, &mut rng).unwrap();

        // then
        match outcome {
            SpinOutcome::Normal { category, .. } => assert_eq!(category, "Retro"),
            SpinOutcome::Cursed { .. } => panic!("expected a normal outcome"),
        }
    }
}
