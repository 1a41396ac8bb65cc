//! Players, games, challenges and flavor messages a spin draws from.

use crate::error::{
    Error,
    Result,
};
use serde::{
    Deserialize,
    de::DeserializeOwned,
};
use std::{
    collections::BTreeMap,
    fmt,
    fs,
    io,
    path::Path,
};
use tracing::{
    info,
    warn,
};

pub const PLAYERS_FILE: &str = "players.json";
pub const GAMES_FILE: &str = "games.json";
pub const CHALLENGES_FILE: &str = "challenges.json";
pub const MESSAGES_FILE: &str = "messages.json";

#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize)]
#[serde(from = "PlayerRepr")]
pub struct Player(String);

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Rosters are either plain names or `{ "name": ... }` records.
#[derive(Deserialize)]
#[serde(untagged)]
enum PlayerRepr {
    Name(String),
    Record { name: String },
}

impl From<PlayerRepr> for Player {
    fn from(repr: PlayerRepr) -> Self {
        match repr {
            PlayerRepr::Name(name) | PlayerRepr::Record { name } => Player(name),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize)]
#[serde(from = "GameRepr")]
pub struct Game {
    pub name: String,
    pub image: Option<String>,
    pub text: Option<String>,
}

impl Game {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
            text: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GameRepr {
    Name(String),
    Full {
        name: String,
        image: Option<String>,
        text: Option<String>,
    },
}

impl From<GameRepr> for Game {
    fn from(repr: GameRepr) -> Self {
        match repr {
            GameRepr::Name(name) => Game::named(name),
            GameRepr::Full { name, image, text } => Game { name, image, text },
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize)]
pub struct Challenge {
    pub name: String,
    pub text: String,
}

impl Challenge {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Category name to the ordered games filed under it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct GameCatalog {
    categories: BTreeMap<String, Vec<Game>>,
}

impl GameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(
        mut self,
        category: impl Into<String>,
        games: impl IntoIterator<Item = Game>,
    ) -> Self {
        self.categories
            .entry(category.into())
            .or_default()
            .extend(games);
        self
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn games_in(&self, category: &str) -> &[Game] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every game paired with the category it is filed under.
    pub fn entries(&self) -> Vec<(&str, &Game)> {
        self.categories
            .iter()
            .flat_map(|(category, games)| {
                games.iter().map(move |game| (category.as_str(), game))
            })
            .collect()
    }

    pub fn game_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// True when no category holds a game.
    pub fn is_empty(&self) -> bool {
        self.game_count() == 0
    }

    pub fn contains(&self, category: &str, game: &Game) -> bool {
        self.games_in(category).contains(game)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpinPools {
    pub players: Vec<Player>,
    pub games: GameCatalog,
    pub challenges: Vec<Challenge>,
    pub messages: Vec<String>,
}

/// Reads the pool files from `dir`. A missing file leaves that pool empty.
pub fn load_pools(dir: impl AsRef<Path>) -> Result<SpinPools> {
    let dir = dir.as_ref();
    let pools = SpinPools {
        players: read_optional(&dir.join(PLAYERS_FILE))?.unwrap_or_default(),
        games: read_optional(&dir.join(GAMES_FILE))?.unwrap_or_default(),
        challenges: read_optional(&dir.join(CHALLENGES_FILE))?.unwrap_or_default(),
        messages: read_optional(&dir.join(MESSAGES_FILE))?.unwrap_or_default(),
    };
    info!(
        dir = %dir.display(),
        players = pools.players.len(),
        games = pools.games.game_count(),
        challenges = pools.challenges.len(),
        messages = pools.messages.len(),
        "loaded spin pools"
    );
    Ok(pools)
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "pool file missing, using an empty pool");
            return Ok(None);
        }
        Err(e) => return Err(Error::io(path, e)),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| Error::json(path, e))
}

/// A generated roster with a small built-in catalog, for trying the game
/// without data files.
pub fn demo_pools(player_count: usize) -> SpinPools {
    let players = (0..player_count)
        .map(|_| Player::new(fakeit::name::first()))
        .collect();
    let games = GameCatalog::new()
        .with_category(
            "Arcade",
            ["Pong", "Galaga", "Pac-Man"].into_iter().map(Game::named),
        )
        .with_category(
            "Puzzle",
            ["Tetris", "Portal", "Baba Is You"]
                .into_iter()
                .map(Game::named),
        )
        .with_category(
            "Party",
            ["Mario Kart", "Overcooked", "Jackbox"]
                .into_iter()
                .map(Game::named),
        );
    let challenges = vec![
        Challenge::new("Blindfold", "Play the next round without looking."),
        Challenge::new("Off Hand", "Use only your weaker hand."),
        Challenge::new("Silence", "No talking until the round ends."),
        Challenge::new("666", "The curse has chosen. Everyone else picks your game."),
    ];
    let messages = vec![
        "THE CURSE HAS AWAKENED...".to_string(),
        "THE WHEELS TURN IN DARKNESS...".to_string(),
        "Fortune favours the foolish.".to_string(),
        "Something stirs behind the reels.".to_string(),
    ];
    SpinPools {
        players,
        games,
        challenges,
        messages,
    }
}
