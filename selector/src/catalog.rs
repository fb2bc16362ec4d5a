//! Static catalog of selectable players.

/// Hosted model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Google,
    Anthropic,
    Mixtral,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Google => "Google",
            Provider::Anthropic => "Anthropic",
            Provider::Mixtral => "Mixtral",
        }
    }
}

/// Search settings for an engine-backed player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub depth: u8,
}

/// How a player produces moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKind {
    /// A hosted model reached over HTTP; needs a credential.
    Service(Provider),
    /// A local UCI engine; no credential.
    Engine(EngineSettings),
}

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    pub model: &'static str,
    pub kind: PlayerKind,
}

impl Player {
    /// Provider label shown to users; "Stockfish" for engine entries.
    pub fn provider_label(&self) -> &'static str {
        match self.kind {
            PlayerKind::Service(provider) => provider.as_str(),
            PlayerKind::Engine(_) => "Stockfish",
        }
    }
}

/// Every selectable player, in display order. Never mutated.
pub const CATALOG: &[Player] = &[
    Player {
        model: "gpt-4o",
        kind: PlayerKind::Service(Provider::OpenAi),
    },
    Player {
        model: "gpt-4o-mini",
        kind: PlayerKind::Service(Provider::OpenAi),
    },
    Player {
        model: "gpt-4-turbo",
        kind: PlayerKind::Service(Provider::OpenAi),
    },
    Player {
        model: "gpt-3.5-turbo-instruct",
        kind: PlayerKind::Service(Provider::OpenAi),
    },
    Player {
        model: "gpt-3.5-turbo",
        kind: PlayerKind::Service(Provider::OpenAi),
    },
    Player {
        model: "pixtral-12b-2409",
        kind: PlayerKind::Service(Provider::Mixtral),
    },
    Player {
        model: "claude-3-5-sonnet-20240620",
        kind: PlayerKind::Service(Provider::Anthropic),
    },
    Player {
        model: "gemini-1.5-flash",
        kind: PlayerKind::Service(Provider::Google),
    },
    Player {
        model: "gemini-1.5-pro",
        kind: PlayerKind::Service(Provider::Google),
    },
    Player {
        model: "Stockfish 16",
        kind: PlayerKind::Engine(EngineSettings { depth: 18 }),
    },
    Player {
        model: "Stockfish 16 (Medium)",
        kind: PlayerKind::Engine(EngineSettings { depth: 8 }),
    },
    Player {
        model: "Stockfish 16 (Easy)",
        kind: PlayerKind::Engine(EngineSettings { depth: 2 }),
    },
];

/// Exact-match lookup by model identifier. No partial matches.
pub fn find_by_model(model: &str) -> Option<&'static Player> {
    CATALOG.iter().find(|p| p.model == model)
}
