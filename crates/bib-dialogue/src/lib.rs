pub mod classify;
pub mod confidence;
pub mod engine;
pub mod enrichment_port;
pub mod error;
pub mod locks;
pub mod metadata;
pub mod wire;

pub use classify::{ExplorationAction, ExplorationClassifier, ExplorationIntent, FixtureExplorationClassifier, HttpExplorationClassifier};
pub use confidence::CONFIDENCE_GATE;
pub use engine::{DialogueEngine, TurnOutcome};
pub use enrichment_port::EnrichmentPort;
pub use error::{DialogueError, Result};
pub use locks::SessionLocks;
