pub mod api;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod theme;

// Re-export main types for convenience
pub use api::{GameApi, GameState, GameTurnResult, HttpGameApi, DEFAULT_SERVER_URL};
pub use config::Config;
pub use controller::{BusyFlag, BusyGuard, GameController, Phase};
pub use conversation::{ChatEntry, ConversationLog, Origin};
pub use error::{ClientError, ClientResult};
pub use session::{SavedSessionSummary, SessionClient};
pub use theme::Theme;
