pub mod conversation;
pub mod session;
pub mod settings;

pub use conversation::{ConversationLog, Turn, GREETING};
pub use session::{ChatSession, ChatState, SessionSummary};
pub use settings::ConnectionSettings;
