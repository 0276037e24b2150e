/// Business logic layer
///
/// Each service owns its SQL and exposes the operations route handlers
/// call, taking an already-authenticated viewer identity plus plain
/// parameters.
pub mod channels;
pub mod chats;
pub mod comments;
pub mod dashboard;
pub mod engagement;
pub mod events;
pub mod playlists;
pub mod posts;
pub mod settings;
pub mod videos;
pub mod watch_history;

pub use channels::ChannelService;
pub use chats::ChatService;
pub use comments::CommentService;
pub use dashboard::DashboardService;
pub use engagement::{EngagementService, ToggleOutcome};
pub use events::EventPublisher;
pub use playlists::PlaylistService;
pub use posts::PostService;
pub use settings::SettingsService;
pub use videos::VideoService;
pub use watch_history::WatchHistoryService;
