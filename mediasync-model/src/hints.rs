//! Playback hint keys.
//!
//! Hints are opaque to the sync engine except for validation; the player
//! later turns them into stream URLs or file downloads. Keys are namespaced
//! by source so items from different providers never collide.

/// Keys written by the Telegram chat scanner.
pub mod telegram {
    pub const CHAT_ID: &str = "telegram.chatId";
    pub const MESSAGE_ID: &str = "telegram.messageId";
    pub const REMOTE_ID: &str = "telegram.remoteId";
    pub const FILE_ID: &str = "telegram.fileId";
}

/// Keys written by the Xtream catalog client.
pub mod xtream {
    pub const CONTENT_TYPE: &str = "xtream.contentType";
    pub const VOD_ID: &str = "xtream.vodId";
    pub const SERIES_ID: &str = "xtream.seriesId";
    pub const SEASON: &str = "xtream.season";
    pub const EPISODE: &str = "xtream.episode";
    pub const EPISODE_ID: &str = "xtream.episodeId";
    pub const STREAM_ID: &str = "xtream.streamId";
    pub const CONTAINER_EXTENSION: &str = "xtream.containerExtension";

    /// Values carried under [`CONTENT_TYPE`].
    pub const CONTENT_VOD: &str = "vod";
    pub const CONTENT_SERIES: &str = "series";
    pub const CONTENT_EPISODE: &str = "episode";
    pub const CONTENT_LIVE: &str = "live";
}
