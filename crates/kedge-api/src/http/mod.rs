//! HTTP/WS handlers, grouped by the resource they act on. Every handler
//! translates its request into a call against `kedge-core`/the engine
//! collaborator and maps the result onto the status codes in
//! [`crate::error`] — no business logic lives here.

mod session;
mod sync;
mod torrents;

pub(crate) mod router;

pub(crate) use session::{session_info, session_stats, toggle_session_pause};
pub(crate) use sync::sync_stats;
pub(crate) use torrents::{
    add_torrent, get_torrent, get_torrent_files, get_torrent_peers, list_torrents, pause_torrent, remove_torrent, remove_torrent_confirmed,
    remove_torrent_with_data, resume_torrent, toggle_torrent, torrent_exists,
};
