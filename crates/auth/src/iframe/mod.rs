//! Hidden-frame services: session-change monitoring and silent renewal.

mod check_session;
mod host;
mod silent_renew;

pub use check_session::{CheckSessionService, CHECK_SESSION_FRAME_ID};
pub use host::{PostedMessage, RecordingFrameHost};
pub use silent_renew::{SilentRenewService, SILENT_RENEW_FRAME_ID};
