pub mod session;

pub use session::{CurrentSession, SESSION_COOKIE, require_session, session_id_from_headers};
