pub mod auth;
pub mod misc;
pub mod notes;
pub mod sync;

pub use auth::{handle_login, handle_logout, handle_signup};
pub use misc::handle_completions;
pub use notes::{handle_delete, handle_edit, handle_list, handle_new};
pub use sync::handle_watch;
