pub mod verify_ctx;
pub mod verify_session;

pub use verify_ctx::VerifyCtx;
pub use verify_session::{FormSettings, VerifySession};
