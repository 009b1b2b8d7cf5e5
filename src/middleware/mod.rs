pub mod gate;

pub use gate::{cookie_value, gate_middleware, SESSION_COOKIE_NAME};
