#![deny(warnings)]
pub mod belief;
pub mod error;
pub mod game;
pub mod model;
pub mod select;
pub mod settings;
pub mod store;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "twentyq"
    }

    pub const fn codename() -> &'static str {
        "Twenty Questions"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
