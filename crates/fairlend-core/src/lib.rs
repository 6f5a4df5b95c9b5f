#![deny(warnings)]
pub mod model;
pub mod population;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "fairlend"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
