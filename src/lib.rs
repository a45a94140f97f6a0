pub mod coefficient;
pub mod config;
pub mod error;
pub mod events;
pub mod grain;
pub mod layout;
pub mod snapshot;
pub mod tasks {
    pub mod loader;
    pub mod viewer;
}
