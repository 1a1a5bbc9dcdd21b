pub mod collection;
pub mod config;
pub mod error;
pub mod events;
pub mod permission;
pub mod scan;
pub mod slideshow;
pub mod render {
    pub mod loader;
    pub mod viewer;
}
