//! Built-in beans.

pub mod folder;
pub mod timer;

pub use folder::Folder;
pub use timer::Timer;
