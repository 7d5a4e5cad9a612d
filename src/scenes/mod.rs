//! Built-in scenes.

pub mod empty;
pub mod landing;
pub mod preloader;

pub use empty::EmptyScene;
pub use landing::LandingScene;
pub use preloader::PreloaderScene;

pub const PRELOADER: &str = "preloader";
pub const LANDING: &str = "landing";
pub const EMPTY: &str = "empty";
