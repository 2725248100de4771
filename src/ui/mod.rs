pub mod gallery_view;
pub mod keybindings;
pub mod lightbox_view;
pub mod window;

pub use window::MainWindow;
