mod store;
mod theme;

pub use store::{Profile, ProfileStore};
pub use theme::Theme;
