//! Table definitions for the reflex store.
//!
//! List-valued attributes (`tags`, `connections`) are stored as JSON arrays.

pub mod notes;
pub mod patterns;
pub mod spaces;

pub mod prelude {
    pub use super::notes::Entity as Notes;
    pub use super::patterns::Entity as Patterns;
    pub use super::spaces::Entity as Spaces;
}
