pub mod create;

pub use create::{CreateTitleCommand, CreateTitleError};
