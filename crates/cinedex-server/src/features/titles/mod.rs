pub mod commands;
pub mod models;
pub mod queries;
pub mod routes;

pub use commands::{CreateTitleCommand, CreateTitleError};
pub use models::{MovieRecord, MovieResponse};
pub use queries::{
    GetTitleError, GetTitleQuery, ListTitlesError, ListTitlesQuery, ListTitlesResponse,
};
pub use routes::titles_routes;
