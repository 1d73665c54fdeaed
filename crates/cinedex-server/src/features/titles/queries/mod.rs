pub mod compiler;
pub mod get;
pub mod list;

pub use compiler::{
    compile, BindValue, CompileError, CompiledQuery, Page, SortDirection, SortField, SortSpec,
    TitleFilters,
};
pub use get::{GetTitleError, GetTitleQuery};
pub use list::{ListTitlesError, ListTitlesQuery, ListTitlesResponse};
