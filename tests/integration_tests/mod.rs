pub mod support;

mod mod_aggregate;
mod mod_books;
mod mod_config;
mod mod_crud;
mod mod_index;
mod mod_query;
mod mod_storage;
