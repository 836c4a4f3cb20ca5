pub mod app;
pub mod binder;
pub mod cli;
pub mod config;
pub mod listing;
pub mod output;
pub mod pages;
pub mod preferences;

#[cfg(test)]
mod tests;
