pub mod config;
pub mod deploy;
pub mod flow;
pub mod lifecycle;
pub mod questionnaire;
pub mod service;
pub mod store;
pub mod task;
pub mod terminal;
