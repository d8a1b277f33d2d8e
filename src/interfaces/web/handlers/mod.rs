pub mod questionnaires;
pub mod system;
pub mod tasks;
