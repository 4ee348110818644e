pub mod agenda;
pub mod cli;
pub mod commands;
pub mod notes;
