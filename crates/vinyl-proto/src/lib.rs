pub mod catalog;
pub mod config;
pub mod liked;
pub mod platform;
pub mod protocol;
pub mod recommend;
pub mod state;
pub mod track;
