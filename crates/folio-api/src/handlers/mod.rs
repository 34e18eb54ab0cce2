//! API handlers

pub mod articles;
pub mod auth;
pub mod categories;
pub mod dto;
pub mod frontend;
pub mod health;
pub mod pages;
pub mod password;
pub mod users;
