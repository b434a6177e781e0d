//! Request handlers.

pub mod city;
pub mod health;
pub mod media;
pub mod users;
