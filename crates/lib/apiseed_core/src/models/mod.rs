//! Domain models shared by the store implementations and the HTTP layer.

pub mod auth;
pub mod city;
pub mod media;
