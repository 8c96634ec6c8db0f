//! Core library for Smart Notes: domain models and the document database.

pub mod db;
pub mod models;
