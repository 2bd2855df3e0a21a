//! Immoshift - content backend of the Immoshift marketing site
//!
//! Serves articles, trainings, ebooks and testimonials to the public site,
//! captures ebook leads and lets admins edit content or import LinkedIn
//! posts as articles.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
