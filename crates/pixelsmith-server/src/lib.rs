//! Pixelsmith Server - HTTP front end for the transform pipeline
//!
//! Exposes `POST /api/process`, which accepts a multipart upload and returns
//! the transformed image bytes.

pub mod config;
pub mod http;
