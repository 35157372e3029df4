//! User-facing surfaces. Currently only the HTTP gateway.

pub mod web;
