//! End-to-end integration suite: builds real unit trees on disk and drives
//! the resolve/compose pipeline through the public API.

mod common;
mod composition;
mod resolution;
