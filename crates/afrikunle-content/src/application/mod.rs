//! Async orchestration over the platform transport and the cache.

pub mod code_runner;
pub mod lesson_loader;
pub mod lesson_service;
pub mod resolver;
