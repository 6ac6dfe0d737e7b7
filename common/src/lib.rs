//! Shared configuration model for the lpardiff tools.

pub mod config;
