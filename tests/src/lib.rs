//! Cross-crate integration tests for the lpardiff workspace.

#[cfg(test)]
mod pipeline;
