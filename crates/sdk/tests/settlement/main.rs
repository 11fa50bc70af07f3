/// Mocks and fixtures.
pub mod setup;

mod pipeline;
