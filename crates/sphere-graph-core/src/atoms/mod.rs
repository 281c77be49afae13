//! The immutable atom table and its one-time seeding pass.

pub mod seeder;
pub mod store;

pub use seeder::{AtomSeeder, SeedRow};
pub use store::AtomStore;
