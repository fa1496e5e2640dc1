pub mod benchmark;
pub mod fallback;
pub mod fuzzy_index;
pub mod hierarchical;
pub mod index;
pub mod manager;
pub mod normalize;
pub mod registry;
pub mod similarity;
