/// Source image cache and sprite sheet loading.
pub mod source;
