pub mod analysis;
pub mod cover_letter;
pub mod posting;
pub mod resume;
