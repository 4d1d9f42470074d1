pub mod normalizer;
pub mod transliterate;

pub use normalizer::{ decode_entities, normalize };
pub use transliterate::{ sanitize_filename, transliterate };
