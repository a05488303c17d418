pub mod classifier;
pub mod recipes;
pub mod translation;

// Re-export commonly used services
pub use classifier::ClassifierClient;
pub use recipes::RecipeClient;
pub use translation::TranslationClient;

/// Truncate an upstream body for inclusion in error messages and logs
pub(crate) fn snippet(body: &str) -> String {
    const MAX_LEN: usize = 200;
    let trimmed = body.trim();
    if trimmed.len() <= MAX_LEN {
        return trimmed.to_string();
    }
    let mut cut = MAX_LEN;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &trimmed[..cut])
}
