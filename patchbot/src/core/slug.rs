//! Kebab-case identifiers derived from display names.

/// Lowercase `name`, collapsing every run of non-alphanumeric characters into one `-`.
///
/// Leading and trailing separators are dropped: `"  My Cool Ext! "` becomes `my-cool-ext`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_cases_display_names() {
        assert_eq!(slugify("My Cool Ext"), "my-cool-ext");
        assert_eq!(slugify("  My Cool Ext! "), "my-cool-ext");
        assert_eq!(slugify("Catppuccin_Mocha--Theme"), "catppuccin-mocha-theme");
        assert_eq!(slugify("rust"), "rust");
    }

    #[test]
    fn empty_when_nothing_alphanumeric() {
        assert_eq!(slugify("--- !!"), "");
    }
}
