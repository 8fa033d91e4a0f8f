//! URL slugs for products and categories.

/// Derive a URL slug from a display name.
///
/// Lowercases, collapses each run of whitespace into a single `-`, then drops
/// anything outside `[a-z0-9-]`.
///
/// ```
/// use urban_style_core::slugify;
///
/// assert_eq!(slugify("Oversized Tee  Black"), "oversized-tee-black");
/// assert_eq!(slugify("Hoodie (Limited!)"), "hoodie-limited");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut in_whitespace = false;

    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            slug.push(ch);
        }
    }

    slug
}

/// Whether `slug` is already in canonical form.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Kaos Polos"), "kaos-polos");
        assert_eq!(slugify("  Cargo   Pants "), "cargo-pants");
    }

    #[test]
    fn test_slugify_strips_symbols() {
        assert_eq!(slugify("T-Shirt & Co."), "t-shirt--co");
        assert_eq!(slugify("Jaket Bomber 2.0"), "jaket-bomber-20");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("Café Crème"), "caf-crme");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("oversized-tee"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Oversized Tee"));
    }
}
