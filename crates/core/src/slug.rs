//! City slugs: normalised, URL-safe locality identifiers.

/// Convert a locality name into a city slug.
///
/// Lower-cases, maps every run of non-alphanumeric characters to a single
/// `-`, and trims leading/trailing separators. Returns `None` when nothing
/// alphanumeric remains.
///
/// ```
/// use portal_core::slug::city_slug;
/// assert_eq!(city_slug("Newcastle upon Tyne").as_deref(), Some("newcastle-upon-tyne"));
/// assert_eq!(city_slug("  St. Albans ").as_deref(), Some("st-albans"));
/// assert_eq!(city_slug(" -- "), None);
/// ```
pub fn city_slug(name: &str) -> Option<String> {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c == '\'' || c == '\u{2019}' {
            // Apostrophes vanish: "King's Lynn" -> "kings-lynn".
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// Return the first candidate that yields a slug.
///
/// Used for the city-slug priority chains, where each candidate is an
/// optional raw name in decreasing order of preference.
pub fn first_slug<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates.into_iter().flatten().find_map(city_slug)
}
