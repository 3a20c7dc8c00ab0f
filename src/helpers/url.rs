//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left alone inside a path segment
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Generate a URL under the site root
///
/// # Examples
/// ```ignore
/// url_for("/blog/", "/post/hello/") // -> "/blog/post/hello/"
/// ```
pub fn url_for(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Path of a post page
pub fn post_path(root: &str, uid: &str) -> String {
    url_for(root, &format!("post/{}/", encode_segment(uid)))
}

/// Path of the listing after `page` pages have been loaded
pub fn listing_path(root: &str, page: usize) -> String {
    if page <= 1 {
        url_for(root, "")
    } else {
        url_for(root, &format!("page/{}/", page))
    }
}

/// Percent-encode a single path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Whether a slug can be used as a directory name under `post/`
pub fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('.')
        && slug
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
