//! Small XML helpers shared by the readers and writers

use quick_xml::events::BytesStart;

/// Escape special XML characters
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Get an attribute by its exact qualified name
pub(crate) fn get_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Get an attribute by qualified name, falling back to its local name
/// under any prefix (e.g. `r:id` also matches `rel:id`)
pub(crate) fn get_attr_with_ns(e: &BytesStart, name: &[u8]) -> Option<String> {
    let local = match name.iter().position(|&b| b == b':') {
        Some(i) => &name[i + 1..],
        None => name,
    };
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name || a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// True for `w:val` values that switch a toggle property off
pub(crate) fn is_off(e: &BytesStart) -> bool {
    matches!(
        get_attr(e, b"w:val").as_deref(),
        Some("0") | Some("false") | Some("none")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape_xml("it's"), "it&apos;s");
    }

    #[test]
    fn test_attr_lookup() {
        let e = BytesStart::from_content(r#"w:hyperlink r:id="rId4" w:anchor="intro""#, 11);
        assert_eq!(get_attr(&e, b"r:id").as_deref(), Some("rId4"));
        assert_eq!(get_attr_with_ns(&e, b"w:anchor").as_deref(), Some("intro"));
        assert_eq!(get_attr(&e, b"w:val"), None);
    }
}
