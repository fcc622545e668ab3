//! Tally metadata wire format.

/// Escape a string for use as a quoted attribute value.
///
/// The ampersand must be escaped first so that escaping one class of
/// character never re-introduces a sequence matching another escape.
pub fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Encode a tally record: one self-closing tagged record carrying the live
/// flag, viewer count, and title as quoted attributes in that fixed order.
pub fn encode_tally(is_live: bool, viewer_count: u64, title: &str) -> String {
    format!(
        "<tally live=\"{}\" viewers=\"{}\" title=\"{}\"/>",
        is_live,
        viewer_count,
        escape_attribute(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inverse of `escape_attribute`, entity-first so `&amp;lt;` does not
    /// collapse twice.
    fn unescape_attribute(value: &str) -> String {
        value
            .replace("&gt;", ">")
            .replace("&lt;", "<")
            .replace("&apos;", "'")
            .replace("&quot;", "\"")
            .replace("&amp;", "&")
    }

    #[test]
    fn escapes_every_special_character() {
        assert_eq!(
            escape_attribute(r#"<a href="x">&'go'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&apos;go&apos;&lt;/a&gt;"
        );
    }

    #[test]
    fn ampersand_first_prevents_double_escaping() {
        // "&lt;" in the input must not survive as a literal entity.
        assert_eq!(escape_attribute("&lt;"), "&amp;lt;");
    }

    #[test]
    fn titles_round_trip_through_escaping() {
        let titles = [
            "Q&A",
            r#"He said "hi""#,
            "a<b>c",
            "'quoted' & <mixed> \"all\"",
            "&amp; already escaped",
            "",
        ];

        for title in titles {
            assert_eq!(unescape_attribute(&escape_attribute(title)), title);
        }
    }

    #[test]
    fn record_has_fixed_attribute_order() {
        assert_eq!(
            encode_tally(true, 42, "Q&A"),
            r#"<tally live="true" viewers="42" title="Q&amp;A"/>"#
        );
    }

    #[test]
    fn record_is_well_formed_for_empty_title_and_zero_count() {
        assert_eq!(
            encode_tally(false, 0, ""),
            r#"<tally live="false" viewers="0" title=""/>"#
        );
    }
}
