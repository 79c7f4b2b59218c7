//! Key translation between the hierarchical and flat namespaces.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Translates keys between the caller's hierarchical namespace
/// (slash-delimited paths) and the engine's flat namespace (dot-delimited
/// subjects).
///
/// Pure and stateless apart from its configuration, which is fixed for the
/// lifetime of the store that owns it. With segment encoding enabled every
/// path segment is base64-wrapped, so segment text containing `.` (dotted
/// IP addresses, version strings) survives the round trip; without it, such
/// segments are re-split on decode.
#[derive(Debug, Clone, Copy)]
pub struct KeyCodec {
    encode_segments: bool,
}

impl KeyCodec {
    /// Creates a codec, optionally base64-encoding each segment.
    #[must_use]
    pub const fn new(encode_segments: bool) -> Self {
        Self { encode_segments }
    }

    /// Translates a hierarchical key into its flat form.
    ///
    /// Splits on `/`, drops empty segments (so repeated, leading, and
    /// trailing separators collapse), optionally encodes each segment, and
    /// joins with `.`. Total on any key; an all-separator key normalizes to
    /// the empty subject.
    #[must_use]
    pub fn normalize(&self, key: &str) -> String {
        let segments: Vec<String> = key
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if self.encode_segments {
                    STANDARD.encode(segment)
                } else {
                    segment.to_string()
                }
            })
            .collect();
        segments.join(".")
    }

    /// Translates a flat key back into its hierarchical form.
    ///
    /// Splits on `.`, reverses the per-segment encoding where enabled, and
    /// joins with `/`. A segment that fails to decode (or decodes to
    /// non-UTF-8) is passed through unmodified rather than failing the
    /// whole key.
    #[must_use]
    pub fn decode(&self, encoded: &str) -> String {
        let segments: Vec<String> = encoded
            .split('.')
            .map(|segment| {
                if self.encode_segments {
                    decode_segment(segment).unwrap_or_else(|| segment.to_string())
                } else {
                    segment.to_string()
                }
            })
            .collect();
        segments.join("/")
    }

    /// Reports whether `key` names something inside `directory`, at any
    /// depth.
    ///
    /// Both arguments are in flat (already normalized) form. Containment is
    /// segment-granular: `key`'s segment sequence must have `directory`'s
    /// as a strict prefix. A shared textual prefix is not containment, and
    /// a directory does not contain itself.
    #[must_use]
    pub fn is_in_directory(&self, directory: &str, key: &str) -> bool {
        let dir_segments: Vec<&str> = directory.split('.').collect();
        let key_segments: Vec<&str> = key.split('.').collect();
        key_segments.len() > dir_segments.len()
            && key_segments[..dir_segments.len()] == dir_segments[..]
    }
}

fn decode_segment(segment: &str) -> Option<String> {
    let bytes = STANDARD.decode(segment).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_joins_segments_with_dots() {
        let codec = KeyCodec::new(false);
        assert_eq!(codec.normalize("a/b/c"), "a.b.c");
        assert_eq!(codec.normalize("a"), "a");
    }

    #[test]
    fn normalize_drops_empty_segments() {
        let codec = KeyCodec::new(false);
        assert_eq!(codec.normalize("/a//b/"), "a.b");
        assert_eq!(codec.normalize("a/"), "a");
        assert_eq!(codec.normalize("///"), "");
    }

    #[test]
    fn normalize_encodes_each_segment() {
        let codec = KeyCodec::new(true);
        assert_eq!(codec.normalize("a"), "YQ==");
        assert_eq!(codec.normalize("a/b/c"), "YQ==.Yg==.Yw==");
    }

    #[test]
    fn decode_reverses_normalize() {
        let codec = KeyCodec::new(false);
        assert_eq!(codec.decode("a.b.c"), "a/b/c");

        let codec = KeyCodec::new(true);
        assert_eq!(codec.decode("YQ=="), "a");
    }

    #[test]
    fn dotted_segments_round_trip_when_encoded() {
        let codec = KeyCodec::new(true);
        let key = "a/b/1.1.1.1";
        assert_eq!(codec.decode(&codec.normalize(key)), key);
    }

    #[test]
    fn dotted_segments_resplit_without_encoding() {
        let codec = KeyCodec::new(false);
        assert_eq!(codec.decode(&codec.normalize("a/b/1.1.1.1")), "a/b/1/1/1/1");
    }

    #[test]
    fn undecodable_segment_passes_through() {
        let codec = KeyCodec::new(true);
        assert_eq!(codec.decode("!not-base64!"), "!not-base64!");
        // A mixed key decodes what it can.
        assert_eq!(codec.decode("YQ==.!not-base64!"), "a/!not-base64!");
    }

    #[test]
    fn containment_is_depth_based_not_textual() {
        let codec = KeyCodec::new(false);
        assert!(!codec.is_in_directory("Dashboard", "DashboardCategory.xyz"));
        assert!(codec.is_in_directory("Dashboard", "Dashboard.xyz"));
    }

    #[test]
    fn containment_holds_at_any_depth() {
        let codec = KeyCodec::new(false);
        assert!(codec.is_in_directory("a", "a.b"));
        assert!(codec.is_in_directory("a", "a.b.c"));
        assert!(codec.is_in_directory("a.b", "a.b.c"));
        assert!(!codec.is_in_directory("a.b", "a.c.d"));
    }

    #[test]
    fn directory_does_not_contain_itself() {
        let codec = KeyCodec::new(false);
        assert!(!codec.is_in_directory("a.b", "a.b"));
    }

    #[test]
    fn containment_works_on_encoded_keys() {
        let codec = KeyCodec::new(true);
        let dir = codec.normalize("app");
        assert!(codec.is_in_directory(&dir, &codec.normalize("app/web")));
        assert!(!codec.is_in_directory(&dir, &codec.normalize("apps/web")));
    }

    proptest! {
        #[test]
        fn round_trip_plain_with_dot_free_segments(
            segments in prop::collection::vec("[A-Za-z0-9_-]{1,12}", 1..6)
        ) {
            let codec = KeyCodec::new(false);
            let key = segments.join("/");
            prop_assert_eq!(codec.decode(&codec.normalize(&key)), key);
        }

        #[test]
        fn round_trip_encoded_with_arbitrary_segments(
            segments in prop::collection::vec("[A-Za-z0-9._:+*= -]{1,12}", 1..6)
        ) {
            let codec = KeyCodec::new(true);
            let key = segments.join("/");
            prop_assert_eq!(codec.decode(&codec.normalize(&key)), key);
        }

        #[test]
        fn normalized_keys_never_have_leading_or_trailing_separator(
            key in "[a-z/]{1,24}"
        ) {
            let codec = KeyCodec::new(false);
            let flat = codec.normalize(&key);
            prop_assert!(!flat.starts_with('.'));
            prop_assert!(!flat.ends_with('.'));
        }
    }
}
