use std::collections::HashMap;

/// Decodes toast activation arguments of the form `key=value&key=value`.
///
/// Segments without `=`, with an empty key, or whose percent-encoding does
/// not decode to UTF-8 are skipped.
pub fn parse_wns_launch_args(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = urlencoding::decode(key).ok()?;
            let value = urlencoding::decode(value).ok()?;
            (!key.is_empty()).then(|| (key.into_owned(), value.into_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_key_value_pairs() {
        let args = parse_wns_launch_args("action=practice&duration=5");
        assert_eq!(args.len(), 2);
        assert_eq!(args["action"], "practice");
        assert_eq!(args["duration"], "5");
    }

    #[test]
    fn empty_input_is_empty_map() {
        assert!(parse_wns_launch_args("").is_empty());
    }

    #[test]
    fn pairs_without_equals_are_skipped() {
        let args = parse_wns_launch_args("action=stats&garbage&mode=timed");
        assert_eq!(args.len(), 2);
        assert_eq!(args["action"], "stats");
        assert_eq!(args["mode"], "timed");
    }

    #[test]
    fn percent_encoding_is_decoded() {
        let args = parse_wns_launch_args("message=Time%20to%20type%21&a%26b=c%3Dd");
        assert_eq!(args["message"], "Time to type!");
        assert_eq!(args["a&b"], "c=d");
    }

    #[test]
    fn invalid_utf8_escape_skips_only_that_pair() {
        let args = parse_wns_launch_args("bad=%FF&action=settings");
        assert_eq!(args.len(), 1);
        assert_eq!(args["action"], "settings");
    }
}
