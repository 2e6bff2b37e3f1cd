//! User-agent classification.

/// Browser id used for requests that did not come over HTTP.
pub const COMMANDLINE: &str = "commandline";

/// Map a user agent to the browser id used in `browsers.<id>.options`.
///
/// Order matters: Opera and Chrome both claim to be Safari, and old
/// Opera builds claim to be MSIE.
pub fn detect(user_agent: &str) -> Option<String> {
    let ua = user_agent.to_ascii_lowercase();
    let id = if ua == COMMANDLINE {
        COMMANDLINE
    } else if ua.contains("opera") || ua.contains("opr/") {
        "opera"
    } else if ua.contains("msie") || ua.contains("trident/") {
        "msie"
    } else if ua.contains("firefox/") {
        "firefox"
    } else if ua.contains("chrome/") || ua.contains("crios/") {
        "chrome"
    } else if ua.contains("safari/") {
        "safari"
    } else {
        return None;
    };
    Some(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_common_agents() {
        let cases = [
            ("Mozilla/4.0 (compatible; MSIE 6.0; Windows NT 5.1)", Some("msie")),
            ("Mozilla/5.0 (Windows NT 10.0; Trident/7.0; rv:11.0) like Gecko", Some("msie")),
            ("Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0", Some("firefox")),
            ("Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36", Some("chrome")),
            ("Mozilla/5.0 AppleWebKit/537.36 Chrome/120.0 Safari/537.36 OPR/105.0", Some("opera")),
            ("Mozilla/5.0 (Macintosh) AppleWebKit/605.1.15 Version/17.0 Safari/605.1.15", Some("safari")),
            ("Opera/9.80 (Windows NT 6.1; U; en) Presto/2.2.15", Some("opera")),
            ("commandline", Some("commandline")),
            ("curl/8.0", None),
            ("", None),
        ];
        for (ua, expected) in cases {
            assert_eq!(detect(ua).as_deref(), expected, "user agent: {}", ua);
        }
    }
}
