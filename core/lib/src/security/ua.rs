//! User-Agent vulnerability classification.
//!
//! Pinned rule set: any "Opera" token (including "Opera Mini") is
//! vulnerable; Safari `<= 5.x` is vulnerable, `>= 6` is not; Firefox `< 23`
//! is vulnerable, `>= 23` is not; everything else, including any UA
//! containing "Chrome", is not vulnerable.

/// Returns `true` if `user_agent` is known to mishandle cross-origin
/// requests in a way that defeats this engine's CSRF protections (a known
/// "safelisted headers" or preflight-skipping bug in the named browser).
pub fn is_vulnerable(user_agent: &str) -> bool {
    if user_agent.contains("Opera") {
        return true;
    }

    // A UA containing "Chrome" is never flagged, even though some embed
    // "Safari" in their UA string for compatibility — check Chrome first.
    if user_agent.contains("Chrome") {
        return false;
    }

    if let Some(version) = extract_version(user_agent, "Version/") {
        if user_agent.contains("Safari") {
            return major(&version) <= 5;
        }
    }

    if let Some(version) = extract_version(user_agent, "Firefox/") {
        return major(&version) < 23;
    }

    false
}

fn extract_version<'a>(ua: &'a str, marker: &str) -> Option<&'a str> {
    let start = ua.find(marker)? + marker.len();
    let rest = &ua[start..];
    let end = rest.find(|c: char| !c.is_ascii_digit() && c != '.').unwrap_or(rest.len());
    Some(&rest[..end])
}

fn major(version: &str) -> u32 {
    version.split('.').next().and_then(|s| s.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opera_mini_is_vulnerable() {
        assert!(is_vulnerable("Opera Mini"));
        assert!(is_vulnerable("Opera/9.80 (Android; Opera Mini/7.6.40234"));
    }

    #[test]
    fn modern_chrome_is_safe() {
        let ua = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
            (KHTML, like Gecko) Chrome/104.0.0.0 Safari/537.36";
        assert!(!is_vulnerable(ua));
    }

    #[test]
    fn old_safari_is_vulnerable_new_is_not() {
        let old = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_6_8) AppleWebKit/534.57.2 \
            (KHTML, like Gecko) Version/5.1.7 Safari/534.57.2";
        assert!(is_vulnerable(old));

        let new = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
            (KHTML, like Gecko) Version/16.1 Safari/605.1.15";
        assert!(!is_vulnerable(new));
    }

    #[test]
    fn old_firefox_is_vulnerable_new_is_not() {
        assert!(is_vulnerable("Mozilla/5.0 (Windows NT 6.1; rv:22.0) Gecko/20100101 Firefox/22.0"));
        assert!(!is_vulnerable("Mozilla/5.0 (Windows NT 10.0; rv:118.0) Gecko/20100101 Firefox/118.0"));
    }
}
