/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use crate::cookies::HttpCookie;
use cookie::time::{Duration, OffsetDateTime};
use parking_lot::Mutex;
use std::net::IpAddr;
use tracing::{debug, trace};
use url::Url;

/// A cookie together with its absolute expiration date.
#[derive(Debug, Clone)]
struct StoredCookie {
    data: HttpCookie,
    /// `None` when the cookie never expires by time (session cookies, overflowing max ages).
    expiration: Option<OffsetDateTime>,
}

impl StoredCookie {
    fn new(cookie: &HttpCookie, now: OffsetDateTime) -> Self {
        let secs = cookie.max_age();
        let expiration = if cookie.is_session_cookie() {
            None
        } else if secs == 0 {
            // earliest representable time (RFC 6265 section 5.2.2)
            Some(OffsetDateTime::UNIX_EPOCH)
        } else {
            now.checked_add(Duration::seconds(secs))
        };
        Self {
            data: cookie.clone(),
            expiration,
        }
    }

    fn is_expired(&self, now: OffsetDateTime) -> bool {
        !self.data.is_session_cookie() && self.expiration.is_some_and(|date| date < now)
    }
}

/// Returns true if `reference` (a cookie path) covers the request `path`.
fn is_parent_path(path: &str, reference: &str) -> bool {
    if (path.is_empty() && reference == "/") || path.starts_with(reference) {
        // The cookie-path and the request-path are identical.
        if path.len() == reference.len() {
            return true;
        }
        // The cookie-path is a prefix of the request-path, and the last
        // character of the cookie-path is "/".
        if reference.ends_with('/') {
            return true;
        }
        // The first character of the request-path that is not included in the
        // cookie-path is a "/" character.
        if path.as_bytes().get(reference.len()) == Some(&b'/') {
            return true;
        }
    }
    false
}

/// Returns true if `reference` is `domain` itself or, when it starts with a dot, one of
/// its parent domains.
fn is_parent_domain(domain: &str, reference: &str) -> bool {
    match reference.strip_prefix('.') {
        None => domain == reference,
        Some(bare) => domain.ends_with(reference) || domain == bare,
    }
}

/// Minimal stand-in for a public suffix lookup: single-label domains are rejected.
fn is_effective_tld(domain: &str) -> bool {
    !domain.contains('.')
}

fn is_ip_address(host: &str) -> bool {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok()
}

fn strip_leading_dot(domain: &str) -> &str {
    domain.strip_prefix('.').unwrap_or(domain)
}

fn is_encrypted(url: &Url) -> bool {
    matches!(url.scheme(), "https" | "wss")
}

fn validate_cookie(cookie: &HttpCookie, url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let domain = cookie.domain();
    if !is_parent_domain(domain, host) && !is_parent_domain(host, domain) {
        return false;
    }

    let domain = strip_leading_dot(domain);
    // A domain identical to the canonicalized request host is always accepted
    // (RFC 6265 section 5.3 step 5).
    if host == domain {
        return true;
    }
    !is_effective_tld(domain)
}

fn normalize(cookie: &mut HttpCookie, url: &Url) {
    if cookie.path().is_empty() {
        let path = url.path();
        let default_path = match path.rfind('/') {
            Some(i) => &path[..=i],
            None => "",
        };
        cookie.set_path(if default_path.is_empty() {
            "/"
        } else {
            default_path
        });
    }

    if cookie.domain().is_empty() {
        cookie.set_domain(url.host_str().unwrap_or_default());
    } else if !is_ip_address(cookie.domain()) && !cookie.domain().starts_with('.') {
        // Servers often forget the leading dot; browsers accept the cookie anyway.
        let dotted = format!(".{}", cookie.domain());
        cookie.set_domain(dotted);
    }
}

fn delete_in(cookies: &mut Vec<StoredCookie>, cookie: &HttpCookie) -> bool {
    match cookies
        .iter()
        .position(|c| c.data.has_same_identifier(cookie))
    {
        Some(index) => {
            cookies.remove(index);
            true
        }
        None => false,
    }
}

fn insert_in(cookies: &mut Vec<StoredCookie>, cookie: &HttpCookie) -> bool {
    let now = OffsetDateTime::now_utc();
    let stored = StoredCookie::new(cookie, now);
    let is_deletion = stored.is_expired(now);

    delete_in(cookies, cookie);

    if is_deletion {
        trace!("Cookie {} expired on arrival, deleted", cookie.name());
        return false;
    }
    cookies.push(stored);
    true
}

/// Thread-safe cookie store shared by all transports.
///
/// Cookies are identified by `(name, domain, path)`: storing a cookie replaces any other
/// with the same identity, and storing an already expired one deletes it. Expired cookies
/// are not swept, they are only filtered out by [`CookieJar::cookies_for_url`].
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<Vec<StoredCookie>>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cookies to be sent with a request to `url`, the most specific paths
    /// first (cookies with equally long paths keep their insertion order).
    pub fn cookies_for_url(&self, url: &Url) -> Vec<HttpCookie> {
        let Some(host) = url.host_str() else {
            return Vec::new();
        };
        let now = OffsetDateTime::now_utc();
        let encrypted = is_encrypted(url);

        let mut result: Vec<HttpCookie> = self
            .cookies
            .lock()
            .iter()
            .filter(|c| encrypted || !c.data.is_secure())
            .filter(|c| !c.is_expired(now))
            .filter(|c| is_parent_domain(host, c.data.domain()))
            .filter(|c| is_parent_path(url.path(), c.data.path()))
            .filter(|c| {
                let domain = strip_leading_dot(c.data.domain());
                domain.contains('.') || host == domain
            })
            .map(|c| c.data.clone())
            .collect();

        result.sort_by(|a, b| b.path().len().cmp(&a.path().len()));
        result
    }

    /// The value of the `Cookie` header for a request to `url`, if any cookie applies.
    pub fn cookie_header_for_url(&self, url: &Url) -> Option<String> {
        let cookies = self.cookies_for_url(url);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(HttpCookie::to_request_pair)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Stores the cookies received in a response from `url`.
    ///
    /// Each cookie is normalized (default path and domain taken from the URL, leading dot
    /// added to an explicit domain) and validated against the URL host. Returns true if at
    /// least one cookie was added; deletions do not count.
    pub fn set_cookies_from_url(&self, url: &Url, cookies: &[HttpCookie]) -> bool {
        let mut stored = self.cookies.lock();
        let mut added = false;
        for cookie in cookies {
            let mut cookie = cookie.clone();
            normalize(&mut cookie, url);
            if !validate_cookie(&cookie, url) {
                debug!("Rejected cookie {} from {}", cookie, url);
                continue;
            }
            if insert_in(&mut stored, &cookie) {
                added = true;
            }
        }
        added
    }

    /// Parses raw `Set-Cookie` header values and stores them as received from `url`.
    /// Unparsable values are skipped.
    pub fn set_cookies_from_headers<'a, I>(&self, url: &Url, headers: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let cookies: Vec<HttpCookie> = headers.into_iter().filter_map(HttpCookie::parse).collect();
        if cookies.is_empty() {
            return false;
        }
        debug!("Harvested {} cookie(s) from {}", cookies.len(), url);
        self.set_cookies_from_url(url, &cookies)
    }

    /// Inserts `cookie` as is, replacing any cookie with the same identity.
    ///
    /// Returns false (after deleting the old one) if the cookie is already expired.
    pub fn insert_cookie(&self, cookie: &HttpCookie) -> bool {
        insert_in(&mut self.cookies.lock(), cookie)
    }

    /// Replaces an existing cookie. Returns false if none had the same identity.
    pub fn update_cookie(&self, cookie: &HttpCookie) -> bool {
        let mut stored = self.cookies.lock();
        if delete_in(&mut stored, cookie) {
            return insert_in(&mut stored, cookie);
        }
        false
    }

    /// Removes the cookie with the same identity. Returns true if one was removed.
    pub fn delete_cookie(&self, cookie: &HttpCookie) -> bool {
        delete_in(&mut self.cookies.lock(), cookie)
    }

    /// Removes every cookie.
    pub fn clear_all_cookies(&self) {
        self.cookies.lock().clear();
    }

    /// Number of stored cookies, expired ones included.
    pub fn len(&self) -> usize {
        self.cookies.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn rendered(cookies: &[HttpCookie]) -> Vec<String> {
        cookies.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_is_parent_path() {
        assert!(is_parent_path("/", "/"));
        assert!(is_parent_path("", "/"));
        assert!(is_parent_path("/foo", "/foo"));
        assert!(is_parent_path("/foo/bar", "/foo"));
        assert!(is_parent_path("/foo/bar", "/foo/"));
        assert!(!is_parent_path("/foobar", "/foo"));
        assert!(!is_parent_path("/", "/foo"));
    }

    #[test]
    fn test_is_parent_domain() {
        assert!(is_parent_domain("acme.com", "acme.com"));
        assert!(!is_parent_domain("www.acme.com", "acme.com"));
        assert!(is_parent_domain("www.acme.com", ".acme.com"));
        assert!(is_parent_domain("acme.com", ".acme.com"));
        assert!(!is_parent_domain("notacme.com", ".acme.com"));
    }

    #[test]
    fn test_add_cookies() {
        let jar = CookieJar::new();
        let url1 = url("http://acme.com");
        let url2 = url("http://foo.bar");
        jar.set_cookies_from_url(&url1, &[HttpCookie::new("n1", "v1")]);
        jar.set_cookies_from_url(&url2, &[HttpCookie::new("n2", "v2")]);
        assert_eq!(
            rendered(&jar.cookies_for_url(&url1)),
            vec!["n1=v1; domain=acme.com; path=/"]
        );
        assert_eq!(
            rendered(&jar.cookies_for_url(&url2)),
            vec!["n2=v2; domain=foo.bar; path=/"]
        );
    }

    #[test]
    fn test_delete_cookies_with_zero_max_age() {
        let jar = CookieJar::new();
        let u = url("http://acme.com");
        let mut c1 = HttpCookie::new("n1", "v1");
        assert!(jar.set_cookies_from_url(&u, &[c1.clone()]));
        assert_eq!(jar.cookies_for_url(&u).len(), 1);

        c1.set_max_age(0);
        assert!(!jar.set_cookies_from_url(&u, &[c1]));
        assert!(jar.cookies_for_url(&u).is_empty());
        assert!(jar.is_empty());
    }

    #[test]
    fn test_secure_cookies() {
        let jar = CookieJar::new();
        let url1 = url("http://acme.com");
        let url2 = url("https://acme.com");
        let c1 = HttpCookie::new("n1", "v1");
        let mut c2 = HttpCookie::new("n2", "v2");
        c2.set_secure(true);
        jar.set_cookies_from_url(&url1, &[c1, c2]);
        assert_eq!(
            rendered(&jar.cookies_for_url(&url1)),
            vec!["n1=v1; domain=acme.com; path=/"]
        );
        assert_eq!(
            rendered(&jar.cookies_for_url(&url2)),
            vec![
                "n1=v1; domain=acme.com; path=/",
                "n2=v2; domain=acme.com; path=/; secure"
            ]
        );
    }

    #[test]
    fn test_cookie_domain() {
        let jar = CookieJar::new();
        let mut c1 = HttpCookie::new("n1", "v1");
        c1.set_domain("acme.com");
        let mut c2 = HttpCookie::new("n2", "v2");
        c2.set_domain("sub.acme.com");
        jar.set_cookies_from_url(&url("http://sub.acme.com"), &[c1, c2]);

        assert_eq!(
            rendered(&jar.cookies_for_url(&url("http://acme.com"))),
            vec!["n1=v1; domain=.acme.com; path=/"]
        );
        let both = vec![
            "n1=v1; domain=.acme.com; path=/",
            "n2=v2; domain=.sub.acme.com; path=/",
        ];
        assert_eq!(
            rendered(&jar.cookies_for_url(&url("http://sub.acme.com"))),
            both
        );
        assert_eq!(
            rendered(&jar.cookies_for_url(&url("http://www.sub.acme.com"))),
            both
        );
    }

    #[test]
    fn test_cookie_path() {
        let jar = CookieJar::new();
        let mut c1 = HttpCookie::new("n1", "v1");
        c1.set_path("/");
        let mut c2 = HttpCookie::new("n2", "v2");
        c2.set_path("/foo");
        jar.set_cookies_from_url(&url("http://acme.com/foo"), &[c1, c2]);

        assert_eq!(
            rendered(&jar.cookies_for_url(&url("http://acme.com"))),
            vec!["n1=v1; domain=acme.com; path=/"]
        );
        let both = vec![
            "n2=v2; domain=acme.com; path=/foo",
            "n1=v1; domain=acme.com; path=/",
        ];
        assert_eq!(
            rendered(&jar.cookies_for_url(&url("http://acme.com/foo"))),
            both
        );
        assert_eq!(
            rendered(&jar.cookies_for_url(&url("http://acme.com/foo/bar"))),
            both
        );
    }

    #[test]
    fn test_default_path_is_url_directory() {
        let jar = CookieJar::new();
        jar.set_cookies_from_url(
            &url("http://acme.com/lightstreamer/create_session.txt"),
            &[HttpCookie::new("n", "v")],
        );
        let cookies = jar.cookies_for_url(&url("http://acme.com/lightstreamer/bind_session.txt"));
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].path(), "/lightstreamer/");
        assert!(jar.cookies_for_url(&url("http://acme.com/other")).is_empty());
    }

    #[test]
    fn test_cookie_expiration_date() {
        let jar = CookieJar::new();
        let u = url("http://acme.com");
        let mut c1 = HttpCookie::new("n1", "v1");
        c1.set_max_age(0);
        let mut c2 = HttpCookie::new("n2", "v2");
        c2.set_max_age(1);
        let mut c3 = HttpCookie::new("n3", "v3");
        c3.set_max_age(-1);
        jar.set_cookies_from_url(&u, &[c1, c2, c3]);

        let names: Vec<String> = jar
            .cookies_for_url(&u)
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["n2", "n3"]);

        thread::sleep(std::time::Duration::from_millis(1100));
        let names: Vec<String> = jar
            .cookies_for_url(&u)
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["n3"]);
        // expired cookies are filtered, not swept
        assert_eq!(jar.len(), 2);
    }

    #[test]
    fn test_reject_foreign_domain() {
        let jar = CookieJar::new();
        let mut c = HttpCookie::new("n", "v");
        c.set_domain("evil.com");
        assert!(!jar.set_cookies_from_url(&url("http://acme.com"), &[c]));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_reject_single_label_parent_domain() {
        let jar = CookieJar::new();
        let mut c = HttpCookie::new("n", "v");
        c.set_domain("com");
        assert!(!jar.set_cookies_from_url(&url("http://acme.com"), &[c]));
    }

    #[test]
    fn test_single_label_host_accepted() {
        let jar = CookieJar::new();
        let u = url("http://localhost:8080/");
        assert!(jar.set_cookies_from_url(&u, &[HttpCookie::new("n", "v")]));
        assert_eq!(jar.cookies_for_url(&u).len(), 1);
    }

    #[test]
    fn test_ip_domain_gets_no_leading_dot() {
        let jar = CookieJar::new();
        let u = url("http://127.0.0.1/");
        let mut c = HttpCookie::new("n", "v");
        c.set_domain("127.0.0.1");
        assert!(jar.set_cookies_from_url(&u, &[c]));
        assert_eq!(jar.cookies_for_url(&u)[0].domain(), "127.0.0.1");
    }

    #[test]
    fn test_replace_same_identity() {
        let jar = CookieJar::new();
        let u = url("http://acme.com");
        jar.set_cookies_from_url(&u, &[HttpCookie::new("n", "old")]);
        jar.set_cookies_from_url(&u, &[HttpCookie::new("n", "new")]);
        let cookies = jar.cookies_for_url(&u);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value(), "new");
    }

    #[test]
    fn test_insert_update_delete() {
        let jar = CookieJar::new();
        let mut c = HttpCookie::new("n", "v");
        c.set_domain("acme.com");
        c.set_path("/");

        assert!(!jar.update_cookie(&c));
        assert!(jar.insert_cookie(&c));
        c.set_value("v2");
        assert!(jar.update_cookie(&c));
        assert_eq!(jar.cookies_for_url(&url("http://acme.com"))[0].value(), "v2");
        assert!(jar.delete_cookie(&c));
        assert!(!jar.delete_cookie(&c));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_clear_all_cookies() {
        let jar = CookieJar::new();
        let u = url("http://acme.com");
        jar.set_cookies_from_url(&u, &[HttpCookie::new("a", "1"), HttpCookie::new("b", "2")]);
        assert_eq!(jar.len(), 2);
        jar.clear_all_cookies();
        assert!(jar.cookies_for_url(&u).is_empty());
    }

    #[test]
    fn test_cookie_header_for_url() {
        let jar = CookieJar::new();
        let u = url("http://acme.com/foo");
        assert!(jar.cookie_header_for_url(&u).is_none());
        let mut deep = HttpCookie::new("deep", "1");
        deep.set_path("/foo");
        jar.set_cookies_from_url(&u, &[HttpCookie::new("root", "0"), deep]);
        assert_eq!(
            jar.cookie_header_for_url(&u).as_deref(),
            Some("deep=1; root=0")
        );
    }

    #[test]
    fn test_set_cookies_from_headers() {
        let jar = CookieJar::new();
        let u = url("https://push.acme.com/lightstreamer");
        let added = jar.set_cookies_from_headers(
            &u,
            [
                "AWSALB=abc; Path=/; Domain=acme.com; Secure",
                "broken header",
                "gone=1; Max-Age=0",
            ],
        );
        assert!(added);
        let cookies = jar.cookies_for_url(&u);
        assert_eq!(rendered(&cookies), vec!["AWSALB=abc; domain=.acme.com; path=/; secure"]);
        assert!(jar.cookies_for_url(&url("http://push.acme.com/")).is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let jar = Arc::new(CookieJar::new());
        let u = url("http://acme.com");
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let jar = jar.clone();
                let u = u.clone();
                thread::spawn(move || {
                    for j in 0..50 {
                        jar.set_cookies_from_url(&u, &[HttpCookie::new(format!("n{}", i), j.to_string())]);
                        let _ = jar.cookies_for_url(&u);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(jar.cookies_for_url(&u).len(), 8);
    }
}
