/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/
use serde::Serialize;

/// Encodes a sequence of key/value pairs as an `application/x-www-form-urlencoded` body,
/// ready to be handed to `HttpClient::new`.
///
/// # Examples
///
/// ```
/// use lightstreamer_transport::utils::encode_form;
///
/// let body = encode_form(&[("LS_op2", "create"), ("LS_cid", "a b")]).unwrap();
/// assert_eq!(body, "LS_op2=create&LS_cid=a+b");
/// ```
pub fn encode_form<T: Serialize + ?Sized>(pairs: &T) -> Result<String, serde_urlencoded::ser::Error> {
    serde_urlencoded::to_string(pairs)
}

/// Sets `name` to `value` in an ordered header list, replacing any previous entry with the
/// same name (compared case-insensitively).
pub(crate) fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers
        .iter_mut()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
    {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Looks up a header value by name (case-insensitive).
pub(crate) fn get_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_form_escapes_reserved_chars() {
        let body = encode_form(&[("a", "1&2"), ("b", "x=y")]).unwrap();
        assert_eq!(body, "a=1%262&b=x%3Dy");
    }

    #[test]
    fn test_encode_form_empty() {
        let empty: [(&str, &str); 0] = [];
        assert_eq!(encode_form(&empty).unwrap(), "");
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
        set_header(&mut headers, "content-type", "application/json");
        set_header(&mut headers, "X-Extra", "1");
        assert_eq!(headers.len(), 2);
        assert_eq!(get_header(&headers, "CONTENT-TYPE"), Some("application/json"));
        assert_eq!(get_header(&headers, "x-extra"), Some("1"));
        assert_eq!(get_header(&headers, "missing"), None);
    }
}
