pub type Headers = Vec<(String, String)>;

pub fn header_set(headers: &mut Headers, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    let value = value.into();
    if let Some((_, v)) = headers
        .iter_mut()
        .find(|(k, _)| k.eq_ignore_ascii_case(&name))
    {
        *v = value;
        return;
    }
    headers.push((name, value));
}

pub fn header_get<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub fn header_remove(headers: &mut Headers, name: &str) -> Option<String> {
    let idx = headers.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
    Some(headers.remove(idx).1)
}

/// Response headers for a `data:` framed stream. Length headers copied from
/// the upstream no longer apply and are dropped.
pub fn set_event_stream_headers(headers: &mut Headers) {
    header_remove(headers, "content-length");
    header_remove(headers, "content-encoding");
    header_set(headers, "Content-Type", "text/event-stream");
    header_set(headers, "Cache-Control", "no-cache");
    header_set(headers, "Connection", "keep-alive");
    header_set(headers, "X-Accel-Buffering", "no");
}
