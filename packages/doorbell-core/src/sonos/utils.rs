//! Small parsing and formatting helpers shared by the Sonos modules.

use std::time::Duration;

use quick_xml::events::BytesStart;

use crate::protocol_constants::SONOS_HTTP_PORT;

/// Builds the URL of a UPnP endpoint on a speaker.
#[must_use]
pub fn build_sonos_url(ip: &str, path: &str) -> String {
    format!("http://{}:{}{}", ip, SONOS_HTTP_PORT, path)
}

/// Escapes text for inclusion in a SOAP argument element.
#[must_use]
pub fn escape_xml(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

/// Returns the decoded text content of the first `<tag>...</tag>` element.
///
/// SOAP responses from Sonos use unprefixed argument elements, so a plain
/// substring search is enough. Entities are decoded, which turns embedded
/// documents such as `ZoneGroupState` back into parseable XML.
#[must_use]
pub fn extract_xml_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = xml.find(&open)? + open.len();
    let len = xml[start..].find(&close)?;
    Some(html_escape::decode_html_entities(&xml[start..start + len]).into_owned())
}

/// Reads an attribute value from a start tag, decoding entities.
#[must_use]
pub fn get_xml_attr(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .map(|attr| {
            let raw = String::from_utf8_lossy(&attr.value);
            html_escape::decode_html_entities(&raw).into_owned()
        })
}

/// Extracts the host from a device description URL.
///
/// `http://192.168.1.10:1400/xml/device_description.xml` -> `192.168.1.10`
#[must_use]
pub fn extract_ip_from_location(location: &str) -> Option<String> {
    let rest = location
        .strip_prefix("http://")
        .or_else(|| location.strip_prefix("https://"))?;
    let host = rest.split(['/', ':']).next()?;
    (!host.is_empty()).then(|| host.to_string())
}

/// Parses a UPnP `H+:MM:SS` time value.
///
/// Returns `None` for placeholders like `NOT_IMPLEMENTED` or empty strings.
/// Fractional seconds (`0:01:02.500`) are truncated.
#[must_use]
pub fn parse_hms(value: &str) -> Option<Duration> {
    let mut parts = value.trim().split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds_part = parts.next()?;
    if parts.next().is_some() || minutes >= 60 {
        return None;
    }
    let whole_seconds = seconds_part.split('.').next()?;
    let seconds: u64 = whole_seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    Some(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
}

/// Formats a duration as the `H:MM:SS` target Sonos accepts for `Seek`.
#[must_use]
pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}
