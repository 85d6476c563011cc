//! SCI (XML over HTTP) device-request documents.
//!
//! Only the `data_service/device_request` exchange is built here; the rest of
//! the SCI grammar is not used by the harness.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::CloudError;

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-z]{2,4});")
            .expect("valid xml entity pattern")
    })
}

/// Decode the five named entities and numeric character references.
/// Anything unrecognised is kept verbatim.
fn xml_unescape(s: &str) -> String {
    entity_regex()
        .replace_all(s, |c: &Captures<'_>| {
            let name = &c[1];
            let decoded = match name {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => numeric_reference(name),
            };
            decoded.map_or_else(|| c[0].to_string(), String::from)
        })
        .into_owned()
}

fn numeric_reference(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

/// Build the `sci_request` body for one device request.
pub fn device_request_body(device_id: &str, target: &str, payload: &str) -> String {
    format!(
        "<sci_request version=\"1.0\">\
<data_service>\
<targets><device id=\"{}\"/></targets>\
<requests><device_request target_name=\"{}\">{}</device_request></requests>\
</data_service>\
</sci_request>",
        xml_escape(device_id),
        xml_escape(target),
        xml_escape(payload)
    )
}

fn reply_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<device_request\b[^>]*>(.*?)</device_request>")
            .expect("valid sci reply pattern")
    })
}

fn error_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<error\b[^>]*>(.*?)</error>").expect("valid sci error pattern")
    })
}

/// Extract the device's reply text from an `sci_reply` document.
///
/// An `<error>` element anywhere in the reply is reported as `Api`.
pub fn parse_device_reply(xml: &str) -> Result<String, CloudError> {
    if let Some(c) = error_regex().captures(xml) {
        let detail = c.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        return Err(CloudError::Api {
            status: None,
            body: xml_unescape(detail),
        });
    }

    reply_regex()
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| xml_unescape(m.as_str().trim()))
        .ok_or_else(|| CloudError::Decode("sci reply without device_request element".to_string()))
}
