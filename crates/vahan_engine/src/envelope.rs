//! Partial-response envelope: the XML wrapper around named HTML fragments
//! returned by every AJAX exchange.
//!
//! ```xml
//! <partial-response>
//!   <changes>
//!     <update id="groupingTable"><![CDATA[<table>...</table>]]></update>
//!     <update id="j_id1:javax.faces.ViewState:0"><![CDATA[-123:456]]></update>
//!   </changes>
//! </partial-response>
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerFault {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialResponse {
    pub updates: Vec<Update>,
    pub fault: Option<ServerFault>,
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed partial response at byte {position}: {message}")]
pub struct EnvelopeError {
    pub position: u64,
    pub message: String,
}

impl PartialResponse {
    /// Content of the update with exactly this id.
    pub fn extract_fragment(&self, target_id: &str) -> Option<&str> {
        self.updates
            .iter()
            .find(|u| u.id == target_id)
            .map(|u| u.content.as_str())
    }

    /// First present fragment among `ids`, in preference order.
    pub fn first_fragment<'a>(&'a self, ids: &[&'a str]) -> Option<(&'a str, &'a str)> {
        ids.iter()
            .find_map(|id| self.extract_fragment(id).map(|content| (*id, content)))
    }

    /// New view-state token, verbatim, if the server issued one.
    pub fn view_state(&self) -> Option<&str> {
        self.updates
            .iter()
            .find(|u| is_view_state_id(&u.id) && !u.content.is_empty())
            .map(|u| u.content.as_str())
    }
}

/// `javax.faces.ViewState`, `j_id1:javax.faces.ViewState:0`, ...
pub fn is_view_state_id(id: &str) -> bool {
    let trimmed = match id.rsplit_once(':') {
        Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => id,
    };
    trimmed.ends_with("ViewState")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    Update,
    ErrorName,
    ErrorMessage,
}

pub fn parse_partial_response(xml: &str) -> Result<PartialResponse, EnvelopeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut response = PartialResponse::default();
    let mut saw_root = false;
    let mut capture = Capture::None;
    let mut current_id = String::new();
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|err| EnvelopeError {
            position: reader.buffer_position() as u64,
            message: err.to_string(),
        })?;
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"partial-response" => saw_root = true,
                b"update" => {
                    current_id = attribute(&e, "id").unwrap_or_default();
                    text.clear();
                    capture = Capture::Update;
                }
                b"error" => {
                    response.fault.get_or_insert_with(ServerFault::default);
                }
                b"error-name" => {
                    text.clear();
                    capture = Capture::ErrorName;
                }
                b"error-message" => {
                    text.clear();
                    capture = Capture::ErrorMessage;
                }
                b"redirect" => response.redirect = attribute(&e, "url"),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"partial-response" => saw_root = true,
                b"update" => response.updates.push(Update {
                    id: attribute(&e, "id").unwrap_or_default(),
                    content: String::new(),
                }),
                b"redirect" => response.redirect = attribute(&e, "url"),
                _ => {}
            },
            Event::Text(t) if capture != Capture::None => {
                let unescaped = t.unescape().map_err(|err| EnvelopeError {
                    position: reader.buffer_position() as u64,
                    message: err.to_string(),
                })?;
                text.push_str(&unescaped);
            }
            Event::CData(c) if capture != Capture::None => {
                // Content containing "]]>" arrives split over adjacent sections.
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(e) => {
                let name = e.local_name();
                match (name.as_ref(), capture) {
                    (b"update", Capture::Update) => {
                        response.updates.push(Update {
                            id: std::mem::take(&mut current_id),
                            content: std::mem::take(&mut text),
                        });
                        capture = Capture::None;
                    }
                    (b"error-name", Capture::ErrorName) => {
                        if let Some(fault) = response.fault.as_mut() {
                            fault.name = std::mem::take(&mut text).trim().to_string();
                        }
                        capture = Capture::None;
                    }
                    (b"error-message", Capture::ErrorMessage) => {
                        if let Some(fault) = response.fault.as_mut() {
                            fault.message = std::mem::take(&mut text).trim().to_string();
                        }
                        capture = Capture::None;
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(EnvelopeError {
            position: 0,
            message: "no partial-response root element".to_string(),
        });
    }
    Ok(response)
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}
