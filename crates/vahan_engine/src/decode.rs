use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use scrape_logging::scrape_warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub encoding_label: String,
}

/// Decode a response body using: BOM -> Content-Type charset -> chardetng
/// guess. Malformed sequences are replaced and logged, never rejected.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> DecodedBody {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(enc) = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches([' ', '"', '\''].as_ref()).to_string())
    })
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedBody {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        scrape_warn!("replaced malformed {} sequences in response body", enc.name());
    }
    DecodedBody {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
    }
}
