//! Deep-link codec for sharing cards between devices.
//!
//! A share link is `bingocard://add?card=<payload>` where the payload
//! is the base64 of the record's JSON. There is no versioning or
//! negotiation; a link either decodes to a [`CardRecord`] or fails
//! with a specific [`ShareError`].

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use thiserror::Error;
use url::Url;

use crate::card::{CardRecord, FREE_LABEL, GRID_SIZE};

/// URL scheme used for generated card links.
pub const SHARE_SCHEME: &str = "bingocard";

/// Older scheme still accepted on import.
pub const SHARE_SCHEME_LEGACY: &str = "bingocardmaker";

/// Host component of a generated link.
pub const SHARE_HOST: &str = "add";

/// Query parameter carrying the encoded card.
pub const CARD_PARAM: &str = "card";

/// Failure modes when encoding or decoding a share link.
#[derive(Debug, Error)]
pub enum ShareError {
    /// The link could not be parsed as a URL at all.
    #[error("invalid share link: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The link uses a scheme other than `bingocard`.
    #[error("not a card link (scheme '{0}')")]
    WrongScheme(String),
    /// No `card` query parameter was present.
    #[error("share link is missing the card payload")]
    MissingCard,
    /// The payload was not valid base64 in any accepted alphabet.
    #[error("card payload is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),
    /// The payload bytes were not a valid card record.
    #[error("card payload is not a valid card: {0}")]
    Json(#[from] serde_json::Error),
    /// The decoded record's grid is not 5x5.
    #[error("card grid must be {GRID_SIZE}x{GRID_SIZE}")]
    MalformedGrid,
}

/// Encode a card record into a shareable deep link.
///
/// The payload uses the URL-safe base64 alphabet without padding so it
/// survives query-string round-trips unchanged.
pub fn encode(record: &CardRecord) -> Result<Url, ShareError> {
    let json = serde_json::to_vec(record)?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let mut url = Url::parse(&format!("{SHARE_SCHEME}://{SHARE_HOST}"))?;
    url.query_pairs_mut().append_pair(CARD_PARAM, &payload);
    Ok(url)
}

/// Decode an incoming link back into a card record.
///
/// Acceptance mirrors the original handler: any link with one of the
/// card schemes and a `card` parameter qualifies, whatever its host.
/// The decoded grid must be exactly 5x5; the centre cell is
/// normalised back to `FREE`.
pub fn decode(link: &str) -> Result<CardRecord, ShareError> {
    let url = Url::parse(link.trim())?;
    if url.scheme() != SHARE_SCHEME && url.scheme() != SHARE_SCHEME_LEGACY {
        return Err(ShareError::WrongScheme(url.scheme().to_string()));
    }

    // The original handler accepts any card link that carries the
    // payload parameter, whether or not the host is `add`.
    let payload = url
        .query_pairs()
        .find(|(key, value)| key == CARD_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .ok_or(ShareError::MissingCard)?;

    let bytes = decode_payload(&payload)?;
    let mut record: CardRecord = serde_json::from_slice(&bytes)?;
    if !record.has_valid_grid() {
        return Err(ShareError::MalformedGrid);
    }
    record.grid[GRID_SIZE / 2][GRID_SIZE / 2] = FREE_LABEL.to_string();
    Ok(record)
}

/// Human-readable message wrapping a share link, with an optional
/// configured footer line.
pub fn share_message(link: &Url, footer: Option<&str>) -> String {
    let mut message = format!("Check out my bingo card! Open this link to add it to your cards:\n{link}");
    if let Some(footer) = footer.map(str::trim).filter(|footer| !footer.is_empty()) {
        message.push_str("\n\n");
        message.push_str(footer);
    }
    message
}

fn decode_payload(payload: &str) -> Result<Vec<u8>, ShareError> {
    if let Ok(bytes) = URL_SAFE_NO_PAD.decode(payload) {
        return Ok(bytes);
    }
    // Links from foreign encoders may use the standard alphabet, where
    // a literal '+' comes through the query decode as a space.
    let restored = payload.replace(' ', "+");
    Ok(STANDARD.decode(&restored)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{BingoCard, CellPosition, MarkedPosition};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_record() -> CardRecord {
        let mut card = BingoCard::new();
        for row in 0..GRID_SIZE {
            for column in 0..GRID_SIZE {
                card.set_value(CellPosition::new(row, column), format!("cell {row}{column}"));
            }
        }
        card.toggle_mark(CellPosition::new(3, 1));
        CardRecord {
            id: Uuid::new_v4(),
            grid: card.grid().to_vec(),
            date_created: Utc::now(),
            marked_cells: Some(card.marked_positions()),
        }
    }

    #[test]
    fn encode_decode_round_trip() -> Result<(), ShareError> {
        let record = sample_record();
        let link = encode(&record)?;
        assert_eq!(link.scheme(), SHARE_SCHEME);
        assert_eq!(link.host_str(), Some(SHARE_HOST));

        let decoded = decode(link.as_str())?;
        assert_eq!(decoded.id, record.id);
        assert_eq!(decoded.grid, record.grid);
        assert_eq!(
            decoded.marked_cells.as_deref(),
            Some(&[MarkedPosition { row: 3, column: 1 }][..])
        );
        Ok(())
    }

    #[test]
    fn decode_accepts_legacy_scheme() -> Result<(), ShareError> {
        let record = sample_record();
        let link = encode(&record)?;
        let legacy = link
            .as_str()
            .replacen(SHARE_SCHEME, SHARE_SCHEME_LEGACY, 1);
        let decoded = decode(&legacy)?;
        assert_eq!(decoded.id, record.id);
        Ok(())
    }

    #[test]
    fn decode_rejects_wrong_scheme() {
        let err = decode("https://example.com/?card=abc").unwrap_err();
        assert!(matches!(err, ShareError::WrongScheme(scheme) if scheme == "https"));
    }

    #[test]
    fn decode_rejects_missing_payload() {
        let err = decode("bingocard://add").unwrap_err();
        assert!(matches!(err, ShareError::MissingCard));
    }

    #[test]
    fn decode_rejects_garbage_payload() {
        let err = decode("bingocard://add?card=%21%21not-base64%21%21").unwrap_err();
        assert!(matches!(err, ShareError::Payload(_)));
    }

    #[test]
    fn decode_rejects_undersized_grid() {
        let mut record = sample_record();
        record.grid.pop();
        let json = serde_json::to_vec(&record).expect("serialize");
        let payload = URL_SAFE_NO_PAD.encode(json);
        let err = decode(&format!("bingocard://add?card={payload}")).unwrap_err();
        assert!(matches!(err, ShareError::MalformedGrid));
    }

    #[test]
    fn decode_accepts_standard_alphabet_payloads() -> Result<(), ShareError> {
        let record = sample_record();
        let json = serde_json::to_vec(&record)?;
        let payload = STANDARD.encode(json);
        // Percent-encode as a foreign sender would.
        let mut link = Url::parse(&format!("{SHARE_SCHEME}://{SHARE_HOST}"))?;
        link.query_pairs_mut().append_pair(CARD_PARAM, &payload);
        let decoded = decode(link.as_str())?;
        assert_eq!(decoded.id, record.id);
        Ok(())
    }

    #[test]
    fn decode_forces_center_back_to_free() -> Result<(), ShareError> {
        let mut record = sample_record();
        record.grid[2][2] = "tampered".to_string();
        let decoded = decode(encode(&record)?.as_str())?;
        assert_eq!(decoded.grid[2][2], FREE_LABEL);
        Ok(())
    }

    #[test]
    fn share_message_appends_footer() {
        let link = encode(&sample_record()).expect("encode");
        let plain = share_message(&link, None);
        assert!(plain.contains(link.as_str()));
        let with_footer = share_message(&link, Some("Get the app: https://example.com"));
        assert!(with_footer.ends_with("Get the app: https://example.com"));
    }
}
