use changes_framing::{ClassifiedParserError, LineInput, LineParser, ParseErrorCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::change::{Change, Revision, Seq};

/// Why a feed line was not turned into a [`Change`].
///
/// The summary never includes the line itself, which may carry document bodies.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("{summary}")]
pub struct DecodeError {
    pub code: ParseErrorCode,
    pub summary: String,
}

impl DecodeError {
    fn new(code: ParseErrorCode, summary: impl Into<String>) -> Self {
        Self {
            code,
            summary: summary.into(),
        }
    }
}

impl ClassifiedParserError for DecodeError {
    fn code(&self) -> ParseErrorCode {
        self.code
    }

    fn redacted_summary(&self) -> String {
        self.summary.clone()
    }
}

/// Decodes one feed line into a [`Change`].
///
/// Every JSON object with a string `id` is a change. Known fields that do not
/// have the expected type fall back to their defaults and are kept in
/// [`Change::extra`]. Feed bookkeeping lines such as the trailing
/// `{"last_seq": ..}` are rejected with [`ParseErrorCode::MissingField`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ChangeDecoder;

impl ChangeDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Returns `Ok(None)` for blank lines.
    pub fn decode(&self, line: &str) -> Result<Option<Change>, DecodeError> {
        let line = line.trim_end_matches('\r');
        if line.chars().all(|ch| ch.is_whitespace()) {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(line)
            .map_err(|err| DecodeError::new(ParseErrorCode::JsonParse, err.to_string()))?;
        let Value::Object(mut map) = value else {
            return Err(DecodeError::new(
                ParseErrorCode::WrongShape,
                "feed line is not a JSON object",
            ));
        };
        let id = match map.remove("id") {
            Some(Value::String(id)) => id,
            Some(_) => {
                return Err(DecodeError::new(
                    ParseErrorCode::TypedParse,
                    "feed line `id` is not a string",
                ))
            }
            None => {
                return Err(DecodeError::new(
                    ParseErrorCode::MissingField,
                    "feed line has no `id`",
                ))
            }
        };

        let seq = take_field::<Option<Seq>>(&mut map, "seq").flatten();
        let changes = take_field::<Option<Vec<Revision>>>(&mut map, "changes")
            .flatten()
            .unwrap_or_default();
        let deleted = take_field::<Option<bool>>(&mut map, "deleted")
            .flatten()
            .unwrap_or(false);
        let doc = take_field::<Option<Value>>(&mut map, "doc").flatten();

        Ok(Some(Change {
            id,
            seq,
            changes,
            deleted,
            doc,
            extra: map,
        }))
    }
}

/// Removes `key` and deserializes it. A value of the wrong type is put back so
/// it stays visible in [`Change::extra`].
fn take_field<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = map.remove(key)?;
    match T::deserialize(&value) {
        Ok(typed) => Some(typed),
        Err(_) => {
            map.insert(key.to_string(), value);
            None
        }
    }
}

impl LineParser for ChangeDecoder {
    type Event = Change;
    type Error = DecodeError;

    fn parse_line(&mut self, input: LineInput<'_>) -> Result<Option<Self::Event>, Self::Error> {
        self.decode(input.line)
    }
}
