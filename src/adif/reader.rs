// ADIF tokenizer
// Splits ADIF text into records of (TAG, value) pairs; tags are uppercased,
// values are taken by their declared byte length.

use crate::error::AdifParseError;

/// One ADIF record: fields in input order, tags uppercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdifRecord {
    /// `(TAG, value)` pairs.
    pub fields: Vec<(String, String)>,
}

impl AdifRecord {
    /// Last value of `tag` (case-insensitive).
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(t, _)| t.eq_ignore_ascii_case(tag))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of `tag`, in order.
    pub fn get_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(t, _)| t.eq_ignore_ascii_case(tag))
            .map(|(_, v)| v.as_str())
    }

    /// True when `tag` is present.
    pub fn has(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }
}

/// Parses ADIF text into records.
///
/// Anything up to `<EOH>` is header and skipped. Text between fields is
/// ignored. A bad length, a tag that never closes, or fields after the last
/// `<EOR>` fail with the 1-based index of the record being read.
pub fn parse_adif(text: &str) -> Result<Vec<AdifRecord>, AdifParseError> {
    let body_start = find_ci(text, "<EOH>", 0).map(|at| at + 5).unwrap_or(0);
    let bytes = text.as_bytes();

    let mut records = Vec::new();
    let mut current = AdifRecord::default();
    let mut pos = body_start;

    loop {
        let Some(lt) = bytes[pos..].iter().position(|&b| b == b'<').map(|o| pos + o) else {
            break;
        };
        let index = records.len() + 1;
        let Some(gt) = bytes[lt..].iter().position(|&b| b == b'>').map(|o| lt + o) else {
            return Err(AdifParseError::new(index, "tag is never closed with `>`"));
        };

        let inner = &text[lt + 1..gt];
        let mut parts = inner.split(':');
        let name = parts.next().unwrap_or_default().trim().to_ascii_uppercase();
        pos = gt + 1;

        match name.as_str() {
            "EOR" => {
                if !current.fields.is_empty() {
                    records.push(std::mem::take(&mut current));
                }
                continue;
            }
            "EOH" => continue,
            "" => return Err(AdifParseError::new(index, "empty tag name")),
            _ => {}
        }

        let Some(len_text) = parts.next() else {
            return Err(AdifParseError::new(index, format!("<{name}> has no length")));
        };
        let len: usize = len_text.trim().parse().map_err(|_| {
            AdifParseError::new(index, format!("<{name}> has malformed length `{len_text}`"))
        })?;

        let Some(end) = pos.checked_add(len).filter(|end| *end <= bytes.len()) else {
            return Err(AdifParseError::new(
                index,
                format!("<{name}> length {len} runs past the end of input"),
            ));
        };
        let Some(value) = text.get(pos..end) else {
            return Err(AdifParseError::new(
                index,
                format!("<{name}> length {len} splits a character"),
            ));
        };
        if value.contains('<') {
            return Err(AdifParseError::new(
                index,
                format!("<{name}> length {len} overruns the next tag"),
            ));
        }

        current.fields.push((name, value.to_string()));
        pos = end;
    }

    if !current.fields.is_empty() {
        return Err(AdifParseError::new(
            records.len() + 1,
            "record is not terminated by <EOR>",
        ));
    }

    Ok(records)
}

fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if hay.len() < needle.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_records() {
        let text = "Exported log\n<ADIF_VER:5>3.1.4 <eoh>\n\
            <CALL:5>W1ABC<band:3>20M<MODE:3>SSB<QSO_DATE:8>20240622<TIME_ON:4>1830<eor>\n\
            <call:4>K2XY <FREQ:5>7.074 <MODE:3>FT8 <QSO_DATE:8>20240622 <TIME_ON:6>190000 <EOR>\n";
        let records = parse_adif(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("call"), Some("W1ABC"));
        assert_eq!(records[0].get("BAND"), Some("20M"));
        assert_eq!(records[1].get("FREQ"), Some("7.074"));
        assert!(!records[1].has("ADIF_VER"));
    }

    #[test]
    fn accepts_type_indicator() {
        let records = parse_adif("<CALL:5:S>W1ABC<EOR>").unwrap();
        assert_eq!(records[0].get("CALL"), Some("W1ABC"));
    }

    #[test]
    fn malformed_length_reports_record_index() {
        let text = "<EOH><CALL:5>W1ABC<EOR><CALL:x>K2XY<EOR>";
        let err = parse_adif(text).unwrap_err();
        assert_eq!(err.record, 2);

        let err = parse_adif("<CALL:9>W1ABC<EOR>").unwrap_err();
        assert_eq!(err.record, 1);
    }

    #[test]
    fn oversized_length_is_an_error_not_a_panic() {
        let text = "<CALL:5>W1ABC<EOR><CALL:18446744073709551615>K2XY<EOR>";
        let err = parse_adif(text).unwrap_err();
        assert_eq!(err.record, 2);
        assert!(err.reason.contains("runs past the end"));
    }

    #[test]
    fn unterminated_record_is_an_error() {
        let err = parse_adif("<CALL:5>W1ABC<EOR><CALL:4>K2XY").unwrap_err();
        assert_eq!(err.record, 2);
        assert!(err.reason.contains("EOR"));
    }

    #[test]
    fn repeated_tags_are_kept() {
        let records =
            parse_adif("<CALL:5>W1ABC<MY_SIG_INFO:6>K-0001<MY_SIG_INFO:6>K-0002<EOR>").unwrap();
        let parks: Vec<&str> = records[0].get_all("MY_SIG_INFO").collect();
        assert_eq!(parks, vec!["K-0001", "K-0002"]);
    }
}
