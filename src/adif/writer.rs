// ADIF writer
// Emits `<TAG:LEN>value` fields; LEN is the byte length of the value.

use chrono::{DateTime, Utc};

/// ADIF version written in the header.
pub const ADIF_VERSION: &str = "3.1.4";

/// Appends the header block, ending in `<EOH>`.
pub fn write_header(out: &mut String, program_id: &str, created: DateTime<Utc>) {
    out.push_str("ADIF export\n");
    write_field(out, "ADIF_VER", ADIF_VERSION);
    write_field(out, "PROGRAMID", program_id);
    write_field(out, "PROGRAMVERSION", env!("CARGO_PKG_VERSION"));
    write_field(out, "CREATED_TIMESTAMP", &created.format("%Y%m%d %H%M%S").to_string());
    out.push_str("<EOH>\n\n");
}

/// Appends one field followed by a space; empty values are skipped.
pub fn write_field(out: &mut String, tag: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    out.push('<');
    out.push_str(tag);
    out.push(':');
    out.push_str(&value.len().to_string());
    out.push('>');
    out.push_str(value);
    out.push(' ');
}

/// Appends a whole record and its `<EOR>` on one line.
pub fn write_record(out: &mut String, fields: &[(String, String)]) {
    for (tag, value) in fields {
        write_field(out, tag, value);
    }
    out.push_str("<EOR>\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_in_bytes() {
        let mut out = String::new();
        write_field(&mut out, "NAME", "José");
        assert_eq!(out, "<NAME:5>José ");
    }

    #[test]
    fn empty_values_are_skipped() {
        let mut out = String::new();
        write_record(
            &mut out,
            &[
                ("CALL".to_string(), "W1ABC".to_string()),
                ("NAME".to_string(), String::new()),
            ],
        );
        assert_eq!(out, "<CALL:5>W1ABC <EOR>\n");
    }
}
