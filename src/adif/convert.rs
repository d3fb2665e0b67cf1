// Mapping between ADIF fields and QSO records.

use crate::{
    config::StationInfo,
    engine::Session,
    error::{AdifParseError, InvalidRecordError},
    qso::{QsoDraft, QsoRecord, TimePrecision, parse_adif_datetime},
    types::{Band, Frequency},
};

use super::reader::AdifRecord;

const POTA: &str = "POTA";

/// Why a parsed ADIF record could not become a QSO.
#[derive(Debug)]
pub(crate) enum Rejected {
    /// The record is unusable as ADIF; aborts the whole import.
    Structural(AdifParseError),
    /// A value failed validation; the record is counted as failed.
    Invalid(InvalidRecordError),
}

/// Builds a validated record (id 0, no session) from one ADIF record.
///
/// `index` is the 1-based record number used in errors.
pub(crate) fn record_to_qso(rec: &AdifRecord, index: usize) -> Result<QsoRecord, Rejected> {
    if rec.get("CALL").is_none_or(|c| c.trim().is_empty()) {
        return Err(Rejected::Structural(AdifParseError::new(
            index,
            "record has no CALL field",
        )));
    }

    let my_sig_pota = rec.get("MY_SIG").is_none_or(|s| s.trim().eq_ignore_ascii_case(POTA));
    let sig_pota = rec.get("SIG").is_none_or(|s| s.trim().eq_ignore_ascii_case(POTA));

    let mut draft = QsoDraft::default();
    let mut date = None;
    let mut time = None;
    let mut their_parks: Vec<String> = Vec::new();
    let mut band = None;

    for (tag, value) in &rec.fields {
        let d = &mut draft.details;
        match tag.as_str() {
            "CALL" => draft.callsign = value.clone(),
            "FREQ" => draft.frequency = value.clone(),
            "MODE" => draft.mode = value.clone(),
            "QSO_DATE" => date = Some(value.as_str()),
            "TIME_ON" => time = Some(value.as_str()),
            "RST_SENT" => draft.rst_sent = Some(value.clone()),
            "RST_RCVD" => draft.rst_rcvd = Some(value.clone()),
            "NAME" => d.name = Some(value.clone()),
            "QTH" => d.qth = Some(value.clone()),
            "STATE" => d.state = Some(value.clone()),
            "COUNTRY" => d.country = Some(value.clone()),
            "GRIDSQUARE" => d.grid = Some(value.clone()),
            "STX_STRING" => d.exchange_sent = Some(value.clone()),
            "SRX_STRING" => d.exchange_rcvd = Some(value.clone()),
            "STX" if value.trim().parse::<u32>().is_ok() => {
                d.serial_sent = value.trim().parse().ok();
            }
            "SRX" if value.trim().parse::<u32>().is_ok() => {
                d.serial_rcvd = value.trim().parse().ok();
            }
            "TX_PWR" => d.tx_power = Some(value.clone()),
            "PROP_MODE" => d.prop_mode = Some(value.clone()),
            "COMMENT" => d.comment = Some(value.clone()),
            "NOTES" => d.notes = Some(value.clone()),
            "MY_SIG" if my_sig_pota => {}
            "SIG" if sig_pota => {}
            "MY_SIG_INFO" if my_sig_pota => push_parks(&mut d.my_parks, value),
            "MY_POTA_REF" => push_parks(&mut d.my_parks, value),
            "SIG_INFO" if sig_pota => push_parks(&mut their_parks, value),
            "POTA_REF" => push_parks(&mut their_parks, value),
            "BAND" => band = Some(value),
            _ => d.extra.push((tag.clone(), value.clone())),
        }
    }

    if !their_parks.is_empty() {
        draft.details.their_park = Some(their_parks.join(","));
    }
    // BAND is derived from FREQ unless the band plan disagrees or has no entry.
    if let Some(value) = band {
        let derived = Frequency::parse(&draft.frequency).map(|f| f.band());
        let agrees = derived
            .is_some_and(|b| b != Band::Unknown && b.as_str().eq_ignore_ascii_case(value.trim()));
        if !agrees {
            draft.details.extra.push(("BAND".to_string(), value.clone()));
        }
    }

    let date = date.ok_or_else(|| {
        Rejected::Invalid(InvalidRecordError::new("qso_date", "QSO_DATE is missing"))
    })?;
    let time = time.ok_or_else(|| {
        Rejected::Invalid(InvalidRecordError::new("time_on", "TIME_ON is missing"))
    })?;
    let (timestamp, precision) = parse_adif_datetime(date, time).map_err(Rejected::Invalid)?;
    draft.timestamp = Some(timestamp);
    draft.time_precision = precision;

    draft.validate().map_err(Rejected::Invalid)
}

fn push_parks(parks: &mut Vec<String>, value: &str) {
    for park in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let park = park.to_ascii_uppercase();
        if !parks.contains(&park) {
            parks.push(park);
        }
    }
}

/// Context shared by every record of one export.
#[derive(Debug, Clone, Copy)]
pub struct ExportContext<'a> {
    /// Station metadata written on each record.
    pub station: &'a StationInfo,
    /// Active session, if any; drives POTA augmentation.
    pub session: Option<&'a Session>,
}

/// ADIF fields for one record, in the order they are written.
pub(crate) fn qso_to_fields(rec: &QsoRecord, ctx: &ExportContext<'_>) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::with_capacity(24);
    let mut put = |tag: &str, value: &str| {
        if !value.is_empty() {
            fields.push((tag.to_string(), value.to_string()));
        }
    };

    put("CALL", &rec.callsign);
    put("QSO_DATE", &rec.timestamp.format("%Y%m%d").to_string());
    let time_on = match rec.time_precision {
        TimePrecision::Minutes => rec.timestamp.format("%H%M"),
        TimePrecision::Seconds => rec.timestamp.format("%H%M%S"),
    };
    put("TIME_ON", &time_on.to_string());
    let d = &rec.details;
    let has_extra = |tag: &str| d.extra.iter().any(|(t, _)| t == tag);

    put("FREQ", rec.frequency.as_str());
    if rec.band() != Band::Unknown && !has_extra("BAND") {
        put("BAND", rec.band().as_str());
    }
    put("MODE", rec.mode_label());
    put("RST_SENT", &rec.rst_sent);
    put("RST_RCVD", &rec.rst_rcvd);

    let text_fields = [
        ("NAME", &d.name),
        ("QTH", &d.qth),
        ("STATE", &d.state),
        ("COUNTRY", &d.country),
        ("GRIDSQUARE", &d.grid),
        ("STX_STRING", &d.exchange_sent),
        ("SRX_STRING", &d.exchange_rcvd),
        ("TX_PWR", &d.tx_power),
        ("PROP_MODE", &d.prop_mode),
        ("COMMENT", &d.comment),
        ("NOTES", &d.notes),
    ];
    for (tag, value) in text_fields {
        if let Some(value) = value {
            put(tag, value);
        }
    }
    if let Some(n) = d.serial_sent {
        put("STX", &n.to_string());
    }
    if let Some(n) = d.serial_rcvd {
        put("SRX", &n.to_string());
    }

    let my_parks: &[String] = match ctx.session {
        Some(s) if d.my_parks.is_empty() && rec.session_id == Some(s.id()) => s.activation_parks(),
        _ => &d.my_parks,
    };
    if !my_parks.is_empty() {
        put("MY_SIG", POTA);
        for park in my_parks {
            put("MY_SIG_INFO", park);
        }
    }
    if let Some(theirs) = &d.their_park {
        put("SIG", POTA);
        put("SIG_INFO", theirs);
    }

    let station_call = ctx
        .session
        .and_then(Session::station_callsign)
        .unwrap_or(ctx.station.callsign.as_str());
    let station_fields = [
        ("STATION_CALLSIGN", Some(station_call.to_string())),
        ("MY_GRIDSQUARE", ctx.station.grid.clone()),
        ("MY_CQ_ZONE", ctx.station.cq_zone.map(|z| z.to_string())),
        ("MY_ITU_ZONE", ctx.station.itu_zone.map(|z| z.to_string())),
    ];
    for (tag, value) in station_fields {
        if let Some(value) = value.filter(|_| !has_extra(tag)) {
            put(tag, &value);
        }
    }

    for (tag, value) in &d.extra {
        put(tag, value);
    }
    fields
}
