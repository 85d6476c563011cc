//! Offline commands: `dpv parse` and `dpv checksum`.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dpv_config::ConfigCommand;
use dpv_console::RecordParser;
use dpv_reconcile::Checksum;
use dpv_schemas::ConsoleRecord;

use super::{load_harness, read_input};

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

pub fn parse(input: &str, config_paths: &[String], marker: Option<String>) -> Result<()> {
    let (_, cfg) = load_harness(config_paths, ConfigCommand::Parse, false)?;
    let marker = marker.unwrap_or(cfg.console.marker);
    let parser = RecordParser::new(marker);

    let text = read_input(input)?;
    let records = parser
        .collect(&text)
        .with_context(|| format!("console input {} has a malformed record", input))?;

    println!("records={}", records.len());
    for (i, r) in records.iter().enumerate() {
        println!("{}", record_line(i, r));
    }
    Ok(())
}

fn record_line(index: usize, record: &ConsoleRecord) -> String {
    match record {
        ConsoleRecord::Scalar(r) => format!(
            "record={} kind=scalar location={} quality={} data={}",
            index, r.location, r.quality, r.data
        ),
        ConsoleRecord::Binary(r) => format!(
            "record={} kind=binary location={} quality={} crc32_dec={} crc32_hex={}",
            index, r.location, r.quality, r.crc32_decimal, r.crc32_hex
        ),
    }
}

// ---------------------------------------------------------------------------
// checksum
// ---------------------------------------------------------------------------

pub fn checksum(b64: Option<String>, hex: Option<String>, text: Option<String>) -> Result<()> {
    let bytes = match (b64, hex, text) {
        (Some(b), _, _) => dpv_reconcile::decode_payload(&b)
            .map_err(|e| anyhow::anyhow!("--base64 is not valid base64: {e}"))?,
        (_, Some(h), _) => ::hex::decode(h.trim()).context("--hex is not valid hex")?,
        (_, _, Some(t)) => t.into_bytes(),
        (None, None, None) => anyhow::bail!("must provide --base64, --hex or --text"),
    };

    let sum = Checksum::of(&bytes);
    println!("bytes={}", bytes.len());
    println!("crc32_dec={}", sum.decimal());
    println!("crc32_hex={}", sum.hex());
    println!("base64={}", STANDARD.encode(&bytes));
    Ok(())
}
