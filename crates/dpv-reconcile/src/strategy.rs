//! Named comparison strategies.
//!
//! The two strategies cover different fields on purpose: binary streams are
//! checked by payload checksum only, location and quality are not compared.

use dpv_schemas::{BinaryRecord, CloudRecord, ConsoleRecord, RecordKind, ScalarRecord};

use crate::checksum::{decode_payload, Checksum};
use crate::{Field, Mismatch};

/// Compares one console record with the cloud record paired to it.
pub trait CompareStrategy {
    fn name(&self) -> &'static str;

    /// `Err` carries the first field that differs.
    fn compare(
        &self,
        index: usize,
        console: &ConsoleRecord,
        cloud: &CloudRecord,
    ) -> Result<(), Mismatch>;
}

fn mismatch(
    index: usize,
    field: Field,
    console_value: impl Into<String>,
    cloud_value: impl Into<String>,
    console: &ConsoleRecord,
    cloud: &CloudRecord,
) -> Mismatch {
    Mismatch {
        index,
        field,
        console: console_value.into(),
        cloud: cloud_value.into(),
        console_dump: format!("{console:?}"),
        cloud_dump: format!("{cloud:?}"),
    }
}

fn wrong_kind(index: usize, expected: RecordKind, console: &ConsoleRecord, cloud: &CloudRecord) -> Mismatch {
    mismatch(
        index,
        Field::Kind,
        console.kind().as_str(),
        format!("{expected} expected"),
        console,
        cloud,
    )
}

/// Exact text equality on `data`, then `quality`, then `location`.
///
/// No numeric normalization: `"1.0"` and `"1"` differ.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarFields;

impl ScalarFields {
    fn fields<'a>(r: &'a ScalarRecord, c: &'a CloudRecord) -> [(Field, &'a str, &'a str); 3] {
        [
            (Field::Data, r.data.as_str(), c.data.as_str()),
            (Field::Quality, r.quality.as_str(), c.quality.as_str()),
            (Field::Location, r.location.as_str(), c.location.as_str()),
        ]
    }
}

impl CompareStrategy for ScalarFields {
    fn name(&self) -> &'static str {
        "scalar_fields"
    }

    fn compare(
        &self,
        index: usize,
        console: &ConsoleRecord,
        cloud: &CloudRecord,
    ) -> Result<(), Mismatch> {
        let ConsoleRecord::Scalar(rec) = console else {
            return Err(wrong_kind(index, RecordKind::Scalar, console, cloud));
        };

        for (field, ours, theirs) in Self::fields(rec, cloud) {
            if ours != theirs {
                return Err(mismatch(index, field, ours, theirs, console, cloud));
            }
        }
        Ok(())
    }
}

/// Base64-decode the cloud payload and check its CRC-32 against both
/// renderings announced on the console.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryChecksum;

impl BinaryChecksum {
    fn check(
        index: usize,
        rec: &BinaryRecord,
        console: &ConsoleRecord,
        cloud: &CloudRecord,
    ) -> Result<(), Mismatch> {
        let bytes = decode_payload(&cloud.data).map_err(|e| {
            mismatch(
                index,
                Field::Payload,
                rec.crc32_hex.as_str(),
                format!("undecodable base64 ({e})"),
                console,
                cloud,
            )
        })?;
        let sum = Checksum::of(&bytes);

        let decimal = sum.decimal();
        if rec.crc32_decimal != decimal {
            return Err(mismatch(
                index,
                Field::Crc32Decimal,
                rec.crc32_decimal.as_str(),
                decimal,
                console,
                cloud,
            ));
        }

        let hex = sum.hex();
        if rec.crc32_hex != hex {
            return Err(mismatch(
                index,
                Field::Crc32Hex,
                rec.crc32_hex.as_str(),
                hex,
                console,
                cloud,
            ));
        }
        Ok(())
    }
}

impl CompareStrategy for BinaryChecksum {
    fn name(&self) -> &'static str {
        "binary_checksum"
    }

    fn compare(
        &self,
        index: usize,
        console: &ConsoleRecord,
        cloud: &CloudRecord,
    ) -> Result<(), Mismatch> {
        match console {
            ConsoleRecord::Binary(rec) => Self::check(index, rec, console, cloud),
            ConsoleRecord::Scalar(_) => Err(wrong_kind(index, RecordKind::Binary, console, cloud)),
        }
    }
}
