//! Parser for `pdftk dump_data_fields_utf8` output
//!
//! The dump is a sequence of line-oriented records separated by `---` lines:
//!
//! ```text
//! ---
//! FieldType: Button
//! FieldName: agree
//! FieldNameAlt: I agree to the terms
//! FieldFlags: 0
//! FieldStateOption: Off
//! FieldStateOption: Yes
//! ---
//! FieldType: Text
//! FieldName: name
//! ```

use crate::pdf::fields::Field;
use std::collections::HashMap;

const RECORD_DELIMITER: &str = "---";
const FIELD_TYPE: &str = "FieldType: ";
const FIELD_NAME: &str = "FieldName: ";
const FIELD_NAME_ALT: &str = "FieldNameAlt: ";
const FIELD_STATE_OPTION: &str = "FieldStateOption: ";

/// Parse dump text into fields keyed by field name.
///
/// Records are delimited by lines that are exactly `---` (a trailing `\r` is
/// removed with the line ending). Records without a `FieldName` are dropped, the last record is kept even
/// without a trailing delimiter, and a repeated name overwrites the earlier
/// record. Unrecognized lines are ignored.
pub fn parse_dump(text: &str) -> HashMap<String, Field> {
    let mut fields = HashMap::new();
    let mut current = Field::default();

    for line in text.lines() {
        if line == RECORD_DELIMITER {
            emit(&mut fields, std::mem::take(&mut current));
            continue;
        }

        if let Some(value) = line.strip_prefix(FIELD_TYPE) {
            current.field_type = value.to_string();
        } else if let Some(value) = line.strip_prefix(FIELD_NAME) {
            current.field_name = value.to_string();
        } else if let Some(value) = line.strip_prefix(FIELD_NAME_ALT) {
            current.view_name = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix(FIELD_STATE_OPTION) {
            current.field_options.push(value.to_string());
        }
    }

    // last record has no closing delimiter
    emit(&mut fields, current);

    fields
}

fn emit(fields: &mut HashMap<String, Field>, field: Field) {
    if !field.field_name.is_empty() {
        fields.insert(field.field_name.clone(), field);
    }
}
