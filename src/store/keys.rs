//! Key naming and alpha member encoding
//!
//! ```text
//! <model>:all                → SET of all live ids
//! <model>:<field_store_key>  → ZSET index (score = value, or "<value> <id>" at score 0)
//! <model>:<id>               → HASH of record fields
//! ```

/// Suffix of the live-id set
const KEY_ALL_SUFFIX: &str = "all";

/// Key of the set holding every live id of a model
pub fn all_ids_key(model: &str) -> String {
    format!("{}:{}", model, KEY_ALL_SUFFIX)
}

/// Key of a field's sorted-set index
pub fn index_key(model: &str, store_key: &str) -> String {
    format!("{}:{}", model, store_key)
}

/// Key of a record hash
pub fn record_key(model: &str, id: &str) -> String {
    format!("{}:{}", model, id)
}

/// Encode an alpha index member as `"<value> <id>"`
pub fn encode_alpha_member(value: &str, id: &str) -> String {
    format!("{} {}", value, id)
}

/// Recover the id from an alpha index member
///
/// Values may contain spaces but ids never do, so the id is whatever follows
/// the last space.
pub fn decode_alpha_member(member: &str) -> &str {
    match member.rfind(' ') {
        Some(pos) => &member[pos + 1..],
        None => member,
    }
}

/// Recover the value from an alpha index member
pub fn alpha_member_value(member: &str) -> &str {
    match member.rfind(' ') {
        Some(pos) => &member[..pos],
        None => "",
    }
}
