//! Identifier helpers

use bech32::{Bech32m, Hrp};
use uuid7::uuid7;

const LINE_HRP: Hrp = Hrp::parse_unchecked("line_");

// construct a time ordered id then encode using bech32 under the given prefix
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

pub fn new_line_id() -> Result<String, bech32::EncodeError> {
    bech32::encode::<Bech32m>(LINE_HRP, uuid7().as_bytes())
}

pub fn new_assessment_id() -> anyhow::Result<String> {
    new_uuid_to_bech32("assessment_")
}

pub fn new_actor_id() -> anyhow::Result<String> {
    new_uuid_to_bech32("user_")
}
