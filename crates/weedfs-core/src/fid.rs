//! File identifiers.
//!
//! A file id addresses one stored blob: `<volume_id>,<key>[_<suffix>]`, e.g.
//! `3,01637037d6` or `3,01637037d6_2` for the third id of a batch assignment.
//! The volume id is the part the master resolves to volume servers; the key is
//! opaque to the client.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WeedError;

/// Parsed `<volume_id>,<key>[_<suffix>]`. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId {
    volume_id: String,
    key: String,
    /// Suffix digits exactly as written, so `_01` stays `_01`.
    suffix: Option<String>,
}

impl FileId {
    /// Parse a file id. Exactly one `,` is required, with a non-empty volume id
    /// before it and a non-empty key after it.
    pub fn parse(text: &str) -> Result<Self, WeedError> {
        let text = text.trim();
        let (volume_id, rest) = text
            .split_once(',')
            .ok_or_else(|| WeedError::InvalidIdentifier(text.to_string()))?;

        if volume_id.is_empty() || rest.is_empty() || rest.contains(',') {
            return Err(WeedError::InvalidIdentifier(text.to_string()));
        }

        let (key, suffix) = split_suffix(rest);

        Ok(FileId {
            volume_id: volume_id.to_string(),
            key: key.to_string(),
            suffix: suffix.map(str::to_string),
        })
    }

    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    /// The key without its batch suffix.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn suffix(&self) -> Option<u32> {
        self.suffix.as_deref().and_then(|s| s.parse().ok())
    }

    /// The key as it appears on the wire, including the batch suffix.
    pub fn full_key(&self) -> String {
        match &self.suffix {
            Some(digits) => format!("{}_{}", self.key, digits),
            None => self.key.clone(),
        }
    }

    /// Expand a batch assignment into `count` ids: this one, followed by
    /// `key_1 .. key_{count-1}`. The master reserved the whole run with a single
    /// assign call, so no further network round-trip is needed.
    ///
    /// # Panics
    /// Panics if `count` is zero.
    pub fn derive_batch(&self, count: u32) -> Vec<FileId> {
        assert!(count >= 1, "derive_batch requires count >= 1");

        let base_key = self.full_key();
        let mut fids = Vec::with_capacity(count as usize);
        fids.push(self.clone());
        fids.extend((1..count).map(|n| FileId {
            volume_id: self.volume_id.clone(),
            key: base_key.clone(),
            suffix: Some(n.to_string()),
        }));
        fids
    }
}

/// A trailing `_<digits>` on the key is a batch suffix. The digits are kept
/// verbatim; a run too long for `u32` stays part of the key.
fn split_suffix(key: &str) -> (&str, Option<&str>) {
    if let Some((base, tail)) = key.rsplit_once('_') {
        if !base.is_empty()
            && !tail.is_empty()
            && tail.bytes().all(|b| b.is_ascii_digit())
            && tail.parse::<u32>().is_ok()
        {
            return (base, Some(tail));
        }
    }
    (key, None)
}

/// Normalise a volume id or a full file id to the bare volume id.
///
/// `"3,01637037d6"` and `"3/01637037d6"` both yield `"3"`; a bare `"3"` is
/// returned unchanged.
pub fn volume_id_of(volume_id_or_fid: &str) -> &str {
    let text = volume_id_or_fid.trim();
    if let Some((volume_id, _)) = text.split_once(',') {
        volume_id
    } else if let Some((volume_id, _)) = text.split_once('/') {
        volume_id
    } else {
        text
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.suffix {
            Some(digits) => write!(f, "{},{}_{}", self.volume_id, self.key, digits),
            None => write!(f, "{},{}", self.volume_id, self.key),
        }
    }
}

impl FromStr for FileId {
    type Err = WeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileId::parse(s)
    }
}

impl TryFrom<String> for FileId {
    type Error = WeedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FileId::parse(&value)
    }
}

impl From<FileId> for String {
    fn from(fid: FileId) -> Self {
        fid.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_fid() {
        let fid = FileId::parse("3,01637037d6").unwrap();
        assert_eq!(fid.volume_id(), "3");
        assert_eq!(fid.key(), "01637037d6");
        assert_eq!(fid.suffix(), None);
        assert_eq!(fid.to_string(), "3,01637037d6");
    }

    #[test]
    fn parse_rejects_missing_comma() {
        let err = FileId::parse("badtoken").unwrap_err();
        assert_eq!(err, WeedError::InvalidIdentifier("badtoken".to_string()));
    }

    #[test]
    fn parse_rejects_empty_parts_and_extra_commas() {
        assert!(FileId::parse("3,").is_err());
        assert!(FileId::parse(",abc").is_err());
        assert!(FileId::parse("3,abc,def").is_err());
        assert!(FileId::parse("").is_err());
    }

    #[test]
    fn parse_batch_suffix() {
        let fid = FileId::parse("3,abc_2").unwrap();
        assert_eq!(fid.key(), "abc");
        assert_eq!(fid.suffix(), Some(2));
        assert_eq!(fid.full_key(), "abc_2");
        assert_eq!(fid.to_string(), "3,abc_2");

        // underscore without digits is part of the key
        let fid = FileId::parse("3,abc_x").unwrap();
        assert_eq!(fid.key(), "abc_x");
        assert_eq!(fid.suffix(), None);
    }

    #[test]
    fn parse_keeps_zero_padded_suffix_verbatim() {
        for text in ["3,01637037d6_01", "3,01637037d6_007", "3,abc_0"] {
            let fid = FileId::parse(text).unwrap();
            assert_eq!(fid.to_string(), text);
            assert_eq!(String::from(fid), text);
        }

        let fid = FileId::parse("3,01637037d6_007").unwrap();
        assert_eq!(fid.key(), "01637037d6");
        assert_eq!(fid.suffix(), Some(7));
        assert_eq!(fid.full_key(), "01637037d6_007");
        assert_ne!(fid, FileId::parse("3,01637037d6_7").unwrap());
    }

    #[test]
    fn derive_batch_from_padded_suffix_keeps_base_key() {
        let fid = FileId::parse("3,abc_01").unwrap();
        let batch: Vec<String> = fid.derive_batch(2).iter().map(|f| f.to_string()).collect();
        assert_eq!(batch, vec!["3,abc_01", "3,abc_01_1"]);
    }

    #[test]
    fn derive_batch_appends_suffixes() {
        let fid = FileId::parse("3,abc").unwrap();
        let batch: Vec<String> = fid.derive_batch(3).iter().map(|f| f.to_string()).collect();
        assert_eq!(batch, vec!["3,abc", "3,abc_1", "3,abc_2"]);
    }

    #[test]
    fn derive_batch_of_one_is_identity() {
        let fid = FileId::parse("7,ff01").unwrap();
        assert_eq!(fid.derive_batch(1), vec![fid]);
    }

    #[test]
    #[should_panic(expected = "count >= 1")]
    fn derive_batch_zero_panics() {
        FileId::parse("3,abc").unwrap().derive_batch(0);
    }

    #[test]
    fn volume_id_of_normalises() {
        assert_eq!(volume_id_of("3,01637037d6"), "3");
        assert_eq!(volume_id_of("3/01637037d6"), "3");
        assert_eq!(volume_id_of("12"), "12");
    }

    #[test]
    fn serde_uses_string_form() {
        let fid: FileId = serde_json::from_str("\"5,0a1b\"").unwrap();
        assert_eq!(fid.volume_id(), "5");
        assert_eq!(serde_json::to_string(&fid).unwrap(), "\"5,0a1b\"");
        assert!(serde_json::from_str::<FileId>("\"nocomma\"").is_err());
    }
}
