use crate::error::{BridgeError, Result};
use serde::Deserialize;
use std::fmt;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ScriptOp {
    Purchase,
    Subscribe,
    Restore,
    Supported,
    Detail,
    Price,
    Amount,
    Title,
    Description,
    Store,
}

impl ScriptOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Subscribe => "subscribe",
            Self::Restore => "restore",
            Self::Supported => "supported",
            Self::Detail => "detail",
            Self::Price => "price",
            Self::Amount => "amount",
            Self::Title => "title",
            Self::Description => "description",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for ScriptOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One plugin call read from a script row `op, product, consume, payload`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScriptCommand {
    pub op: ScriptOp,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub consume: Option<bool>,
    #[serde(default)]
    pub payload: Option<String>,
}

/// Reads plugin calls from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so trailing optional columns may be left out.
pub struct ScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScriptReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes commands, one `Result` per row.
    pub fn commands(self) -> impl Iterator<Item = Result<ScriptCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BridgeError::from))
    }
}
