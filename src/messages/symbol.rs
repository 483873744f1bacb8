use rosc::{OscMessage, OscType};

use crate::error::Error;
use crate::types::{compile_tuid, decompile_tuid, ComponentId, SessionId, TypeId, UserId};

/// Symbol payload: either decoded text or an opaque code blob.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolData {
    Text(String),
    Blob(Vec<u8>),
}

impl Default for SymbolData {
    fn default() -> Self {
        SymbolData::Text(String::new())
    }
}

/// SYM message: symbol recognized on a contact (barcode, fiducial payload).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Symbol {
    pub session_id: SessionId,
    pub type_id: TypeId,
    pub user_id: UserId,
    pub component_id: ComponentId,
    pub group: String,
    pub data: SymbolData,
}

impl Symbol {
    pub const PATH: &'static str = "/tuio2/sym";

    pub fn new(
        session_id: SessionId,
        type_id: TypeId,
        user_id: UserId,
        component_id: ComponentId,
        group: impl Into<String>,
        data: SymbolData,
    ) -> Self {
        Symbol {
            session_id,
            type_id,
            user_id,
            component_id,
            group: group.into(),
            data,
        }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let args = vec![
            OscType::Int(self.session_id as i32),
            OscType::Int(compile_tuid(self.type_id, self.user_id) as i32),
            OscType::Int(self.component_id as i32),
            OscType::String(self.group.clone()),
            match &self.data {
                SymbolData::Text(text) => OscType::String(text.clone()),
                SymbolData::Blob(blob) => OscType::Blob(blob.clone()),
            },
        ];
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<Symbol, Error> {
        match args {
            [OscType::Int(sid), OscType::Int(tu), OscType::Int(cid), OscType::String(group), data] =>
            {
                let data = match data {
                    OscType::String(text) => SymbolData::Text(text.clone()),
                    OscType::Blob(blob) => SymbolData::Blob(blob.clone()),
                    _ => {
                        return Err(Error::malformed(Self::PATH, "data must be string or blob"))
                    }
                };
                let (type_id, user_id) = decompile_tuid(*tu as u32);
                Ok(Symbol::new(
                    *sid as u32,
                    type_id,
                    user_id,
                    *cid as u32,
                    group.clone(),
                    data,
                ))
            }
            _ => Err(Error::malformed(Self::PATH, "expected 'iiis' plus string or blob")),
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}/{} {} {}",
            Self::PATH,
            self.session_id,
            self.user_id,
            self.type_id,
            self.component_id,
            self.group
        )?;
        match &self.data {
            SymbolData::Text(text) => write!(f, " {text}"),
            SymbolData::Blob(blob) => write!(f, " <{} bytes>", blob.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_string_round_trip() {
        let sym = Symbol::new(3, 1, 0, 0, "ean13", SymbolData::Text("4006381333931".into()));
        let mut out = Vec::new();
        sym.imprint(&mut out);
        assert_eq!(out[0].addr, Symbol::PATH);
        assert_eq!(Symbol::parse(&out[0].args).unwrap(), sym);
    }

    #[test]
    fn test_symbol_blob_round_trip() {
        let sym = Symbol::new(4, 2, 1, 0, "raw", SymbolData::Blob(vec![1, 2, 3, 4]));
        let mut out = Vec::new();
        sym.imprint(&mut out);
        assert_eq!(Symbol::parse(&out[0].args).unwrap(), sym);
    }

    #[test]
    fn test_symbol_rejects_numeric_data() {
        let args = vec![
            OscType::Int(1),
            OscType::Int(0),
            OscType::Int(0),
            OscType::String("g".into()),
            OscType::Int(5),
        ];
        assert!(Symbol::parse(&args).is_err());
    }
}
