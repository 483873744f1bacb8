use rosc::{OscMessage, OscType};

use crate::error::Error;
use crate::types::{SessionId, SessionSet};

/// CTL message: ordered list of control dimension values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Control {
    pub session_id: SessionId,
    pub controls: Vec<f32>,
}

impl Control {
    pub const PATH: &'static str = "/tuio2/ctl";

    pub fn new(session_id: SessionId, controls: Vec<f32>) -> Self {
        Control { session_id, controls }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let mut args = vec![OscType::Int(self.session_id as i32)];
        args.extend(self.controls.iter().map(|c| OscType::Float(*c)));
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<Control, Error> {
        let (sid, rest) = match args.split_first() {
            Some((OscType::Int(sid), rest)) => (*sid as u32, rest),
            _ => return Err(Error::malformed(Self::PATH, "expected leading session id")),
        };
        let mut controls = Vec::with_capacity(rest.len());
        for arg in rest {
            match arg {
                OscType::Float(value) => controls.push(*value),
                _ => return Err(Error::malformed(Self::PATH, "controls must be floats")),
            }
        }
        Ok(Control::new(sid, controls))
    }
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} [", Self::PATH, self.session_id)?;
        for (i, c) in self.controls.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "]")
    }
}

/// DAT payload: decoded text or an opaque blob, with its MIME type.
#[derive(Debug, Clone, PartialEq)]
pub enum DataPayload {
    Text(String),
    Blob(Vec<u8>),
}

impl Default for DataPayload {
    fn default() -> Self {
        DataPayload::Text(String::new())
    }
}

/// DAT message: arbitrary data attached to a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Data {
    pub session_id: SessionId,
    pub mime: String,
    pub data: DataPayload,
}

impl Data {
    pub const PATH: &'static str = "/tuio2/dat";

    pub fn new(session_id: SessionId, mime: impl Into<String>, data: DataPayload) -> Self {
        Data { session_id, mime: mime.into(), data }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let args = vec![
            OscType::Int(self.session_id as i32),
            OscType::String(self.mime.clone()),
            match &self.data {
                DataPayload::Text(text) => OscType::String(text.clone()),
                DataPayload::Blob(blob) => OscType::Blob(blob.clone()),
            },
        ];
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<Data, Error> {
        match args {
            [OscType::Int(sid), OscType::String(mime), data] => {
                let data = match data {
                    OscType::String(text) => DataPayload::Text(text.clone()),
                    OscType::Blob(blob) => DataPayload::Blob(blob.clone()),
                    _ => {
                        return Err(Error::malformed(Self::PATH, "data must be string or blob"))
                    }
                };
                Ok(Data::new(*sid as u32, mime.clone(), data))
            }
            _ => Err(Error::malformed(Self::PATH, "expected 'is' plus string or blob")),
        }
    }
}

impl std::fmt::Display for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", Self::PATH, self.session_id, self.mime)?;
        match &self.data {
            DataPayload::Text(text) => write!(f, " {text}"),
            DataPayload::Blob(blob) => write!(f, " <{} bytes>", blob.len()),
        }
    }
}

/// SIG message: an event raised by one session towards a set of targets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signal {
    pub session_id: SessionId,
    pub event_id: u32,
    pub targets: SessionSet,
}

impl Signal {
    pub const PATH: &'static str = "/tuio2/sig";

    pub fn new(session_id: SessionId, event_id: u32, targets: SessionSet) -> Self {
        Signal { session_id, event_id, targets }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let mut args = vec![
            OscType::Int(self.session_id as i32),
            OscType::Int(self.event_id as i32),
        ];
        args.extend(self.targets.iter().map(|sid| OscType::Int(*sid as i32)));
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<Signal, Error> {
        let (head, rest) = match args {
            [OscType::Int(sid), OscType::Int(event), rest @ ..] => {
                ((*sid as u32, *event as u32), rest)
            }
            _ => return Err(Error::malformed(Self::PATH, "expected 'ii' prefix")),
        };
        let mut targets = SessionSet::new();
        for arg in rest {
            match arg {
                OscType::Int(sid) => {
                    targets.insert(*sid as u32);
                }
                _ => return Err(Error::malformed(Self::PATH, "targets must be int32")),
            }
        }
        Ok(Signal::new(head.0, head.1, targets))
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", Self::PATH, self.session_id, self.event_id)?;
        for sid in &self.targets {
            write!(f, " {sid}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_round_trip() {
        let ctl = Control::new(8, vec![0.0, 0.5, -1.0]);
        let mut out = Vec::new();
        ctl.imprint(&mut out);
        assert_eq!(out[0].args.len(), 4);
        assert_eq!(Control::parse(&out[0].args).unwrap(), ctl);
    }

    #[test]
    fn test_control_rejects_mixed_args() {
        let args = vec![OscType::Int(1), OscType::Float(0.5), OscType::Int(2)];
        assert!(Control::parse(&args).is_err());
    }

    #[test]
    fn test_data_text_round_trip() {
        let dat = Data::new(2, "text/plain", DataPayload::Text("hello".into()));
        let mut out = Vec::new();
        dat.imprint(&mut out);
        assert_eq!(Data::parse(&out[0].args).unwrap(), dat);
    }

    #[test]
    fn test_data_blob_round_trip() {
        let dat = Data::new(2, "application/octet-stream", DataPayload::Blob(vec![0, 255]));
        let mut out = Vec::new();
        dat.imprint(&mut out);
        assert_eq!(Data::parse(&out[0].args).unwrap(), dat);
    }

    #[test]
    fn test_signal_round_trip() {
        let sig = Signal::new(1, 99, [2, 3, 4].into_iter().collect());
        let mut out = Vec::new();
        sig.imprint(&mut out);
        assert_eq!(out[0].args.len(), 5);
        assert_eq!(Signal::parse(&out[0].args).unwrap(), sig);
    }
}
