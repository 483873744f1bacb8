use rosc::{OscMessage, OscType};

use crate::error::Error;
use crate::types::{
    compile_dimensions, decompile_dimensions, u32_to_ipv4, Dimension, FrameId, InstanceId,
    SessionSet, Timetag,
};

/// FRM message: opens every TUIO 2.0 bundle.
///
/// The short form carries only the frame id and timetag; the extended form
/// adds the source application name, IPv4 address, instance id and the
/// packed sensor dimensions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub frame_id: FrameId,
    pub time: Timetag,
    pub app_name: String,
    pub address: u32,
    pub instance: InstanceId,
    pub sensor_width: Dimension,
    pub sensor_height: Dimension,
}

impl Frame {
    pub const PATH: &'static str = "/tuio2/frm";

    pub fn new(frame_id: FrameId, time: Timetag) -> Self {
        Frame { frame_id, time, ..Default::default() }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn extended(
        frame_id: FrameId,
        time: Timetag,
        app_name: impl Into<String>,
        address: u32,
        instance: InstanceId,
        sensor_width: Dimension,
        sensor_height: Dimension,
    ) -> Self {
        Frame {
            frame_id,
            time,
            app_name: app_name.into(),
            address,
            instance,
            sensor_width,
            sensor_height,
        }
    }

    pub fn is_extended(&self) -> bool {
        !self.app_name.is_empty()
            || self.address != 0
            || self.instance != 0
            || self.sensor_width != 0
            || self.sensor_height != 0
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let mut args = vec![
            OscType::Int(self.frame_id as i32),
            OscType::Time(self.time.into()),
        ];
        if self.is_extended() {
            args.push(OscType::String(self.app_name.clone()));
            args.push(OscType::Int(self.address as i32));
            args.push(OscType::Int(self.instance as i32));
            args.push(OscType::Int(
                compile_dimensions(self.sensor_width, self.sensor_height) as i32,
            ));
        }
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<Frame, Error> {
        let mut frame = Frame::default();
        match args {
            [OscType::Int(id), OscType::Time(time)] => {
                frame.frame_id = *id as u32;
                frame.time = (*time).into();
            }
            [OscType::Int(id), OscType::Time(time), OscType::String(app), OscType::Int(addr), OscType::Int(instance), OscType::Int(dim)] =>
            {
                frame.frame_id = *id as u32;
                frame.time = (*time).into();
                frame.app_name = app.clone();
                frame.address = *addr as u32;
                frame.instance = *instance as u32;
                let (w, h) = decompile_dimensions(*dim as u32);
                frame.sensor_width = w;
                frame.sensor_height = h;
            }
            _ => return Err(Error::malformed(Self::PATH, "expected 'it' or 'itsiii'")),
        }
        Ok(frame)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", Self::PATH, self.frame_id, self.time)?;
        if self.is_extended() {
            write!(
                f,
                " {} {} {} {}x{}",
                self.app_name,
                u32_to_ipv4(self.address),
                self.instance,
                self.sensor_width,
                self.sensor_height
            )?;
        }
        Ok(())
    }
}

/// ALV message: closes every TUIO 2.0 bundle with the set of live sessions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Alive {
    pub alives: SessionSet,
}

impl Alive {
    pub const PATH: &'static str = "/tuio2/alv";

    pub fn new(alives: SessionSet) -> Self {
        Alive { alives }
    }

    pub fn contains(&self, sid: u32) -> bool {
        self.alives.contains(&sid)
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let args = self
            .alives
            .iter()
            .map(|sid| OscType::Int(*sid as i32))
            .collect();
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<Alive, Error> {
        let mut alives = SessionSet::new();
        for arg in args {
            match arg {
                OscType::Int(sid) => {
                    alives.insert(*sid as u32);
                }
                _ => return Err(Error::malformed(Self::PATH, "expected int32 session ids")),
            }
        }
        Ok(Alive { alives })
    }
}

impl std::fmt::Display for Alive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Self::PATH)?;
        for sid in &self.alives {
            write!(f, " {sid}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_imprint_layout() {
        let frm = Frame::extended(1234, Timetag::new(5, 0), "pipeline", 0x7f000001, 1, 1920, 1080);
        let mut out = Vec::new();
        frm.imprint(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].addr, Frame::PATH);
        assert_eq!(out[0].args.len(), 6);
        // (1920 << 16) | 1080 = 125830200
        assert_eq!(out[0].args[5], OscType::Int(125_830_200));
    }

    #[test]
    fn test_frame_round_trip() {
        let frm = Frame::extended(7, Timetag::new(100, 42), "src", 0x0a000001, 3, 800, 600);
        let mut out = Vec::new();
        frm.imprint(&mut out);
        assert_eq!(Frame::parse(&out[0].args).unwrap(), frm);
    }

    #[test]
    fn test_short_frame_round_trip() {
        let frm = Frame::new(9, Timetag::IMMEDIATE);
        let mut out = Vec::new();
        frm.imprint(&mut out);
        assert_eq!(out[0].args.len(), 2);
        assert_eq!(Frame::parse(&out[0].args).unwrap(), frm);
    }

    #[test]
    fn test_frame_rejects_partial_tail() {
        let args = vec![
            OscType::Int(1),
            OscType::Time(Timetag::IMMEDIATE.into()),
            OscType::String("src".into()),
            OscType::Int(0),
            OscType::Int(0),
        ];
        assert!(Frame::parse(&args).is_err());
    }

    #[test]
    fn test_alive_round_trip() {
        let alv = Alive::new([42, 43, 44].into_iter().collect());
        let mut out = Vec::new();
        alv.imprint(&mut out);
        assert_eq!(out[0].addr, Alive::PATH);
        assert_eq!(out[0].args.len(), 3);
        assert_eq!(Alive::parse(&out[0].args).unwrap(), alv);
    }

    #[test]
    fn test_alive_empty() {
        let alv = Alive::default();
        let mut out = Vec::new();
        alv.imprint(&mut out);
        assert!(out[0].args.is_empty());
        assert_eq!(Alive::parse(&out[0].args).unwrap(), alv);
    }
}
