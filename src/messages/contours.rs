use rosc::{OscMessage, OscType};

use crate::error::Error;
use crate::geometry::Point2;
use crate::types::SessionId;

fn parse_point_list(path: &str, args: &[OscType]) -> Result<(SessionId, Vec<Point2>), Error> {
    let (sid, rest) = match args.split_first() {
        Some((OscType::Int(sid), rest)) => (*sid as u32, rest),
        _ => return Err(Error::malformed(path, "expected leading session id")),
    };
    if rest.len() % 2 != 0 {
        return Err(Error::malformed(path, "dangling coordinate"));
    }
    let mut points = Vec::with_capacity(rest.len() / 2);
    for pair in rest.chunks(2) {
        match pair {
            [OscType::Float(x), OscType::Float(y)] => points.push(Point2::new(*x, *y)),
            _ => return Err(Error::malformed(path, "coordinates must be floats")),
        }
    }
    Ok((sid, points))
}

fn imprint_point_list(path: &str, sid: SessionId, points: &[Point2], out: &mut Vec<OscMessage>) {
    let mut args = vec![OscType::Int(sid as i32)];
    for point in points {
        args.push(OscType::Float(point.x));
        args.push(OscType::Float(point.y));
    }
    out.push(OscMessage { addr: path.to_string(), args });
}

fn fmt_point_list(
    f: &mut std::fmt::Formatter<'_>,
    path: &str,
    sid: SessionId,
    points: &[Point2],
) -> std::fmt::Result {
    write!(f, "{path} {sid}")?;
    for point in points {
        write!(f, " {point}")?;
    }
    Ok(())
}

/// CHG message: convex hull of a contact region.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConvexHull {
    pub session_id: SessionId,
    pub points: Vec<Point2>,
}

impl ConvexHull {
    pub const PATH: &'static str = "/tuio2/chg";

    pub fn new(session_id: SessionId, points: Vec<Point2>) -> Self {
        ConvexHull { session_id, points }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        imprint_point_list(Self::PATH, self.session_id, &self.points, out);
    }

    pub fn parse(args: &[OscType]) -> Result<ConvexHull, Error> {
        let (session_id, points) = parse_point_list(Self::PATH, args)?;
        Ok(ConvexHull { session_id, points })
    }
}

impl std::fmt::Display for ConvexHull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_point_list(f, Self::PATH, self.session_id, &self.points)
    }
}

/// OCG message: outer contour of a contact region.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OuterContour {
    pub session_id: SessionId,
    pub points: Vec<Point2>,
}

impl OuterContour {
    pub const PATH: &'static str = "/tuio2/ocg";

    pub fn new(session_id: SessionId, points: Vec<Point2>) -> Self {
        OuterContour { session_id, points }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        imprint_point_list(Self::PATH, self.session_id, &self.points, out);
    }

    pub fn parse(args: &[OscType]) -> Result<OuterContour, Error> {
        let (session_id, points) = parse_point_list(Self::PATH, args)?;
        Ok(OuterContour { session_id, points })
    }
}

impl std::fmt::Display for OuterContour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_point_list(f, Self::PATH, self.session_id, &self.points)
    }
}

/// ICG message: list of inner contours (holes) of a contact region.
///
/// On the wire, contours are separated by a `True` marker; the draft leaves
/// the framing of the list-of-lists open.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InnerContour {
    pub session_id: SessionId,
    pub contours: Vec<Vec<Point2>>,
}

impl InnerContour {
    pub const PATH: &'static str = "/tuio2/icg";

    pub fn new(session_id: SessionId, contours: Vec<Vec<Point2>>) -> Self {
        InnerContour { session_id, contours }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let mut args = vec![OscType::Int(self.session_id as i32)];
        for (i, contour) in self.contours.iter().enumerate() {
            if i > 0 {
                args.push(OscType::Bool(true));
            }
            for point in contour {
                args.push(OscType::Float(point.x));
                args.push(OscType::Float(point.y));
            }
        }
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<InnerContour, Error> {
        let (sid, mut rest) = match args.split_first() {
            Some((OscType::Int(sid), rest)) => (*sid as u32, rest),
            _ => return Err(Error::malformed(Self::PATH, "expected leading session id")),
        };
        let mut contours = Vec::new();
        let mut current = Vec::new();
        while !rest.is_empty() {
            match rest {
                [OscType::Bool(true), tail @ ..] => {
                    contours.push(std::mem::take(&mut current));
                    rest = tail;
                }
                [OscType::Float(x), OscType::Float(y), tail @ ..] => {
                    current.push(Point2::new(*x, *y));
                    rest = tail;
                }
                _ => {
                    return Err(Error::malformed(
                        Self::PATH,
                        "expected coordinate pair or contour separator",
                    ))
                }
            }
        }
        if !current.is_empty() || !contours.is_empty() {
            contours.push(current);
        }
        Ok(InnerContour { session_id: sid, contours })
    }
}

impl std::fmt::Display for InnerContour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", Self::PATH, self.session_id)?;
        for contour in &self.contours {
            write!(f, " {{")?;
            for point in contour {
                write!(f, " {point}")?;
            }
            write!(f, " }}")?;
        }
        Ok(())
    }
}

/// One horizontal span of an area map.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AreaSpan {
    pub origin: Point2,
    pub width: f32,
}

/// ARG message: region described as a map of horizontal spans.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Area {
    pub session_id: SessionId,
    pub spans: Vec<AreaSpan>,
}

impl Area {
    pub const PATH: &'static str = "/tuio2/arg";

    pub fn new(session_id: SessionId, spans: Vec<AreaSpan>) -> Self {
        Area { session_id, spans }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let mut args = vec![OscType::Int(self.session_id as i32)];
        for span in &self.spans {
            args.push(OscType::Float(span.origin.x));
            args.push(OscType::Float(span.origin.y));
            args.push(OscType::Float(span.width));
        }
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<Area, Error> {
        let (sid, rest) = match args.split_first() {
            Some((OscType::Int(sid), rest)) => (*sid as u32, rest),
            _ => return Err(Error::malformed(Self::PATH, "expected leading session id")),
        };
        if rest.len() % 3 != 0 {
            return Err(Error::malformed(Self::PATH, "dangling span field"));
        }
        let mut spans = Vec::with_capacity(rest.len() / 3);
        for triple in rest.chunks(3) {
            match triple {
                [OscType::Float(x), OscType::Float(y), OscType::Float(width)] => {
                    spans.push(AreaSpan { origin: Point2::new(*x, *y), width: *width })
                }
                _ => return Err(Error::malformed(Self::PATH, "span fields must be floats")),
            }
        }
        Ok(Area { session_id: sid, spans })
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", Self::PATH, self.session_id)?;
        for span in &self.spans {
            write!(f, " {}+{}", span.origin, span.width)?;
        }
        Ok(())
    }
}

/// RAW message: opaque sensor samples for a contact.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Raw {
    pub session_id: SessionId,
    pub sample_width: f32,
    pub samples: Vec<u8>,
}

impl Raw {
    pub const PATH: &'static str = "/tuio2/raw";

    pub fn new(session_id: SessionId, sample_width: f32, samples: Vec<u8>) -> Self {
        Raw { session_id, sample_width, samples }
    }

    pub fn imprint(&self, out: &mut Vec<OscMessage>) {
        let args = vec![
            OscType::Int(self.session_id as i32),
            OscType::Float(self.sample_width),
            OscType::Blob(self.samples.clone()),
        ];
        out.push(OscMessage { addr: Self::PATH.to_string(), args });
    }

    pub fn parse(args: &[OscType]) -> Result<Raw, Error> {
        match args {
            [OscType::Int(sid), OscType::Float(width), OscType::Blob(samples)] => {
                Ok(Raw::new(*sid as u32, *width, samples.clone()))
            }
            _ => Err(Error::malformed(Self::PATH, "expected 'ifb'")),
        }
    }
}

impl std::fmt::Display for Raw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} <{} bytes>",
            Self::PATH,
            self.session_id,
            self.sample_width,
            self.samples.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convex_hull_round_trip() {
        let chg = ConvexHull::new(
            6,
            vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.5, 1.0)],
        );
        let mut out = Vec::new();
        chg.imprint(&mut out);
        assert_eq!(out[0].args.len(), 7);
        assert_eq!(ConvexHull::parse(&out[0].args).unwrap(), chg);
    }

    #[test]
    fn test_outer_contour_rejects_dangling_coordinate() {
        let args = vec![OscType::Int(1), OscType::Float(0.5)];
        assert!(OuterContour::parse(&args).is_err());
    }

    #[test]
    fn test_inner_contour_round_trip() {
        let icg = InnerContour::new(
            2,
            vec![
                vec![Point2::new(0.1, 0.1), Point2::new(0.2, 0.2)],
                vec![Point2::new(0.7, 0.7)],
            ],
        );
        let mut out = Vec::new();
        icg.imprint(&mut out);
        assert_eq!(InnerContour::parse(&out[0].args).unwrap(), icg);
    }

    #[test]
    fn test_area_round_trip() {
        let arg = Area::new(
            3,
            vec![
                AreaSpan { origin: Point2::new(0.3, 10.0), width: 10.0 },
                AreaSpan { origin: Point2::new(0.8, 10.0), width: 10.0 },
            ],
        );
        let mut out = Vec::new();
        arg.imprint(&mut out);
        assert_eq!(Area::parse(&out[0].args).unwrap(), arg);
    }

    #[test]
    fn test_raw_round_trip() {
        let raw = Raw::new(4, 8.0, vec![0xde, 0xad, 0xbe, 0xef]);
        let mut out = Vec::new();
        raw.imprint(&mut out);
        assert_eq!(Raw::parse(&out[0].args).unwrap(), raw);
    }
}
