//! Viewport projector: selects a match viewport, clips positional messages
//! against it and remaps survivors into the viewport's local frame.

use uuid::Uuid;

use super::Adaptor;
use crate::bundle::BundleHandle;
use crate::error::Error;
use crate::geometry::{
    rotate_around_center_pitch, rotate_around_center_roll, rotate_around_center_yaw, Angle3,
    Point3,
};
use crate::messages::{Message, Viewport};

/// Bounding viewport of a set of viewports: each box is rotated around its
/// center, the corners are collected, and the result is the axis-aligned
/// region spanning them, centered on its half-extents.
pub fn bounding_viewport(viewports: &[Viewport]) -> Viewport {
    let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
    let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);

    for viewport in viewports {
        for corner in corners(viewport) {
            min.x = min.x.min(corner.x);
            min.y = min.y.min(corner.y);
            min.z = min.z.min(corner.z);
            max.x = max.x.max(corner.x);
            max.y = max.y.max(corner.y);
            max.z = max.z.max(corner.z);
        }
    }

    let width = (max.x - min.x).max(0.0);
    let height = (max.y - min.y).max(0.0);
    let depth = (max.z - min.z).max(0.0);
    Viewport::new(
        Uuid::nil(),
        Point3::new(width / 2.0, height / 2.0, depth / 2.0),
        Angle3::default(),
        width as u32,
        height as u32,
        depth as u32,
    )
}

/// The eight world-space corners of a viewport's box: the region spans the
/// center plus/minus the half extents, rotated around the center.
fn corners(viewport: &Viewport) -> [Point3; 8] {
    let half = Point3::new(
        viewport.width as f32 / 2.0,
        viewport.height as f32 / 2.0,
        viewport.depth as f32 / 2.0,
    );
    let mut result = [
        Point3::new(-half.x, -half.y, -half.z),
        Point3::new(-half.x, half.y, -half.z),
        Point3::new(half.x, half.y, -half.z),
        Point3::new(half.x, -half.y, -half.z),
        Point3::new(-half.x, -half.y, half.z),
        Point3::new(-half.x, half.y, half.z),
        Point3::new(half.x, half.y, half.z),
        Point3::new(half.x, -half.y, half.z),
    ];
    for corner in result.iter_mut() {
        rotate_around_center_yaw(corner, Point3::default(), viewport.angle.yaw);
        rotate_around_center_pitch(corner, Point3::default(), viewport.angle.pitch);
        rotate_around_center_roll(corner, Point3::default(), viewport.angle.roll);
        *corner += viewport.center;
    }
    result
}

enum Mode {
    /// Follow viewport updates for a uuid; the nil uuid means "bounding box
    /// of every received viewport".
    Adaptive { follow: Uuid, seen_any: bool },
    Fixed,
}

pub struct ViewportProjector {
    mode: Mode,
    matched: Viewport,
    strip: bool,
}

impl ViewportProjector {
    /// Adaptive projector following the given uuid (nil for wildcard).
    pub fn adaptive(follow: Uuid, strip: bool) -> Self {
        let mut matched = Viewport::default();
        matched.uuid = follow;
        ViewportProjector {
            mode: Mode::Adaptive { follow, seen_any: false },
            matched,
            strip,
        }
    }

    /// Projector with a fixed match viewport.
    pub fn fixed(viewport: Viewport, strip: bool) -> Self {
        ViewportProjector { mode: Mode::Fixed, matched: viewport, strip }
    }

    fn update_match(&mut self, bundle: &BundleHandle) {
        let Mode::Adaptive { follow, seen_any } = &mut self.mode else {
            return;
        };
        let received: Vec<&Viewport> = bundle.all_of::<Viewport>().collect();
        if received.is_empty() {
            return;
        }
        *seen_any = true;
        if follow.is_nil() {
            let mut all = vec![self.matched.clone()];
            all.extend(received.into_iter().cloned());
            self.matched = bounding_viewport(&all);
        } else if let Some(update) = received.iter().rev().find(|v| v.uuid == *follow) {
            self.matched = (*update).clone();
        }
    }

    /// The match with rotations zeroed and centered on its half-extents.
    fn normalized_match(&self) -> Viewport {
        let mut normalized = self.matched.clone();
        normalized.angle = Angle3::default();
        normalized.center = Point3::new(
            normalized.width as f32 / 2.0,
            normalized.height as f32 / 2.0,
            normalized.depth as f32 / 2.0,
        );
        normalized
    }

    /// Point transformed into the viewport's local frame: inverse rotations
    /// around the viewport center.
    fn into_local_frame(&self, point: Point3) -> Point3 {
        let mut local = point;
        let center = self.matched.center;
        rotate_around_center_yaw(&mut local, center, -self.matched.angle.yaw);
        rotate_around_center_pitch(&mut local, center, -self.matched.angle.pitch);
        rotate_around_center_roll(&mut local, center, -self.matched.angle.roll);
        local
    }

    fn in_box(&self, local: Point3) -> bool {
        let center = self.matched.center;
        let half_w = self.matched.width as f32 / 2.0;
        let half_h = self.matched.height as f32 / 2.0;
        let half_d = self.matched.depth as f32 / 2.0;
        local.x >= center.x - half_w
            && local.x <= center.x + half_w
            && local.y >= center.y - half_h
            && local.y <= center.y + half_h
            && local.z >= center.z - half_d
            && local.z <= center.z + half_d
    }
}

impl Adaptor for ViewportProjector {
    fn process_bundle(&mut self, bundle: &BundleHandle) -> Result<BundleHandle, Error> {
        self.update_match(bundle);

        // wildcard adaptive mode with nothing received yet: forward unchanged
        if let Mode::Adaptive { follow, seen_any } = &self.mode {
            if follow.is_nil() && !*seen_any {
                return Ok(bundle.clone());
            }
        }

        let half_extents = Point3::new(
            self.matched.width as f32 / 2.0,
            self.matched.height as f32 / 2.0,
            self.matched.depth as f32 / 2.0,
        );

        let mut output = BundleHandle::new();
        for message in bundle.iter() {
            match message {
                Message::Frame(_) => {
                    output.push(message.clone());
                    output.push(Message::Viewport(self.normalized_match()));
                }
                Message::Alive(_) => output.push(message.clone()),
                Message::Viewport(_) => {
                    if !self.strip {
                        output.push(message.clone());
                    }
                }
                _ => {
                    let mut out = message.clone();
                    if let Some(original) = out.point() {
                        let local = self.into_local_frame(original);
                        if !self.in_box(local) {
                            continue;
                        }
                        out.set_point(half_extents + (local - self.matched.center));
                    }
                    out.rotate_independent(
                        self.matched.angle.yaw,
                        self.matched.angle.pitch,
                        self.matched.angle.roll,
                    );
                    output.push(out);
                }
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Alive, Frame, Pointer};
    use crate::types::Timetag;

    fn match_viewport(center: Point3, w: u32, h: u32, d: u32) -> Viewport {
        Viewport::new(Uuid::new_v4(), center, Angle3::default(), w, h, d)
    }

    fn bundle_with_pointers(points: &[(u32, f32, f32)]) -> BundleHandle {
        let middle = points
            .iter()
            .map(|(sid, x, y)| {
                Message::Pointer(Pointer::new_2d(*sid, 0, 0, 0, *x, *y, 0.0, 1.0))
            })
            .collect();
        BundleHandle::assemble(
            Frame::new(1, Timetag::new(1, 0)),
            middle,
            Alive::new(points.iter().map(|(sid, _, _)| *sid).collect()),
        )
    }

    #[test]
    fn test_out_of_box_contacts_dropped() {
        let viewport = match_viewport(Point3::new(50.0, 50.0, 0.0), 100, 100, 0);
        let mut projector = ViewportProjector::fixed(viewport, false);
        let out = projector
            .process_bundle(&bundle_with_pointers(&[(1, 60.0, 60.0), (2, 500.0, 60.0)]))
            .unwrap();
        let pointers: Vec<&Pointer> = out.all_of::<Pointer>().collect();
        assert_eq!(pointers.len(), 1);
        assert_eq!(pointers[0].session_id, 1);
    }

    #[test]
    fn test_projection_closure() {
        // every surviving position lands inside the normalized box
        let viewport = match_viewport(Point3::new(200.0, 100.0, 0.0), 100, 60, 0);
        let mut projector = ViewportProjector::fixed(viewport, false);
        let out = projector
            .process_bundle(&bundle_with_pointers(&[
                (1, 160.0, 80.0),
                (2, 240.0, 120.0),
                (3, 200.0, 100.0),
                (4, 1000.0, 1000.0),
            ]))
            .unwrap();
        for ptr in out.all_of::<Pointer>() {
            assert!(ptr.point.x >= 0.0 && ptr.point.x <= 100.0);
            assert!(ptr.point.y >= 0.0 && ptr.point.y <= 60.0);
        }
        // the center maps to the half-extents point
        let center = out.all_of::<Pointer>().find(|p| p.session_id == 3).unwrap();
        assert!((center.point.x - 50.0).abs() < 1e-3);
        assert!((center.point.y - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_normalized_viewport_emitted_after_frame() {
        let viewport = match_viewport(Point3::new(50.0, 50.0, 0.0), 100, 100, 0);
        let mut projector = ViewportProjector::fixed(viewport, false);
        let out = projector
            .process_bundle(&bundle_with_pointers(&[(1, 50.0, 50.0)]))
            .unwrap();
        assert!(matches!(out.messages()[0], Message::Frame(_)));
        let emitted = match &out.messages()[1] {
            Message::Viewport(v) => v,
            other => panic!("expected viewport, got {other}"),
        };
        assert_eq!(emitted.angle, Angle3::default());
        assert_eq!(emitted.center, Point3::new(50.0, 50.0, 0.0));
    }

    #[test]
    fn test_strip_removes_incoming_viewports() {
        let viewport = match_viewport(Point3::new(50.0, 50.0, 0.0), 100, 100, 0);
        let mut projector = ViewportProjector::fixed(viewport.clone(), true);
        let bundle = bundle_with_pointers(&[(1, 50.0, 50.0)]);
        let mut with_viewport = BundleHandle::new();
        for msg in bundle.iter() {
            with_viewport.push(msg.clone());
            if matches!(msg, Message::Frame(_)) {
                with_viewport.push(Message::Viewport(viewport.clone()));
            }
        }
        let out = projector.process_bundle(&with_viewport).unwrap();
        // only the synthesized normalized viewport remains
        assert_eq!(out.all_of::<Viewport>().count(), 1);
    }

    #[test]
    fn test_wildcard_without_viewports_forwards_unchanged() {
        let mut projector = ViewportProjector::adaptive(Uuid::nil(), false);
        let bundle = bundle_with_pointers(&[(1, 123.0, 456.0)]);
        let out = projector.process_bundle(&bundle).unwrap();
        assert_eq!(out, bundle);
    }

    #[test]
    fn test_adaptive_follows_named_viewport() {
        let follow = Uuid::new_v4();
        let mut projector = ViewportProjector::adaptive(follow, false);
        let mut viewport = match_viewport(Point3::new(50.0, 50.0, 0.0), 100, 100, 0);
        viewport.uuid = follow;

        let mut bundle = BundleHandle::new();
        bundle.push(Message::Frame(Frame::new(1, Timetag::new(1, 0))));
        bundle.push(Message::Viewport(viewport));
        bundle.push(Message::Pointer(Pointer::new_2d(1, 0, 0, 0, 60.0, 60.0, 0.0, 1.0)));
        bundle.push(Message::Pointer(Pointer::new_2d(2, 0, 0, 0, 600.0, 60.0, 0.0, 1.0)));
        bundle.push(Message::Alive(Alive::new([1, 2].into_iter().collect())));

        let out = projector.process_bundle(&bundle).unwrap();
        assert_eq!(out.all_of::<Pointer>().count(), 1);
    }

    #[test]
    fn test_bounding_viewport_spans_inputs() {
        let a = match_viewport(Point3::new(50.0, 50.0, 0.0), 100, 100, 0);
        let b = match_viewport(Point3::new(250.0, 50.0, 0.0), 100, 100, 0);
        let bounding = bounding_viewport(&[a, b]);
        // world regions [0..100] and [200..300] along x span 300 units
        assert_eq!(bounding.width, 300);
        assert_eq!(bounding.height, 100);
    }
}
