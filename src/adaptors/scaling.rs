//! Axis scaling: explicit per-axis factors or autoconfiguration from the
//! frame's sensor dimensions against a target axis length.

use super::{Adaptor, ServerAdaptor};
use crate::bundle::BundleHandle;
use crate::error::Error;
use crate::geometry::Point3;
use crate::messages::Message;
use crate::types::Dimension;

#[derive(Debug, Clone)]
struct Scaling {
    x: f32,
    y: f32,
    z: f32,
    autoconf: bool,
    scale_accel: bool,
    x_axis_length: Dimension,
    y_axis_length: Dimension,
}

impl Scaling {
    fn process(&mut self, bundle: &mut BundleHandle) {
        for message in bundle.iter_mut() {
            // a frame both configures scaling and is never scaled itself
            if let Message::Frame(frame) = message {
                if frame.is_extended() && frame.sensor_width != 0 && frame.sensor_height != 0 {
                    if self.autoconf {
                        self.x = self.x_axis_length as f32 / frame.sensor_width as f32;
                        self.y = self.y_axis_length as f32 / frame.sensor_height as f32;
                    }
                    frame.sensor_width = self.x_axis_length;
                    frame.sensor_height = self.y_axis_length;
                }
                continue;
            }

            message.scale_velocity((self.x, self.y, self.z), self.scale_accel);
            message.scale_points((self.x, self.y, self.z));

            if let Some(point) = message.point() {
                // translate so the position ends up at pos * scale
                message.move_by(Point3::new(
                    point.x * (1.0 - self.x),
                    point.y * (1.0 - self.y),
                    point.z * (1.0 - self.z),
                ));
                // extents scale around the message's own position
                if let Message::Bounds(bounds) = message {
                    bounds.width *= self.x;
                    bounds.height *= self.y;
                    bounds.depth *= self.z;
                    bounds.area *= self.x * self.y;
                    bounds.volume *= self.x * self.y * self.z;
                }
            }
        }
    }
}

/// Client-side scaling adaptor.
pub struct ScalingAdaptor {
    inner: Scaling,
}

impl ScalingAdaptor {
    /// Autoconfiguring mode: factors are recomputed from every extended
    /// frame's sensor dimensions against the target axis lengths.
    pub fn autoconf(width: Dimension, height: Dimension, scale_accel: bool) -> Self {
        ScalingAdaptor {
            inner: Scaling {
                x: 1.0,
                y: 1.0,
                z: 1.0,
                autoconf: true,
                scale_accel,
                x_axis_length: width,
                y_axis_length: height,
            },
        }
    }

    /// Explicit per-axis factors.
    pub fn explicit(x: f32, y: f32, z: f32, scale_accel: bool) -> Self {
        ScalingAdaptor {
            inner: Scaling {
                x,
                y,
                z,
                autoconf: false,
                scale_accel,
                x_axis_length: 1920,
                y_axis_length: 1080,
            },
        }
    }

    pub fn set_x_scaling(&mut self, factor: f32) -> f32 {
        std::mem::replace(&mut self.inner.x, factor)
    }

    pub fn set_y_scaling(&mut self, factor: f32) -> f32 {
        std::mem::replace(&mut self.inner.y, factor)
    }

    pub fn set_z_scaling(&mut self, factor: f32) -> f32 {
        std::mem::replace(&mut self.inner.z, factor)
    }

    pub fn set_auto(&mut self, autoconf: bool) -> bool {
        std::mem::replace(&mut self.inner.autoconf, autoconf)
    }

    pub fn set_scale_accel(&mut self, scale: bool) -> bool {
        std::mem::replace(&mut self.inner.scale_accel, scale)
    }

    pub fn set_x_length(&mut self, length: Dimension) -> Dimension {
        std::mem::replace(&mut self.inner.x_axis_length, length)
    }

    pub fn set_y_length(&mut self, length: Dimension) -> Dimension {
        std::mem::replace(&mut self.inner.y_axis_length, length)
    }
}

impl Adaptor for ScalingAdaptor {
    fn process_bundle(&mut self, bundle: &BundleHandle) -> Result<BundleHandle, Error> {
        let mut output = bundle.clone();
        self.inner.process(&mut output);
        Ok(output)
    }
}

/// Server-side scaling; autoconfiguration is not allowed here because the
/// server has no incoming frames to configure from.
pub struct ServerScalingAdaptor {
    inner: Scaling,
}

impl ServerScalingAdaptor {
    pub fn explicit(x: f32, y: f32, z: f32, scale_accel: bool) -> Self {
        ServerScalingAdaptor {
            inner: Scaling {
                x,
                y,
                z,
                autoconf: false,
                scale_accel,
                x_axis_length: 1920,
                y_axis_length: 1080,
            },
        }
    }
}

impl ServerAdaptor for ServerScalingAdaptor {
    fn process_bundle(&mut self, bundle: &mut BundleHandle) -> Result<(), Error> {
        if self.inner.autoconf {
            return Err(Error::Config("autoconf scaling is not allowed in server mode".into()));
        }
        self.inner.process(bundle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Velocity;
    use crate::messages::{Alive, Frame, Pointer};
    use crate::types::Timetag;

    fn bundle_with_pointer(ptr: Pointer, dims: Option<(u16, u16)>) -> BundleHandle {
        let frame = match dims {
            Some((w, h)) => Frame::extended(1, Timetag::new(1, 0), "src", 1, 1, w, h),
            None => Frame::new(1, Timetag::new(1, 0)),
        };
        let sid = ptr.session_id;
        BundleHandle::assemble(
            frame,
            vec![Message::Pointer(ptr)],
            Alive::new([sid].into_iter().collect()),
        )
    }

    #[test]
    fn test_identity_scaling_is_noop() {
        let mut adaptor = ScalingAdaptor::explicit(1.0, 1.0, 1.0, true);
        let mut ptr = Pointer::new_2d(1, 0, 0, 0, 123.0, 456.0, 2.0, 1.0);
        ptr.velocity = Velocity::new(5.0, 6.0, 0.0);
        ptr.acceleration = 7.0;
        let bundle = bundle_with_pointer(ptr, None);
        let out = adaptor.process_bundle(&bundle).unwrap();
        assert_eq!(out, bundle);
    }

    #[test]
    fn test_positions_scale_towards_origin() {
        let mut adaptor = ScalingAdaptor::explicit(2.0, 0.5, 1.0, false);
        let ptr = Pointer::new_2d(1, 0, 0, 0, 10.0, 10.0, 0.0, 1.0);
        let out = adaptor
            .process_bundle(&bundle_with_pointer(ptr, None))
            .unwrap();
        let scaled = out.nth_of::<Pointer>(0).unwrap();
        assert!((scaled.point.x - 20.0).abs() < 1e-4);
        assert!((scaled.point.y - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_autoconf_from_frame_dimensions() {
        let mut adaptor = ScalingAdaptor::autoconf(960, 540, false);
        let ptr = Pointer::new_2d(1, 0, 0, 0, 1920.0, 1080.0, 0.0, 1.0);
        let out = adaptor
            .process_bundle(&bundle_with_pointer(ptr, Some((1920, 1080))))
            .unwrap();
        let frame = out.frame().unwrap();
        assert_eq!(frame.sensor_width, 960);
        assert_eq!(frame.sensor_height, 540);
        let scaled = out.nth_of::<Pointer>(0).unwrap();
        assert!((scaled.point.x - 960.0).abs() < 1e-3);
        assert!((scaled.point.y - 540.0).abs() < 1e-3);
    }

    #[test]
    fn test_velocity_and_acceleration_recomposed() {
        let mut adaptor = ScalingAdaptor::explicit(2.0, 1.0, 1.0, true);
        let mut ptr = Pointer::new_2d(1, 0, 0, 0, 0.0, 0.0, 0.0, 1.0);
        ptr.velocity = Velocity::new(3.0, 0.0, 0.0);
        ptr.acceleration = 1.5;
        let out = adaptor
            .process_bundle(&bundle_with_pointer(ptr, None))
            .unwrap();
        let scaled = out.nth_of::<Pointer>(0).unwrap();
        assert!((scaled.velocity.x - 6.0).abs() < 1e-4);
        assert!((scaled.acceleration - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_viewport_ratio_remap() {
        // 1920x1080x20 sensor region remapped onto a 640x480x10 viewport
        let mut adaptor = ScalingAdaptor::explicit(
            640.0 / 1920.0,
            480.0 / 1080.0,
            10.0 / 20.0,
            false,
        );
        let ptr = Pointer::new_3d(1, 0, 0, 0, 20.0, 20.0, 20.0, 0.0, 1.0);
        let bundle = BundleHandle::assemble(
            Frame::new(1, Timetag::new(1, 0)),
            vec![Message::Pointer(ptr)],
            Alive::new([1].into_iter().collect()),
        );
        let out = adaptor.process_bundle(&bundle).unwrap();
        let scaled = out.nth_of::<Pointer>(0).unwrap().point;
        assert!((scaled.x - 20.0 * 640.0 / 1920.0).abs() < 1.0);
        assert!((scaled.y - 20.0 * 480.0 / 1080.0).abs() < 1.0);
        assert!((scaled.z - 10.0).abs() < 1.0);
    }

    #[test]
    fn test_server_variant_rejects_autoconf() {
        let mut adaptor = ServerScalingAdaptor::explicit(1.0, 1.0, 1.0, false);
        adaptor.inner.autoconf = true;
        let mut bundle = BundleHandle::new();
        bundle.push(Message::Frame(Frame::new(1, Timetag::IMMEDIATE)));
        assert!(adaptor.process_bundle(&mut bundle).is_err());
    }

    #[test]
    fn test_bounds_extents_scale() {
        use crate::messages::Bounds;
        let mut adaptor = ScalingAdaptor::explicit(2.0, 2.0, 1.0, false);
        let bnd = Bounds::new_2d(1, 5.0, 5.0, 0.0, 4.0, 2.0, 8.0);
        let bundle = BundleHandle::assemble(
            Frame::new(1, Timetag::new(1, 0)),
            vec![Message::Bounds(bnd)],
            Alive::new([1].into_iter().collect()),
        );
        let out = adaptor.process_bundle(&bundle).unwrap();
        let scaled = out.nth_of::<Bounds>(0).unwrap();
        assert!((scaled.width - 8.0).abs() < 1e-4);
        assert!((scaled.height - 4.0).abs() < 1e-4);
        assert!((scaled.area - 32.0).abs() < 1e-4);
        assert!((scaled.point.x - 10.0).abs() < 1e-4);
    }
}
