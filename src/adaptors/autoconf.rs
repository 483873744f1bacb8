//! Coordinate autoconfigurator: builds a relative topology of sensors from
//! neighbour descriptors and positions every contact in a common frame.
//!
//! Primitives (sensors, groups, pivots) are keyed by uuid. Placement is a
//! fixed-point computation: elect a pivot as origin, breadth-first place its
//! neighbourhood by averaging spherical offsets, repeat until stable.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use tracing::warn;
use uuid::Uuid;

use super::viewport::bounding_viewport;
use super::Adaptor;
use crate::bundle::BundleHandle;
use crate::error::Error;
use crate::geometry::{cartesian_to_spherical, spherical_to_cartesian, Point3, Velocity};
use crate::messages::{
    CoordinateTranslationMode, GroupMember, Message, Neighbour, SensorProperties, Viewport,
};

const ROLE_SENSOR: u8 = 0x01;
const ROLE_GROUP: u8 = 0x02;
const ROLE_PIVOT: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ViewportMode {
    #[default]
    Unset,
    Received,
    Awaits,
    Computed,
}

#[derive(Debug, Clone)]
struct Primitive {
    role: u8,
    viewport_mode: ViewportMode,
    configured: bool,
    parent: Option<Uuid>,
    children: IndexSet<Uuid>,
    position: Point3,
    correction_azimuth: f32,
    correction_altitude: f32,
    setup_mode: CoordinateTranslationMode,
    viewport: Viewport,
}

impl Primitive {
    fn new(default_mode: CoordinateTranslationMode) -> Self {
        Primitive {
            role: 0,
            viewport_mode: ViewportMode::Unset,
            configured: false,
            parent: None,
            children: IndexSet::new(),
            position: Point3::default(),
            correction_azimuth: 0.0,
            correction_altitude: 0.0,
            setup_mode: default_mode,
            viewport: Viewport::default(),
        }
    }

    fn is_sensor(&self) -> bool {
        self.role & ROLE_SENSOR != 0
    }

    fn is_group(&self) -> bool {
        self.role & ROLE_GROUP != 0
    }

    fn is_pivot(&self) -> bool {
        self.role & ROLE_PIVOT != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NeighbourEntry {
    azimuth: f32,
    altitude: f32,
    distance: f32,
}

pub struct Autoconfigurator {
    default_mode: CoordinateTranslationMode,
    update_required: bool,
    primitives: IndexMap<Uuid, Primitive>,
    /// Directed neighbour entries `(from, to) -> offset`.
    references_from: IndexMap<Uuid, IndexMap<Uuid, NeighbourEntry>>,
    /// Reverse index: who points at a uuid.
    references_to: IndexMap<Uuid, IndexSet<Uuid>>,
}

impl Default for Autoconfigurator {
    fn default() -> Self {
        Autoconfigurator::new(CoordinateTranslationMode::TranslateContinuous)
    }
}

impl Autoconfigurator {
    pub fn new(default_mode: CoordinateTranslationMode) -> Self {
        Autoconfigurator {
            default_mode,
            update_required: false,
            primitives: IndexMap::new(),
            references_from: IndexMap::new(),
            references_to: IndexMap::new(),
        }
    }

    /// The computed global position of a primitive, for inspection.
    pub fn position_of(&self, uuid: &Uuid) -> Option<Point3> {
        self.primitives.get(uuid).map(|p| p.position)
    }

    fn ensure_exists(&mut self, uuid: Uuid) -> &mut Primitive {
        let default_mode = self.default_mode;
        self.primitives
            .entry(uuid)
            .or_insert_with(|| Primitive::new(default_mode))
    }

    fn entry_of(&self, from: &Uuid, to: &Uuid) -> Option<NeighbourEntry> {
        self.references_from.get(from).and_then(|inner| inner.get(to)).copied()
    }

    fn push_entry(&mut self, from: Uuid, to: Uuid, entry: NeighbourEntry) {
        self.references_from.entry(from).or_default().insert(to, entry);
        self.references_to.entry(to).or_default().insert(from);
    }

    /// Remove both the "to" and "from" edges touching the uuid.
    fn delete_entries(&mut self, uuid: &Uuid) {
        if let Some(pointing) = self.references_to.shift_remove(uuid) {
            for from in pointing {
                if let Some(inner) = self.references_from.get_mut(&from) {
                    inner.shift_remove(uuid);
                }
            }
        }
        if let Some(outgoing) = self.references_from.shift_remove(uuid) {
            for to in outgoing.keys() {
                if let Some(inner) = self.references_to.get_mut(to) {
                    inner.shift_remove(uuid);
                }
            }
        }
    }

    /// Drop a primitive and every neighbour edge touching it.
    pub fn destroy_primitive(&mut self, uuid: &Uuid) {
        let parent = self.primitives.get(uuid).and_then(|p| p.parent);
        if let Some(parent) = parent {
            if let Some(group) = self.primitives.get_mut(&parent) {
                group.children.shift_remove(uuid);
            }
        }
        self.delete_entries(uuid);
        self.primitives.shift_remove(uuid);
    }

    // -- registrations -----------------------------------------------------

    fn process_sensor_registration(&mut self, sensor: &SensorProperties) {
        let entry = self.ensure_exists(sensor.uuid);
        if entry.is_sensor() && entry.setup_mode == sensor.mode {
            return;
        }
        self.update_required = true;
        let entry = self.ensure_exists(sensor.uuid);
        entry.role |= ROLE_SENSOR;
        entry.setup_mode = sensor.mode;
        if entry.setup_mode == CoordinateTranslationMode::Intact {
            entry.configured = true;
            entry.position = Point3::default();
        }
    }

    fn process_viewport_registration(&mut self, viewport: &Viewport) {
        let entry = self.ensure_exists(viewport.uuid);
        if entry.viewport_mode == ViewportMode::Received && entry.viewport == *viewport {
            return;
        }
        self.update_required = true;
        let entry = self.ensure_exists(viewport.uuid);
        entry.viewport_mode = ViewportMode::Received;
        entry.viewport = viewport.clone();
    }

    fn process_group_registration(&mut self, member: &GroupMember) {
        let group = self.ensure_exists(member.group_uuid);
        if group.is_group() && group.children.contains(&member.uuid) {
            return;
        }
        self.update_required = true;
        self.ensure_exists(member.uuid);

        let previous_parent = self.primitives[&member.uuid].parent;
        if let Some(previous) = previous_parent {
            if previous != member.group_uuid {
                if let Some(old_group) = self.primitives.get_mut(&previous) {
                    old_group.children.shift_remove(&member.uuid);
                }
            } else {
                let group = self.ensure_exists(member.group_uuid);
                group.role |= ROLE_GROUP;
                return;
            }
        }

        let group = self.ensure_exists(member.group_uuid);
        group.role |= ROLE_GROUP;
        group.children.insert(member.uuid);
        self.ensure_exists(member.uuid).parent = Some(member.group_uuid);
    }

    fn process_neighbour_registration(&mut self, neighbour: &Neighbour) {
        let entry = NeighbourEntry {
            azimuth: neighbour.azimuth,
            altitude: neighbour.altitude,
            distance: neighbour.distance,
        };
        if self.entry_of(&neighbour.uuid, &neighbour.neighbour_uuid) == Some(entry) {
            return;
        }
        self.update_required = true;
        self.ensure_exists(neighbour.uuid);
        self.ensure_exists(neighbour.neighbour_uuid);
        self.push_entry(neighbour.uuid, neighbour.neighbour_uuid, entry);
    }

    // -- placement ---------------------------------------------------------

    /// Reset configuration for every primitive not protected by its setup
    /// mode; returns whether anything was reset.
    fn reset_commit(&mut self) -> bool {
        let mut changes = false;
        for primitive in self.primitives.values_mut() {
            let protected = primitive.is_sensor()
                && (primitive.setup_mode == CoordinateTranslationMode::Intact
                    || (primitive.setup_mode == CoordinateTranslationMode::TranslateOnce
                        && primitive.configured));
            primitive.role &= !ROLE_PIVOT;
            if protected {
                continue;
            }
            changes = true;
            primitive.configured = false;
            primitive.position = Point3::default();
            primitive.correction_azimuth = 0.0;
            primitive.correction_altitude = 0.0;
            if primitive.is_group() {
                primitive.viewport_mode = ViewportMode::Awaits;
                primitive.viewport = Viewport::default();
            }
        }
        changes
    }

    fn reference_count(&self, candidate: &Uuid) -> usize {
        self.references_from
            .get(candidate)
            .map(|inner| inner.len())
            .unwrap_or(0)
    }

    /// Elect the next pivot: five candidate classes in priority order, the
    /// highest reference count within a class wins, insertion order breaks
    /// ties. Returns the nil uuid when no candidate exists.
    fn guess_pivot_candidate(&mut self) -> Uuid {
        use CoordinateTranslationMode::*;
        let classes: [(bool, CoordinateTranslationMode); 5] = [
            (true, Intact),
            (true, TranslateContinuous),
            (true, TranslateOnce),
            (false, TranslateContinuous),
            (false, TranslateOnce),
        ];

        for (configured, mode) in classes {
            let mut best_count = 0usize;
            let mut winner = None;
            for (uuid, primitive) in &self.primitives {
                if primitive.is_pivot()
                    || primitive.configured != configured
                    || primitive.setup_mode != mode
                {
                    continue;
                }
                let count = self.reference_count(uuid);
                if count > best_count {
                    best_count = count;
                    winner = Some(*uuid);
                }
            }
            if let Some(uuid) = winner {
                self.primitives[&uuid].role |= ROLE_PIVOT;
                return uuid;
            }
        }
        Uuid::nil()
    }

    /// Recompute a primitive's location from its configured neighbours:
    /// the average of spherical offsets from pointing neighbours plus
    /// negated offsets from pointed neighbours, rounded to integers.
    fn recompute_location(&mut self, uuid: Uuid) -> bool {
        let mut local = Point3::default();
        let mut pointing = 0usize;
        let mut pointed = 0usize;

        if let Some(sources) = self.references_to.get(&uuid) {
            for from in sources {
                let neighbour = &self.primitives[from];
                if !neighbour.configured {
                    continue;
                }
                let entry = self.entry_of(from, &uuid).unwrap();
                local += neighbour.position
                    + spherical_to_cartesian(
                        entry.azimuth + neighbour.correction_azimuth,
                        entry.altitude + neighbour.correction_altitude,
                        entry.distance,
                    );
                pointing += 1;
            }
        }

        if let Some(targets) = self.references_from.get(&uuid) {
            for (to, entry) in targets {
                let neighbour = &self.primitives[to];
                if !neighbour.configured {
                    continue;
                }
                local += neighbour.position
                    - spherical_to_cartesian(
                        entry.azimuth + neighbour.correction_azimuth,
                        entry.altitude + neighbour.correction_altitude,
                        entry.distance,
                    );
                pointed += 1;
            }
        }

        if pointing + pointed > 0 {
            local = local / (pointing + pointed) as f32;
            // the computation is approximative; round only once it settles
            local.x = local.x.round();
            local.y = local.y.round();
            local.z = local.z.round();
        }

        let mut azimuth = 0.0f32;
        let mut altitude = 0.0f32;
        if pointed > 0 {
            if let Some(targets) = self.references_from.get(&uuid) {
                for (to, entry) in targets {
                    let neighbour = &self.primitives[to];
                    if !neighbour.configured {
                        continue;
                    }
                    let (azi, alt, _dist) = cartesian_to_spherical(neighbour.position - local);
                    azimuth += azi - entry.azimuth;
                    altitude += alt - entry.altitude;
                }
            }
            azimuth /= pointed as f32;
            altitude /= pointed as f32;
        }

        let primitive = self.primitives.get_mut(&uuid).unwrap();
        let moved = primitive.position != local;
        primitive.position = local;
        primitive.correction_azimuth = azimuth;
        primitive.correction_altitude = altitude;
        moved && (pointing + pointed) > 0
    }

    /// The full fixed-point placement; intermediate states stay internal.
    fn commit(&mut self) {
        if !self.update_required {
            return;
        }
        self.update_required = false;

        if !self.reset_commit() {
            return;
        }

        let mut queue: VecDeque<Uuid> = VecDeque::new();
        loop {
            let mut changed = false;
            loop {
                let pivot = self.guess_pivot_candidate();
                if pivot.is_nil() {
                    break;
                }
                queue.push_back(pivot);
                while let Some(uuid) = queue.pop_front() {
                    changed |= self.recompute_location(uuid);
                    self.primitives[&uuid].configured = true;

                    let neighbours: Vec<Uuid> = self
                        .references_from
                        .get(&uuid)
                        .map(|inner| inner.keys().copied().collect())
                        .unwrap_or_default();
                    for neighbour in neighbours {
                        if self.primitives[&neighbour].configured {
                            continue;
                        }
                        changed |= self.recompute_location(neighbour);
                        self.primitives[&neighbour].role |= ROLE_PIVOT;
                        queue.push_back(neighbour);
                    }
                }
            }
            if !changed {
                break;
            }
        }

        for (uuid, primitive) in &self.primitives {
            if !primitive.configured {
                warn!("autoconf: primitive {uuid} left unconfigured");
            }
        }

        self.recalculate_group_viewports();
    }

    /// Fix-point over groups awaiting a viewport: once every child is
    /// resolved, the group's viewport becomes the bounding box of its own
    /// plus every child's world-space viewport.
    fn recalculate_group_viewports(&mut self) {
        loop {
            let mut changed = false;
            let groups: Vec<Uuid> = self
                .primitives
                .iter()
                .filter(|(_, p)| p.is_group() && p.viewport_mode == ViewportMode::Awaits)
                .map(|(uuid, _)| *uuid)
                .collect();
            for uuid in groups {
                let group = &self.primitives[&uuid];
                let mut elements = vec![group.viewport.clone()];
                let mut children_done = true;
                for child_uuid in &group.children {
                    let child = &self.primitives[child_uuid];
                    match child.viewport_mode {
                        ViewportMode::Computed | ViewportMode::Received => {
                            let mut child_viewport = child.viewport.clone();
                            child_viewport.translate(child.position);
                            elements.push(child_viewport);
                        }
                        _ => children_done = false,
                    }
                }
                let mut computed = bounding_viewport(&elements);
                computed.uuid = uuid;

                let group = self.primitives.get_mut(&uuid).unwrap();
                if computed != group.viewport || children_done {
                    changed = true;
                }
                group.viewport = computed;
                if children_done {
                    group.viewport_mode = ViewportMode::Computed;
                }
            }
            if !changed {
                break;
            }
        }
    }

    // -- per-bundle translation --------------------------------------------

    /// Spherical drift compensation followed by global translation.
    fn compensate_drift(azimuth: f32, altitude: f32, point: Point3) -> Point3 {
        let (azi, alt, dist) = cartesian_to_spherical(point);
        spherical_to_cartesian(azi + azimuth, alt + altitude, dist)
    }

    fn translate_bundle(&self, sensor_uuid: &Uuid, bundle: &mut BundleHandle) {
        let Some(sensor) = self.primitives.get(sensor_uuid) else {
            return;
        };
        let azimuth = sensor.correction_azimuth;
        let altitude = sensor.correction_altitude;
        let offset = sensor.position;

        for message in bundle.iter_mut() {
            // viewports are registrations, not contacts
            if matches!(message, Message::Viewport(_)) {
                continue;
            }
            if let Some(point) = message.point() {
                let compensated = Self::compensate_drift(azimuth, altitude, point);
                message.set_point(compensated + offset);
            }
            if let Some(velocity) = message.velocity() {
                let as_point = Point3::new(velocity.x, velocity.y, velocity.z);
                let compensated = Self::compensate_drift(azimuth, altitude, as_point);
                message.set_velocity(Velocity::new(compensated.x, compensated.y, compensated.z));
            }
        }
    }

    /// Insert computed group viewports after the frame/registration prefix.
    fn project_group_viewports(&self, bundle: &mut BundleHandle) {
        let insert_at = bundle.messages().iter().position(|m| {
            !matches!(
                m,
                Message::Frame(_) | Message::SensorProperties(_) | Message::Viewport(_)
            )
        });
        let Some(insert_at) = insert_at else {
            return;
        };

        let computed: Vec<Message> = self
            .primitives
            .values()
            .filter(|p| p.viewport_mode == ViewportMode::Computed)
            .map(|p| Message::Viewport(p.viewport.clone()))
            .collect();
        if computed.is_empty() {
            return;
        }

        let mut rebuilt = BundleHandle::new();
        for (index, message) in bundle.iter().enumerate() {
            if index == insert_at {
                for viewport in &computed {
                    rebuilt.push(viewport.clone());
                }
            }
            rebuilt.push(message.clone());
        }
        *bundle = rebuilt;
    }
}

impl Adaptor for Autoconfigurator {
    fn process_bundle(&mut self, bundle: &BundleHandle) -> Result<BundleHandle, Error> {
        for sensor in bundle.all_of::<SensorProperties>() {
            self.process_sensor_registration(sensor);
        }
        for viewport in bundle.all_of::<Viewport>() {
            self.process_viewport_registration(viewport);
        }
        for member in bundle.all_of::<GroupMember>() {
            self.process_group_registration(member);
        }
        for neighbour in bundle.all_of::<Neighbour>() {
            self.process_neighbour_registration(neighbour);
        }

        self.commit();

        // bundles from unknown sensors are forwarded untouched
        let Some(sensor) = bundle.nth_of::<SensorProperties>(0) else {
            return Ok(bundle.clone());
        };
        let sensor_uuid = sensor.uuid;
        self.ensure_exists(sensor_uuid);

        let mut output = bundle.clone();
        self.translate_bundle(&sensor_uuid, &mut output);
        self.project_group_viewports(&mut output);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Alive, Frame, Pointer};
    use crate::types::Timetag;

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn registration_bundle(middle: Vec<Message>) -> BundleHandle {
        BundleHandle::assemble(Frame::new(1, Timetag::new(1, 0)), middle, Alive::default())
    }

    fn sensor_msg(id: u128, mode: CoordinateTranslationMode) -> Message {
        Message::SensorProperties(SensorProperties::new(uuid(id), mode, 0))
    }

    fn neighbour_msg(from: u128, to: u128, azimuth: f32, distance: f32) -> Message {
        Message::Neighbour(Neighbour::new(uuid(from), uuid(to), azimuth, 0.0, distance))
    }

    fn pointer_bundle(sensor: u128, sid: u32, x: f32, y: f32) -> BundleHandle {
        BundleHandle::assemble(
            Frame::new(2, Timetag::new(2, 0)),
            vec![
                sensor_msg(sensor, CoordinateTranslationMode::TranslateContinuous),
                Message::Pointer(Pointer::new_2d(sid, 0, 0, 0, x, y, 0.0, 1.0)),
            ],
            Alive::new([sid].into_iter().collect()),
        )
    }

    #[test]
    fn test_two_sensors_one_neighbour() {
        let mut auto = Autoconfigurator::default();
        auto.process_bundle(&registration_bundle(vec![
            sensor_msg(1, CoordinateTranslationMode::Intact),
            sensor_msg(2, CoordinateTranslationMode::TranslateContinuous),
            neighbour_msg(1, 2, 0.0, 2000.0),
        ]))
        .unwrap();

        let a = auto
            .process_bundle(&pointer_bundle(1, 10, 20.0, 20.0))
            .unwrap();
        let b = auto
            .process_bundle(&pointer_bundle(2, 11, 20.0, 20.0))
            .unwrap();

        let pa = a.nth_of::<Pointer>(0).unwrap().point;
        let pb = b.nth_of::<Pointer>(0).unwrap().point;
        let dx = pb.x - pa.x;
        let dy = pb.y - pa.y;
        let distance = (dx * dx + dy * dy).sqrt();
        assert!((distance - 2000.0).abs() < 2.0, "projected distance {distance}");
    }

    #[test]
    fn test_grid_2x2_placement() {
        // horizontal neighbours 1988 apart along x, vertical 1148 along y
        let vertical = std::f32::consts::FRAC_PI_2;
        let mut auto = Autoconfigurator::default();
        auto.process_bundle(&registration_bundle(vec![
            sensor_msg(0x00, CoordinateTranslationMode::Intact),
            sensor_msg(0x01, CoordinateTranslationMode::TranslateContinuous),
            sensor_msg(0x10, CoordinateTranslationMode::TranslateContinuous),
            sensor_msg(0x11, CoordinateTranslationMode::TranslateContinuous),
            neighbour_msg(0x00, 0x01, vertical, 1148.0),
            neighbour_msg(0x00, 0x10, 0.0, 1988.0),
            neighbour_msg(0x01, 0x11, 0.0, 1988.0),
            neighbour_msg(0x10, 0x11, vertical, 1148.0),
        ]))
        .unwrap();

        // pointers at local (0,0) project to the sensor's global drift
        let expectations = [
            (0x00u128, 0.0f32, 0.0f32),
            (0x01, 0.0, 1148.0),
            (0x10, 1988.0, 0.0),
            (0x11, 1988.0, 1148.0),
        ];
        for (index, (sensor, ex, ey)) in expectations.into_iter().enumerate() {
            let out = auto
                .process_bundle(&pointer_bundle(sensor, 20 + index as u32, 0.0, 0.0))
                .unwrap();
            let p = out.nth_of::<Pointer>(0).unwrap().point;
            assert!((p.x - ex).abs() <= 2.0, "sensor {sensor:x}: x {} vs {ex}", p.x);
            assert!((p.y - ey).abs() <= 2.0, "sensor {sensor:x}: y {} vs {ey}", p.y);
        }
    }

    #[test]
    fn test_commit_idempotent() {
        let registrations = vec![
            sensor_msg(1, CoordinateTranslationMode::Intact),
            sensor_msg(2, CoordinateTranslationMode::TranslateContinuous),
            sensor_msg(3, CoordinateTranslationMode::TranslateContinuous),
            neighbour_msg(1, 2, 0.0, 1000.0),
            neighbour_msg(2, 3, 0.0, 1000.0),
        ];
        let mut auto = Autoconfigurator::default();
        auto.process_bundle(&registration_bundle(registrations.clone()))
            .unwrap();
        let first: Vec<Point3> = [1, 2, 3]
            .iter()
            .map(|id| auto.position_of(&uuid(*id)).unwrap())
            .collect();

        auto.process_bundle(&registration_bundle(registrations)).unwrap();
        let second: Vec<Point3> = [1, 2, 3]
            .iter()
            .map(|id| auto.position_of(&uuid(*id)).unwrap())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_sensor_forwarded_untouched() {
        let mut auto = Autoconfigurator::default();
        let bundle = BundleHandle::assemble(
            Frame::new(1, Timetag::new(1, 0)),
            vec![Message::Pointer(Pointer::new_2d(5, 0, 0, 0, 20.0, 20.0, 0.0, 1.0))],
            Alive::new([5].into_iter().collect()),
        );
        let out = auto.process_bundle(&bundle).unwrap();
        assert_eq!(out, bundle);
    }

    #[test]
    fn test_isolated_primitive_stays_unconfigured() {
        let mut auto = Autoconfigurator::default();
        auto.process_bundle(&registration_bundle(vec![sensor_msg(
            7,
            CoordinateTranslationMode::TranslateContinuous,
        )]))
        .unwrap();
        assert!(!auto.primitives[&uuid(7)].configured);
    }

    #[test]
    fn test_destroy_primitive_removes_both_edge_directions() {
        let mut auto = Autoconfigurator::default();
        auto.process_bundle(&registration_bundle(vec![
            sensor_msg(1, CoordinateTranslationMode::Intact),
            sensor_msg(2, CoordinateTranslationMode::TranslateContinuous),
            neighbour_msg(1, 2, 0.0, 100.0),
            neighbour_msg(2, 1, std::f32::consts::PI, 100.0),
        ]))
        .unwrap();

        auto.destroy_primitive(&uuid(2));
        assert!(auto.entry_of(&uuid(1), &uuid(2)).is_none());
        assert!(auto.entry_of(&uuid(2), &uuid(1)).is_none());
        assert!(!auto.primitives.contains_key(&uuid(2)));
    }

    #[test]
    fn test_group_viewport_computed_from_children() {
        let group = uuid(0xff);
        let mut auto = Autoconfigurator::default();
        auto.process_bundle(&registration_bundle(vec![
            sensor_msg(1, CoordinateTranslationMode::Intact),
            sensor_msg(2, CoordinateTranslationMode::TranslateContinuous),
            neighbour_msg(1, 2, 0.0, 100.0),
            Message::Viewport(Viewport::new(
                uuid(1),
                Point3::new(50.0, 50.0, 0.0),
                Default::default(),
                100,
                100,
                0,
            )),
            Message::Viewport(Viewport::new(
                uuid(2),
                Point3::new(50.0, 50.0, 0.0),
                Default::default(),
                100,
                100,
                0,
            )),
            Message::GroupMember(GroupMember::new(group, uuid(1))),
            Message::GroupMember(GroupMember::new(group, uuid(2))),
        ]))
        .unwrap();

        let group_primitive = &auto.primitives[&group];
        assert_eq!(group_primitive.viewport_mode, ViewportMode::Computed);
        // sensor 2 sits 100 units along x, so the union spans 200 units
        assert_eq!(group_primitive.viewport.width, 200);
        assert_eq!(group_primitive.viewport.uuid, group);
    }
}
